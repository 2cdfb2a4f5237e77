use ego_tree::NodeId;
use ego_tree::iter::Edge;
use scraper::{ElementRef, Html, Node};

use super::{Fragment, HtmlNormalizer, REMOVED_TAGS, Strategy, WhitespaceRun, has_tree_line, preserves_whitespace};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Children of these are serialized without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["xmp", "iframe", "noembed", "noframes", "plaintext"];

/// Normalizer that walks a parsed tree and writes cleaned markup back out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomNormalizer;

impl HtmlNormalizer for DomNormalizer {
    fn strategy(&self) -> Strategy {
        Strategy::Dom
    }

    fn normalize(&self, fragment: Fragment<'_>) -> String {
        match fragment {
            Fragment::Markup(html) => {
                let parsed = Html::parse_fragment(html);
                serialize(parsed.root_element())
            }
            Fragment::Node(node) => serialize(node),
        }
    }
}

fn serialize(root: ElementRef<'_>) -> String {
    let mut writer = Writer::default();
    let mut frames = vec![Frame { verbatim: 0, raw: RAW_TEXT_ELEMENTS.contains(&root.value().name()) }];
    // Subtree whose contents are not written: removed elements and void elements.
    let mut skipping: Option<NodeId> = None;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) | Edge::Close(node) if node == *root => {}
            Edge::Open(node) => {
                if skipping.is_some() {
                    continue;
                }
                match node.value() {
                    Node::Text(text) => writer.text.push_str(text),
                    Node::Element(el) if REMOVED_TAGS.contains(&el.name()) => skipping = Some(node.id()),
                    Node::Element(el) => {
                        let Some(element) = ElementRef::wrap(node) else { continue };
                        let parent = frames.last().copied().unwrap_or_default();
                        writer.flush_text(parent);
                        writer.open(element);

                        if VOID_ELEMENTS.contains(&el.name()) {
                            skipping = Some(node.id());
                        } else {
                            let verbatim = if preserves_whitespace(el.name(), el.attr("class"), el.attr("style")) {
                                parent.verbatim + 1
                            } else {
                                parent.verbatim
                            };
                            frames.push(Frame { verbatim, raw: RAW_TEXT_ELEMENTS.contains(&el.name()) });
                        }
                    }
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if let Some(id) = skipping {
                    if id == node.id() {
                        skipping = None;
                    }
                    continue;
                }
                if let Node::Element(el) = node.value() {
                    let frame = frames.pop().unwrap_or_default();
                    writer.flush_text(frame);
                    writer.close(el.name());
                }
            }
        }
    }

    writer.flush_text(frames.last().copied().unwrap_or_default());
    writer.out.trim().to_string()
}

/// Whitespace handling in effect for the children of one open element.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    /// Enclosing whitespace-preserving elements.
    verbatim: usize,
    /// Children are written without entity escaping.
    raw: bool,
}

#[derive(Default)]
struct Writer {
    out: String,
    text: String,
}

impl Writer {
    fn open(&mut self, element: ElementRef<'_>) {
        let el = element.value();
        let name = el.name();

        self.out.push('<');
        self.out.push_str(name);
        for (attr, value) in el.attrs() {
            self.out.push(' ');
            self.out.push_str(attr);
            self.out.push_str("=\"");
            for ch in value.chars() {
                match ch {
                    '&' => self.out.push_str("&amp;"),
                    '"' => self.out.push_str("&quot;"),
                    '\u{a0}' => self.out.push_str("&nbsp;"),
                    _ => self.out.push(ch),
                }
            }
            self.out.push('"');
        }
        self.out.push('>');

        if matches!(name, "pre" | "textarea" | "listing")
            && let Some(Node::Text(first)) = element.first_child().map(|c| c.value())
            && first.starts_with('\n')
        {
            self.out.push('\n');
        }
    }

    fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn flush_text(&mut self, frame: Frame) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);

        if frame.verbatim > 0 || has_tree_line(&text) {
            for ch in text.chars() {
                super::push_text_char(&mut self.out, ch, !frame.raw);
            }
        } else {
            let mut run = WhitespaceRun::default();
            run.collapse(&text, &mut self.out, !frame.raw);
            run.flush(&mut self.out);
        }
    }
}
