//! HTML cleanup ahead of conversion.
//!
//! Two strategies implement [`HtmlNormalizer`]:
//!
//! - [`DomNormalizer`] re-serializes a parsed tree and is used when the
//!   operation runs inside a page context.
//! - [`StreamNormalizer`] rewrites markup with a streaming tokenizer and needs
//!   nothing but the string.
//!
//! Both drop `script`, `style`, `noscript` and comments, collapse incidental
//! whitespace outside verbatim regions, cap blank lines at one, and trim the
//! result. For input free of removable content they produce markup that
//! converts to identical Markdown.

mod dom;
mod stream;

pub use dom::DomNormalizer;
pub use stream::StreamNormalizer;

use scraper::ElementRef;

/// Elements removed together with their content.
pub const REMOVED_TAGS: &[&str] = &["script", "style", "noscript"];

/// Elements whose text is always kept verbatim.
pub const VERBATIM_TAGS: &[&str] = &["pre", "code", "listing", "xmp", "textarea", "plaintext"];

/// Class-name fragments that mark a container as preformatted output.
const PREFORMATTED_CLASS_HINTS: &[&str] =
    &["ascii", "diagram", "terminal", "console", "shell", "output", "tree", "monospace", "preformatted"];

const TREE_GLYPHS: &[char] = &['├', '└', '│', '┃', '┣', '┗', '┠', '┖', '╠', '╚', '║'];
const TREE_ASCII_PREFIXES: &[&str] = &["|--", "|__", "`--", "+--", "\\--"];

/// Input to a normalizer: raw markup or a node of an already-parsed page.
#[derive(Debug, Clone, Copy)]
pub enum Fragment<'a> {
    Markup(&'a str),
    Node(ElementRef<'a>),
}

/// Which normalizer produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Dom,
    Stream,
}

/// Cleans an HTML fragment while keeping block structure.
pub trait HtmlNormalizer: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Returns cleaned markup. Never fails; unparseable input degrades to a
    /// best-effort result.
    fn normalize(&self, fragment: Fragment<'_>) -> String;
}

/// Whether an element's text must keep its exact whitespace.
pub fn preserves_whitespace(tag: &str, class: Option<&str>, style: Option<&str>) -> bool {
    if VERBATIM_TAGS.contains(&tag) {
        return true;
    }

    if let Some(class) = class
        && class.split_whitespace().any(|c| {
            let c = c.to_ascii_lowercase();
            PREFORMATTED_CLASS_HINTS.iter().any(|hint| c == *hint || c.starts_with(&format!("{hint}-")))
        })
    {
        return true;
    }

    match style {
        Some(style) => {
            let style = style.to_ascii_lowercase().replace(' ', "");
            style.contains("white-space:pre") || style.contains("font-family:monospace")
        }
        None => false,
    }
}

/// Whether a single line reads as a row of a tree diagram.
pub fn is_tree_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with(TREE_GLYPHS) || TREE_ASCII_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Whether any line of `text` is a tree-diagram row.
pub fn has_tree_line(text: &str) -> bool {
    text.lines().any(is_tree_line)
}

/// Whether `text` as a whole reads as a tree diagram: at least two non-empty
/// lines, half or more of them tree rows.
pub fn looks_like_tree(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return false;
    }
    let rows = lines.iter().filter(|l| is_tree_line(l)).count();
    rows * 2 >= lines.len()
}

/// Collapses whitespace runs inside a text run.
///
/// A run containing line breaks becomes one or two newlines; any other run
/// becomes a single space. The pending run is held back until the next
/// visible character or [`WhitespaceRun::flush`], so runs split across text
/// chunks collapse the same as contiguous ones.
#[derive(Debug, Default)]
pub(crate) struct WhitespaceRun {
    active: bool,
    newlines: usize,
}

impl WhitespaceRun {
    pub(crate) fn collapse(&mut self, text: &str, out: &mut String, escape: bool) {
        for ch in text.chars() {
            match ch {
                ' ' | '\t' | '\r' | '\x0C' => self.active = true,
                '\n' => {
                    self.active = true;
                    self.newlines += 1;
                }
                _ => {
                    self.flush(out);
                    push_text_char(out, ch, escape);
                }
            }
        }
    }

    pub(crate) fn flush(&mut self, out: &mut String) {
        if self.active {
            out.push_str(match self.newlines {
                0 => " ",
                1 => "\n",
                _ => "\n\n",
            });
        }
        *self = Self::default();
    }
}

pub(crate) fn push_text_char(out: &mut String, ch: char, escape: bool) {
    match ch {
        '&' if escape => out.push_str("&amp;"),
        '<' if escape => out.push_str("&lt;"),
        '>' if escape => out.push_str("&gt;"),
        _ => out.push(ch),
    }
}

/// Collapses a complete text run in one go.
pub(crate) fn collapse_text(text: &str, escape: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = WhitespaceRun::default();
    run.collapse(text, &mut out, escape);
    run.flush(&mut out);
    out
}
