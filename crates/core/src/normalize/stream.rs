use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use lol_html::html_content::{ContentType, EndTag, TextType};
use lol_html::{HtmlRewriter, Settings, doc_comments, doc_text, element};

use super::{Fragment, HtmlNormalizer, Strategy, collapse_text, has_tree_line, preserves_whitespace};

/// Normalizer that works on markup strings with a streaming rewriter.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamNormalizer;

impl HtmlNormalizer for StreamNormalizer {
    fn strategy(&self) -> Strategy {
        Strategy::Stream
    }

    fn normalize(&self, fragment: Fragment<'_>) -> String {
        let markup = match fragment {
            Fragment::Markup(html) => Cow::Borrowed(html),
            Fragment::Node(node) => Cow::Owned(node.inner_html()),
        };

        let stripped = remove_unwanted(&markup);
        collapse_whitespace(&stripped).trim().to_string()
    }
}

/// Drops script, style, and noscript elements and all comments.
///
/// Runs as its own pass so the text on either side of a removed node reaches
/// the whitespace pass as a single text node.
fn remove_unwanted(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("noscript", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            document_content_handlers: vec![doc_comments!(|comment| {
                comment.remove();
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if let Err(err) = rewriter.write(html.as_bytes()) {
        tracing::debug!(%err, "rewriter rejected markup, keeping it unchanged");
        return html.to_string();
    }

    if let Err(err) = rewriter.end() {
        tracing::debug!(%err, "rewriter rejected markup, keeping it unchanged");
        return html.to_string();
    }

    output
}

#[derive(Default)]
struct CollapseState {
    /// Open whitespace-preserving elements.
    verbatim: usize,
    /// Text of the current text node seen so far.
    buffer: String,
}

/// Collapses whitespace in every text node outside verbatim containers.
///
/// A text node can arrive in several chunks; earlier chunks are held back and
/// the whole node is written out in place of its last chunk.
fn collapse_whitespace(html: &str) -> String {
    let state = Rc::new(RefCell::new(CollapseState::default()));
    let element_state = Rc::clone(&state);
    let text_state = Rc::clone(&state);

    let mut output = String::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("*", move |el| {
                let tag = el.tag_name();
                let class = el.get_attribute("class");
                let style = el.get_attribute("style");

                if !preserves_whitespace(&tag, class.as_deref(), style.as_deref()) {
                    return Ok(());
                }

                if let Some(handlers) = el.end_tag_handlers() {
                    element_state.borrow_mut().verbatim += 1;
                    let end_state = Rc::clone(&element_state);
                    let handler: lol_html::EndTagHandler<'static> = Box::new(move |_end: &mut EndTag<'_>| {
                        let mut state = end_state.borrow_mut();
                        state.verbatim = state.verbatim.saturating_sub(1);
                        Ok(())
                    });
                    handlers.push(handler);
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_text!(move |chunk| {
                if chunk.text_type() != TextType::Data {
                    return Ok(());
                }

                let mut state = text_state.borrow_mut();
                state.buffer.push_str(chunk.as_str());

                if !chunk.last_in_text_node() {
                    chunk.remove();
                    return Ok(());
                }

                let text = std::mem::take(&mut state.buffer);
                let cleaned = if state.verbatim > 0 || has_tree_line(&text) { text } else { collapse_text(&text, false) };
                chunk.replace(&cleaned, ContentType::Html);
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }

    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(html: &str) -> String {
        StreamNormalizer.normalize(Fragment::Markup(html))
    }

    #[test]
    fn test_removes_script_style_and_comments() {
        let html = r#"
            <p>Keep<script>alert('test');</script> this</p>
            <style>body{color:red;}</style>
            <!-- This is a comment -->
            <noscript>Enable JavaScript</noscript>
        "#;

        let result = normalize(html);
        assert_eq!(result, "<p>Keep this</p>");
        assert!(!result.contains("alert"));
        assert!(!result.contains("color:red"));
    }

    #[test]
    fn test_text_merges_across_removed_nodes() {
        assert_eq!(normalize("<p>a   <!-- c -->   b</p>"), "<p>a b</p>");
        assert_eq!(normalize("<p>a \n<script>x()</script>\n\n\n b</p>"), "<p>a\n\nb</p>");
    }

    #[test]
    fn test_collapses_whitespace() {
        let html = "\n\n  <p>Hello  \t world</p>\n\n\n\n<p>Next</p>  ";
        assert_eq!(normalize(html), "<p>Hello world</p>\n\n<p>Next</p>");
    }

    #[test]
    fn test_preserves_pre_content() {
        let html = "<pre>fn main() {\n    println!(\"hi\");\n\n\n}</pre>";
        assert_eq!(normalize(html), html);
    }

    #[test]
    fn test_preserves_nested_verbatim() {
        let html = "<pre><code class=\"language-rust\">let  x = 1;\n\n\n\nlet  y = 2;</code></pre><p>a   b</p>";
        assert_eq!(
            normalize(html),
            "<pre><code class=\"language-rust\">let  x = 1;\n\n\n\nlet  y = 2;</code></pre><p>a b</p>"
        );
    }

    #[test]
    fn test_preserves_monospace_style() {
        let html = "<div style=\"white-space: pre\">col1    col2</div><div>x    y</div>";
        assert_eq!(normalize(html), "<div style=\"white-space: pre\">col1    col2</div><div>x y</div>");
    }

    #[test]
    fn test_preserves_tree_text() {
        let html = "<div>src/\n├── main.rs\n└──   lib.rs</div>";
        assert_eq!(normalize(html), html);
    }

    #[test]
    fn test_textarea_untouched() {
        let html = "<textarea>  spaced   out  </textarea>";
        assert_eq!(normalize(html), html);
    }

    #[test]
    fn test_idempotent() {
        let html = "<article><h1> Title </h1>\n\n\n<p>a  b</p><pre>  keep\n\n\n  this</pre></article>";
        let once = normalize(html);
        assert_eq!(normalize(&once), once);
    }
}
