//! HTML parsing and tree access.
//!
//! [`Document`] owns a parsed page and [`Element`] borrows one node of it.
//! Parsing never fails: html5ever recovers from malformed markup the way a
//! browser does, so even an empty string yields a document with an empty body.
//!
//! # Example
//!
//! ```rust
//! use pagemark_core::parse::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hi</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.body().unwrap().text(), "Hi");
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{PagemarkError, Result};

/// A parsed HTML page.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses a document and records the URL it was loaded from.
    ///
    /// An unparseable URL is ignored; relative links then stay relative.
    pub fn parse_with_url(html: &str, url: &str) -> Self {
        let base_url = Url::parse(url).ok();
        if base_url.is_none() && !url.is_empty() {
            tracing::debug!(url, "page URL is not absolute, links stay relative");
        }
        Self { html: Html::parse_document(html), base_url }
    }

    /// Base URL used for resolving relative links.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// The underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The `<html>` element.
    pub fn root(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// The `<body>` element, absent only for frameset documents.
    pub fn body(&self) -> Option<Element<'_>> {
        self.root().children().into_iter().find(|el| el.tag_name() == "body")
    }

    /// Content of the `<title>` element, trimmed; `None` when missing or blank.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Parses a CSS selector into a [`Selector`], mapping failures to
/// [`PagemarkError::HtmlParseError`].
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PagemarkError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// A borrowed element of a [`Document`].
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Wraps a scraper element.
    pub fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// The wrapped scraper node, used by the normalizers and rule engine.
    pub fn node(&self) -> ElementRef<'a> {
        self.element
    }

    /// Concatenation of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Whether the element has no text besides whitespace.
    pub fn is_blank(&self) -> bool {
        self.element.text().all(|t| t.trim().is_empty())
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Direct element children.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>  Test Page </title>
        </head>
        <body>
            <h1>Heading</h1>
            <p class="content">Paragraph 1</p>
            <p class="content">Paragraph 2</p>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.title(), Some("Test Page".to_string()));
        assert!(doc.base_url().is_none());
    }

    #[test]
    fn test_parse_with_url() {
        let doc = Document::parse_with_url(SAMPLE_HTML, "https://example.com/blog/post");
        assert_eq!(doc.base_url().map(Url::as_str), Some("https://example.com/blog/post"));

        let doc = Document::parse_with_url(SAMPLE_HTML, "not absolute");
        assert!(doc.base_url().is_none());
    }

    #[test]
    fn test_element_text() {
        let doc = Document::parse(SAMPLE_HTML);
        let body = doc.body().unwrap();
        let paragraphs: Vec<String> =
            body.children().iter().filter(|el| el.tag_name() == "p").map(Element::text).collect();

        assert_eq!(paragraphs, vec!["Paragraph 1", "Paragraph 2"]);
        assert!(!body.is_blank());
    }

    #[test]
    fn test_body_children() {
        let doc = Document::parse(SAMPLE_HTML);
        let tags: Vec<String> = doc.body().unwrap().children().iter().map(Element::tag_name).collect();
        assert_eq!(tags, vec!["h1", "p", "p", "a"]);
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(parse_selector("[[invalid"), Err(PagemarkError::HtmlParseError(_))));
        assert!(parse_selector("main, article").is_ok());
    }

    #[test]
    fn test_empty_input_still_has_body() {
        let doc = Document::parse("");
        let body = doc.body().unwrap();
        assert!(body.is_blank());
        assert!(doc.title().is_none());
    }
}
