//! Main-content root selection.
//!
//! Pages wrap their readable content in a handful of conventional containers.
//! [`ContentExtractor`] tries those containers in a fixed priority order and
//! falls back to the whole `<body>` when none of them holds content.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use crate::parse::{Document, Element, parse_selector};
use crate::Result;

/// Structural selectors tried in order; the first with content wins.
pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role='main']",
    "article",
    "[itemprop='articleBody']",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    "#main-content",
    ".main-content",
    "#content",
    ".content",
];

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Selectors in priority order
    pub selectors: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { selectors: DEFAULT_CONTENT_SELECTORS.iter().map(|s| s.to_string()).collect() }
    }
}

/// Where an extracted root came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSource {
    /// Matched the given content selector.
    Selector(String),
    /// No selector matched; the body was used.
    Body,
    /// The document had no content at all.
    Empty,
}

/// The subtree chosen as main content.
#[derive(Debug, Clone)]
pub struct Extraction<'a> {
    pub element: Element<'a>,
    pub source: RootSource,
}

impl Extraction<'_> {
    /// True for the empty-document sentinel.
    pub fn is_empty(&self) -> bool {
        self.source == RootSource::Empty
    }
}

/// Picks the main-content subtree of a page.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    selectors: Vec<(String, Selector)>,
}

impl ContentExtractor {
    /// Builds an extractor from a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PagemarkError::HtmlParseError`] for an invalid selector.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let selectors = config
            .selectors
            .iter()
            .map(|s| parse_selector(s).map(|sel| (s.clone(), sel)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { selectors })
    }

    /// Selectors in the order they are tried.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(|(s, _)| s.as_str())
    }

    /// Returns the main-content root of `document`.
    ///
    /// Always yields an element and never modifies the document. A selector
    /// only counts when its first match carries text or media; otherwise the
    /// next one is tried.
    pub fn extract_root<'a>(&self, document: &'a Document) -> Extraction<'a> {
        let html = document.html();

        for (source, selector) in &self.selectors {
            if let Some(node) = html.select(selector).map(Element::new).find(has_content) {
                return Extraction { element: node, source: RootSource::Selector(source.clone()) };
            }
        }

        match document.body() {
            Some(body) if has_content(&body) => {
                tracing::debug!("no content container matched, using body");
                Extraction { element: body, source: RootSource::Body }
            }
            Some(body) => Extraction { element: body, source: RootSource::Empty },
            None => Extraction { element: document.root(), source: RootSource::Empty },
        }
    }
}

static DEFAULT_SELECTORS: LazyLock<Vec<(String, Selector)>> = LazyLock::new(|| {
    DEFAULT_CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok().map(|sel| (s.to_string(), sel)))
        .collect()
});

impl Default for ContentExtractor {
    fn default() -> Self {
        Self { selectors: DEFAULT_SELECTORS.clone() }
    }
}

fn has_content(element: &Element<'_>) -> bool {
    if !element.is_blank() {
        return true;
    }
    element
        .node()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| matches!(el.value().name(), "img" | "pre" | "picture" | "video"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_main_beats_article() {
        let doc = Document::parse("<body><article><p>teaser</p></article><main><p>body text</p></main></body>");
        let extractor = ContentExtractor::default();

        for _ in 0..3 {
            let root = extractor.extract_root(&doc);
            assert_eq!(root.source, RootSource::Selector("main".into()));
            assert_eq!(root.element.tag_name(), "main");
        }
    }

    #[rstest]
    #[case("<body><div role=\"main\"><p>x</p></div><article><p>y</p></article></body>", "[role='main']")]
    #[case("<body><nav>menu</nav><article><p>y</p></article></body>", "article")]
    #[case("<body><div class=\"entry-content\"><p>y</p></div></body>", ".entry-content")]
    #[case("<body><div id=\"content\"><p>y</p></div></body>", "#content")]
    fn test_selector_priority(#[case] html: &str, #[case] expected: &str) {
        let doc = Document::parse(html);
        let root = ContentExtractor::default().extract_root(&doc);
        assert_eq!(root.source, RootSource::Selector(expected.into()));
    }

    #[test]
    fn test_blank_match_is_skipped() {
        let doc = Document::parse("<body><main>   </main><article><p>story</p></article></body>");
        let root = ContentExtractor::default().extract_root(&doc);
        assert_eq!(root.source, RootSource::Selector("article".into()));
    }

    #[test]
    fn test_image_only_match_counts() {
        let doc = Document::parse("<body><p>caption</p><main><img src=\"a.png\"></main></body>");
        let root = ContentExtractor::default().extract_root(&doc);
        assert_eq!(root.source, RootSource::Selector("main".into()));
    }

    #[test]
    fn test_falls_back_to_body() {
        let doc = Document::parse("<body><div><p>just text</p></div></body>");
        let root = ContentExtractor::default().extract_root(&doc);
        assert_eq!(root.source, RootSource::Body);
        assert_eq!(root.element.tag_name(), "body");
    }

    #[rstest]
    #[case("")]
    #[case("<html><body>  </body></html>")]
    #[case("<div><span></span></div><!-- only a comment -->")]
    fn test_empty_sentinel(#[case] html: &str) {
        let doc = Document::parse(html);
        let root = ContentExtractor::default().extract_root(&doc);
        assert!(root.is_empty());
        assert!(root.element.is_blank());
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let doc = Document::parse("<<<main>>> <p>unclosed <b>bold");
        let root = ContentExtractor::default().extract_root(&doc);
        assert!(!root.is_empty());
        assert!(root.element.text().contains("unclosed"));
    }

    #[test]
    fn test_document_unchanged() {
        let html = "<body><main><p>a</p></main></body>";
        let doc = Document::parse(html);
        let before = doc.html().html();
        let _ = ContentExtractor::default().extract_root(&doc);
        assert_eq!(doc.html().html(), before);
    }

    #[test]
    fn test_custom_selectors() {
        let config = ExtractorConfig { selectors: vec![".story".into()] };
        let extractor = ContentExtractor::new(&config).unwrap();
        let doc = Document::parse("<body><main>x</main><div class=\"story\">y</div></body>");
        assert_eq!(extractor.extract_root(&doc).source, RootSource::Selector(".story".into()));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let config = ExtractorConfig { selectors: vec!["[[bad".into()] };
        assert!(ContentExtractor::new(&config).is_err());
    }
}
