//! Immutable page state captured once per request.

use time::OffsetDateTime;

use crate::parse::Document;

/// A page as it was when the capture started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    url: String,
    title: String,
    raw_html: String,
    captured_at: OffsetDateTime,
}

impl PageSnapshot {
    /// Snapshot stamped with the current UTC time.
    pub fn new(url: impl Into<String>, title: impl Into<String>, raw_html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            raw_html: raw_html.into(),
            captured_at: OffsetDateTime::now_utc(),
        }
    }

    /// Snapshot whose title is read from the page's `<title>`.
    pub fn from_html(url: impl Into<String>, raw_html: impl Into<String>) -> Self {
        let raw_html = raw_html.into();
        let title = Document::parse(&raw_html).title().unwrap_or_default();
        Self::new(url, title, raw_html)
    }

    /// Replaces the capture timestamp.
    pub fn with_captured_at(mut self, captured_at: OffsetDateTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn raw_html(&self) -> &str {
        &self.raw_html
    }

    pub fn captured_at(&self) -> OffsetDateTime {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_from_html_reads_title() {
        let snapshot = PageSnapshot::from_html("https://example.com", "<title> Hello </title><p>x</p>");
        assert_eq!(snapshot.title(), "Hello");
        assert_eq!(snapshot.url(), "https://example.com");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let snapshot = PageSnapshot::from_html("https://example.com", "<p>x</p>");
        assert_eq!(snapshot.title(), "");
    }

    #[test]
    fn test_with_captured_at() {
        let at = datetime!(2024-01-15 10:30:00 UTC);
        let snapshot = PageSnapshot::new("u", "t", "<p>x</p>").with_captured_at(at);
        assert_eq!(snapshot.captured_at(), at);
    }
}
