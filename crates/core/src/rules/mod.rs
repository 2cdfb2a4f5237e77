//! HTML to Markdown conversion through prioritized rules.
//!
//! Every element is converted by the highest-priority [`Rule`] whose
//! [`Filter`] matches it; elements no rule claims get the default treatment
//! (paragraph breaks around block containers, pass-through for inline ones).
//! Ties in priority go to the rule registered first.
//!
//! A rule that fails is contained at its node: the engine records a warning,
//! drops whatever warnings the failed attempt produced, and converts that
//! subtree with the default treatment instead.
//!
//! # Example
//!
//! ```rust
//! use pagemark_core::rules::RuleEngine;
//!
//! let engine = RuleEngine::default();
//! let result = engine.convert("<h1>Title</h1><p>Hello world</p>");
//! assert_eq!(result.markdown, "# Title\n\nHello world");
//! assert!(result.warnings.is_empty());
//! ```

mod builtin;
mod verbatim;
mod walker;

pub use verbatim::{detect_language, fence_for, raw_text};
pub use walker::Walker;

use scraper::{ElementRef, Html};
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Elements converted as blocks: surrounded by blank lines, content trimmed.
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "dialog", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "html",
    "li", "main", "menu", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "ul",
];

/// Whether `tag` is converted as a block.
pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// Error reported by a rule transform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The element's content cannot be expressed by this rule.
    #[error("malformed content: {0}")]
    Malformed(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Output of one conversion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub markdown: String,
    pub warnings: Vec<String>,
}

/// Configuration for Markdown output.
///
/// # Example
///
/// ```rust
/// use pagemark_core::rules::ConversionOptions;
///
/// let options = ConversionOptions::builder().bullet_marker('*').detect_language(false).build();
/// assert_eq!(options.bullet_marker, '*');
/// ```
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Marker for unordered list items (default: `-`).
    pub bullet_marker: char,

    /// Fence character for verbatim blocks (default: backtick).
    pub fence_char: char,

    /// Escape Markdown-significant characters in text (default: true).
    pub escape_markdown: bool,

    /// Guess a language tag for untagged code blocks (default: true).
    pub detect_language: bool,

    /// Nesting depth past which subtrees are flattened to text (default: 256).
    pub max_depth: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self { bullet_marker: '-', fence_char: '`', escape_markdown: true, detect_language: true, max_depth: 256 }
    }
}

impl ConversionOptions {
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder::new()
    }
}

/// Builder for ConversionOptions.
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn new() -> Self {
        Self { options: ConversionOptions::default() }
    }

    /// Sets the bullet marker; anything other than `-`, `*` or `+` keeps the default.
    pub fn bullet_marker(mut self, value: char) -> Self {
        if matches!(value, '-' | '*' | '+') {
            self.options.bullet_marker = value;
        }
        self
    }

    /// Sets the fence character; anything other than backtick or `~` keeps the default.
    pub fn fence_char(mut self, value: char) -> Self {
        if matches!(value, '`' | '~') {
            self.options.fence_char = value;
        }
        self
    }

    pub fn escape_markdown(mut self, value: bool) -> Self {
        self.options.escape_markdown = value;
        self
    }

    pub fn detect_language(mut self, value: bool) -> Self {
        self.options.detect_language = value;
        self
    }

    pub fn max_depth(mut self, value: usize) -> Self {
        self.options.max_depth = value.max(1);
        self
    }

    pub fn build(self) -> ConversionOptions {
        self.options
    }
}

impl Default for ConversionOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for rule transforms.
pub type TransformFn = Box<dyn Fn(ElementRef<'_>, &mut Walker<'_>) -> Result<String, RuleError> + Send + Sync>;

/// Type alias for filter predicates.
pub type PredicateFn = Box<dyn Fn(&str, ElementRef<'_>, &ConversionOptions) -> bool + Send + Sync>;

/// Decides which elements a rule applies to.
pub enum Filter {
    Tag(String),
    Tags(Vec<String>),
    Predicate(PredicateFn),
}

impl Filter {
    pub fn tag(name: &str) -> Self {
        Filter::Tag(name.to_lowercase())
    }

    pub fn tags(names: &[&str]) -> Self {
        Filter::Tags(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Matches with a predicate over the lowercase tag name and the element.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, ElementRef<'_>, &ConversionOptions) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    pub fn matches(&self, tag: &str, element: ElementRef<'_>, options: &ConversionOptions) -> bool {
        match self {
            Filter::Tag(t) => tag == t,
            Filter::Tags(tags) => tags.iter().any(|t| t == tag),
            Filter::Predicate(f) => f(tag, element, options),
        }
    }
}

/// A named matcher/transform pair with a priority.
pub struct Rule {
    name: String,
    priority: i32,
    filter: Filter,
    transform: TransformFn,
}

impl Rule {
    pub fn new<F>(name: &str, priority: i32, filter: Filter, transform: F) -> Self
    where
        F: Fn(ElementRef<'_>, &mut Walker<'_>) -> Result<String, RuleError> + Send + Sync + 'static,
    {
        Self { name: name.to_string(), priority, filter, transform: Box::new(transform) }
    }

    pub fn for_tag<F>(name: &str, priority: i32, tag: &str, transform: F) -> Self
    where
        F: Fn(ElementRef<'_>, &mut Walker<'_>) -> Result<String, RuleError> + Send + Sync + 'static,
    {
        Self::new(name, priority, Filter::tag(tag), transform)
    }

    pub fn for_tags<F>(name: &str, priority: i32, tags: &[&str], transform: F) -> Self
    where
        F: Fn(ElementRef<'_>, &mut Walker<'_>) -> Result<String, RuleError> + Send + Sync + 'static,
    {
        Self::new(name, priority, Filter::tags(tags), transform)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn matches(&self, tag: &str, element: ElementRef<'_>, options: &ConversionOptions) -> bool {
        self.filter.matches(tag, element, options)
    }

    pub fn apply(&self, element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
        (self.transform)(element, walker)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).field("priority", &self.priority).finish()
    }
}

/// Converts normalized HTML to Markdown.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    options: ConversionOptions,
}

impl RuleEngine {
    /// Engine with the built-in rules.
    pub fn new(options: ConversionOptions) -> Self {
        Self::builder().options(options).build()
    }

    pub fn builder() -> RuleEngineBuilder {
        RuleEngineBuilder::new()
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Rules in the order they are tried.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Highest-priority rule claiming `element`, if any.
    pub fn rule_for(&self, element: ElementRef<'_>) -> Option<&Rule> {
        let tag = element.value().name().to_ascii_lowercase();
        self.rules.iter().find(|rule| rule.matches(&tag, element, &self.options))
    }

    pub fn convert(&self, html: &str) -> ConversionResult {
        self.convert_with_url(html, None)
    }

    /// Converts `html`, resolving relative links and images against `base_url`.
    pub fn convert_with_url(&self, html: &str, base_url: Option<&Url>) -> ConversionResult {
        let fragment = Html::parse_fragment(html);
        let mut walker = Walker::new(self, base_url);
        let body = walker.convert_children(fragment.root_element());
        walker.finish(&body)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(ConversionOptions::default())
    }
}

/// Builder for RuleEngine.
///
/// Custom rules join the built-in ones; ordering is by descending priority,
/// then registration order, with the built-ins registered first.
pub struct RuleEngineBuilder {
    options: ConversionOptions,
    rules: Vec<Rule>,
}

impl RuleEngineBuilder {
    pub fn new() -> Self {
        Self { options: ConversionOptions::default(), rules: builtin::rules() }
    }

    pub fn options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn add_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(mut self) -> RuleEngine {
        self.rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        RuleEngine { rules: self.rules, options: self.options }
    }
}

impl Default for RuleEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn convert(html: &str) -> String {
        RuleEngine::default().convert(html).markdown
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let md = convert("<h1>Title</h1><p>Hello world</p><h3>Sub <em>part</em></h3><p>More</p>");
        assert_eq!(md, "# Title\n\nHello world\n\n### Sub _part_\n\nMore");
    }

    #[test]
    fn test_end_to_end_example() {
        let md = convert("<h1>Title</h1><p>Hello  world</p><pre>a\n  b</pre>");
        assert_eq!(md, "# Title\n\nHello world\n\n```\na\n  b\n```");
    }

    #[rstest]
    #[case("<p>a <strong>bold</strong> move</p>", "a **bold** move")]
    #[case("<p>an <i>aside</i></p>", "an _aside_")]
    #[case("<p><del>gone</del></p>", "~~gone~~")]
    #[case("<p>x<b> y </b>z</p>", "x **y** z")]
    #[case("<p>line<br>break</p>", "line\nbreak")]
    #[case("<p>a</p><hr><p>b</p>", "a\n\n---\n\nb")]
    #[case("<p>2 * 3 = [six]_</p>", "2 \\* 3 = \\[six\\]\\_")]
    fn test_inline_rules(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(convert(html), expected);
    }

    #[rstest]
    #[case("<p>use <code>cargo build</code></p>", "use `cargo build`")]
    #[case("<p><code>a`b</code></p>", "`a\\`b`")]
    #[case("<p>press <kbd>Ctrl</kbd></p>", "press `Ctrl`")]
    fn test_inline_code(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(convert(html), expected);
    }

    #[test]
    fn test_links_resolve_against_base() {
        let engine = RuleEngine::default();
        let base = Url::parse("https://example.com/blog/post").unwrap();
        let html = r#"<p><a href="/about" title="About us">About</a> and <a href="next">next</a></p>"#;
        let result = engine.convert_with_url(html, Some(&base));
        assert_eq!(
            result.markdown,
            "[About](https://example.com/about \"About us\") and [next](https://example.com/blog/next)"
        );
    }

    #[rstest]
    #[case("<a href=\"javascript:void(0)\">click</a>", "click")]
    #[case("<a>anchor</a>", "anchor")]
    #[case("<a href=\"relative/page\">rel</a>", "[rel](relative/page)")]
    fn test_link_fallbacks(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(convert(html), expected);
    }

    #[rstest]
    #[case("<img src=\"a.png\" alt=\"An image\">", "![An image](a.png)")]
    #[case("<img data-src=\"lazy.png\" alt=\"lazy\" title=\"T\">", "![lazy](lazy.png \"T\")")]
    #[case("<p>before<img alt=\"none\">after</p>", "beforeafter")]
    fn test_images(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(convert(html), expected);
    }

    #[test]
    fn test_blockquote() {
        let md = convert("<blockquote><p>first</p><p>second</p></blockquote>");
        assert_eq!(md, "> first\n>\n> second");
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        assert_eq!(convert("<ul><li>one</li><li>two</li></ul>"), "- one\n- two");
        assert_eq!(convert("<ol start=\"3\"><li>c</li><li>d</li></ol>"), "3. c\n4. d");
    }

    #[test]
    fn test_custom_bullet() {
        let engine = RuleEngine::new(ConversionOptions::builder().bullet_marker('*').build());
        assert_eq!(engine.convert("<ul><li>x</li></ul>").markdown, "* x");
    }

    #[test]
    fn test_nested_lists_indent_deeper() {
        let html = "<ul><li>a<ul><li>b<ol><li>c</li></ol></li></ul></li><li>d</li></ul>";
        assert_eq!(convert(html), "- a\n  - b\n    1. c\n- d");
    }

    #[test]
    fn test_table() {
        let html = "<table><thead><tr><th>Name</th><th>Qty</th></tr></thead>\
                    <tbody><tr><td>apple</td><td>3</td></tr><tr><td>a|b</td></tr></tbody></table>";
        let expected = "| Name  | Qty |\n| ----- | --- |\n| apple | 3   |\n| a\\|b  |     |";
        assert_eq!(convert(html), expected);
    }

    #[test]
    fn test_rule_failure_falls_back_with_warning() {
        let html = "<table><tr><td><pre>x  y</pre></td></tr></table>";
        let result = RuleEngine::default().convert(html);
        assert_eq!(result.markdown, "```\nx  y\n```");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("table"));
    }

    #[test]
    fn test_priority_ordering_is_stable() {
        let engine = RuleEngine::builder()
            .add_rule(Rule::for_tag("first-custom", 400, "h2", |_, _| Ok("FIRST".into())))
            .add_rule(Rule::for_tag("second-custom", 400, "h2", |_, _| Ok("SECOND".into())))
            .build();

        // the built-in heading rule shares priority 400 and was registered first
        assert_eq!(engine.convert("<h2>x</h2>").markdown, "## x");

        let names: Vec<&str> = engine.rules().filter(|r| r.priority() == 400).map(Rule::name).collect();
        assert_eq!(names, vec!["heading", "first-custom", "second-custom"]);
    }

    #[test]
    fn test_higher_priority_custom_rule_wins() {
        let engine = RuleEngine::builder()
            .add_rule(Rule::for_tag("shout", 450, "h2", |el, walker| {
                Ok(format!("\n\n**{}**\n\n", walker.convert_children(el).trim().to_uppercase()))
            }))
            .build();
        assert_eq!(engine.convert("<h2>quiet</h2>").markdown, "**QUIET**");
    }

    #[test]
    fn test_failed_rule_discards_its_own_warnings() {
        let engine = RuleEngine::builder()
            .add_rule(Rule::for_tag("noisy", 900, "section", |el, walker| {
                walker.warn("partial work");
                let _ = walker.convert_children(el);
                Err(RuleError::Unsupported("sections".into()))
            }))
            .build();
        let result = engine.convert("<section><p>kept</p></section>");
        assert_eq!(result.markdown, "kept");
        assert_eq!(result.warnings, vec!["rule 'noisy' failed on <section>: unsupported: sections".to_string()]);
    }

    #[test]
    fn test_depth_limit_flattens() {
        let engine = RuleEngine::new(ConversionOptions::builder().max_depth(3).build());
        let result = engine.convert("<div><div><div><div><p>deep  <b>text</b></p></div></div></div></div>");
        assert_eq!(result.markdown, "deep text");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_ignores_head_content() {
        assert_eq!(convert("<title>T</title><p>body</p>"), "body");
    }

    #[test]
    fn test_placeholder_characters_in_text_are_stripped() {
        assert_eq!(convert("<p>a\u{E000}0\u{E001}b</p>"), "a0b");
    }

    #[test]
    fn test_placeholder_characters_in_inline_code_are_stripped() {
        let md = convert("<pre>SECRET</pre><p>see <code>\u{E000}0\u{E001}</code></p>");
        assert_eq!(md, "```\nSECRET\n```\n\nsee `0`");
    }

    #[rstest]
    #[case("<p># not a heading</p>", "\\# not a heading")]
    #[case("<p>- not a list</p>", "\\- not a list")]
    #[case("<p>&gt; not a quote</p>", "\\> not a quote")]
    #[case("<p>1. not ordered</p>", "1\\. not ordered")]
    #[case("<p>2) nor this</p>", "2\\) nor this")]
    #[case("<p>+ plus</p>", "\\+ plus")]
    #[case("<p>---</p>", "\\---")]
    #[case("<p>line<br># after a break</p>", "line\n\\# after a break")]
    #[case("<ul><li># tagged</li></ul>", "- \\# tagged")]
    #[case("<blockquote><p>- quoted</p></blockquote>", "> \\- quoted")]
    #[case("<h2># title</h2>", "## # title")]
    #[case("<p><b>x</b> - y</p>", "**x** - y")]
    #[case("<p>a - b # c</p>", "a - b # c")]
    #[case("<p>#hashtag and 4.1 MB</p>", "#hashtag and 4.1 MB")]
    fn test_block_syntax_in_text_is_escaped(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(convert(html), expected);
    }

    #[test]
    fn test_block_syntax_in_table_cells_keeps_alignment() {
        assert_eq!(convert("<table><tr><th>- x</th></tr></table>"), "| - x |\n| --- |");
    }

    #[test]
    fn test_block_syntax_kept_when_escaping_disabled() {
        let engine = RuleEngine::new(ConversionOptions::builder().escape_markdown(false).build());
        assert_eq!(engine.convert("<p># raw</p>").markdown, "# raw");
    }

    #[rstest]
    #[case("<ol start=\"9223372036854775807\"><li>a</li><li>b</li></ol>", "999999999. a\n1000000000. b")]
    #[case("<ol start=\"-4\"><li>a</li></ol>", "0. a")]
    #[case("<ol start=\"x\"><li>a</li></ol>", "1. a")]
    fn test_ordered_list_start_is_bounded(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(convert(html), expected);
    }
}
