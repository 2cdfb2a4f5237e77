use scraper::{ElementRef, Node};
use url::Url;

use super::{ConversionOptions, ConversionResult, RuleEngine, builtin};

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';
/// Marks text that would open a block if it began a line.
const LINE_START_MARK: char = '\u{E002}';

const MARKDOWN_SPECIAL: &[char] = &['\\', '*', '_', '`', '[', ']'];

/// Conversion state threaded through rule transforms.
///
/// Transforms call back into the walker to convert their children, so one
/// walker lives for exactly one conversion call.
pub struct Walker<'e> {
    engine: &'e RuleEngine,
    base_url: Option<&'e Url>,
    warnings: Vec<String>,
    blocks: Vec<String>,
    depth: usize,
    depth_warned: bool,
}

impl<'e> Walker<'e> {
    pub(super) fn new(engine: &'e RuleEngine, base_url: Option<&'e Url>) -> Self {
        Self { engine, base_url, warnings: Vec::new(), blocks: Vec::new(), depth: 0, depth_warned: false }
    }

    pub fn options(&self) -> &ConversionOptions {
        self.engine.options()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url
    }

    /// Records a conversion warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Resolves a link destination against the page URL, keeping the raw
    /// value when it cannot be resolved.
    pub fn resolve_url(&self, href: &str) -> String {
        let href = href.trim();
        match self.base_url {
            Some(base) => base.join(href).map(String::from).unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    /// Converts one element with the rule that claims it.
    pub fn convert_node(&mut self, element: ElementRef<'_>) -> String {
        if self.depth >= self.options().max_depth {
            if !self.depth_warned {
                self.depth_warned = true;
                let limit = self.options().max_depth;
                self.warn(format!("nesting deeper than {limit} levels flattened to text"));
            }
            return self.text(&element.text().collect::<String>());
        }

        self.depth += 1;
        let output = self.apply_rule(element);
        self.depth -= 1;
        output
    }

    fn apply_rule(&mut self, element: ElementRef<'_>) -> String {
        let engine = self.engine;
        let Some(rule) = engine.rule_for(element) else {
            return builtin::default_output(element, self);
        };

        let mark = self.warnings.len();
        match rule.apply(element, self) {
            Ok(markdown) => markdown,
            Err(err) => {
                let tag = element.value().name();
                tracing::debug!(rule = rule.name(), tag, %err, "rule failed, using default output");
                self.warnings.truncate(mark);
                self.warn(format!("rule '{}' failed on <{}>: {}", rule.name(), tag, err));
                builtin::default_output(element, self)
            }
        }
    }

    /// Converts all children of `parent` and joins them.
    pub fn convert_children(&mut self, parent: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in parent.children() {
            let piece = match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => match ElementRef::wrap(child) {
                    Some(element) => self.convert_node(element),
                    None => continue,
                },
                _ => continue,
            };
            join_inline(&mut out, &piece);
        }
        out
    }

    /// Converts a text node: whitespace collapsed, Markdown syntax escaped.
    pub fn text(&self, raw: &str) -> String {
        let escape = self.options().escape_markdown;
        let mut out = String::with_capacity(raw.len());
        let mut space = false;

        for ch in raw.chars() {
            match ch {
                ' ' | '\t' | '\n' | '\r' | '\x0C' => space = true,
                PLACEHOLDER_OPEN | PLACEHOLDER_CLOSE | LINE_START_MARK => {}
                _ => {
                    if space {
                        out.push(' ');
                        space = false;
                    }
                    if escape && MARKDOWN_SPECIAL.contains(&ch) {
                        out.push('\\');
                    }
                    out.push(ch);
                }
            }
        }
        if space {
            out.push(' ');
        }
        if escape {
            let offset = out.len() - out.trim_start_matches(' ').len();
            if opens_block(&out[offset..]) {
                out.insert(offset, LINE_START_MARK);
            }
        }
        out
    }

    /// Sets aside a finished block that must reach the output unchanged and
    /// returns the token standing in for it.
    ///
    /// The token occupies one line. Container rules may prefix that line;
    /// the prefix is carried onto every line of the block when it is put back.
    pub fn reserve_block(&mut self, block: String) -> String {
        self.blocks.push(block);
        format!("{PLACEHOLDER_OPEN}{}{PLACEHOLDER_CLOSE}", self.blocks.len() - 1)
    }

    pub(super) fn finish(self, body: &str) -> ConversionResult {
        let markdown = restore_blocks(&resolve_line_marks(tidy(body).trim()), &self.blocks);
        ConversionResult { markdown, warnings: self.warnings }
    }
}

/// Removes the characters reserved for block tokens and line-start marks.
pub fn strip_reserved(text: &str) -> String {
    text.chars().filter(|c| !matches!(*c, PLACEHOLDER_OPEN | PLACEHOLDER_CLOSE | LINE_START_MARK)).collect()
}

/// Whether converted output holds a reserved block.
pub fn contains_block(markdown: &str) -> bool {
    markdown.contains(PLACEHOLDER_OPEN)
}

/// Appends an inline piece, dropping leading spaces at line starts and after a space.
pub fn join_inline(out: &mut String, piece: &str) {
    let piece = if out.is_empty() || out.ends_with('\n') || out.ends_with(' ') { piece.trim_start_matches(' ') } else { piece };
    out.push_str(piece);
}

/// Trims line ends and keeps at most one blank line in a row.
pub fn tidy(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.pop();
    out
}

/// Whether text at the start of a line would read as a heading, quote,
/// list item, thematic break or setext underline.
fn opens_block(text: &str) -> bool {
    let bytes = text.trim_end().as_bytes();
    let Some(&first) = bytes.first() else {
        return false;
    };
    let marker_ends = |i: usize| bytes.get(i).is_none_or(|b| *b == b' ');

    match first {
        b'>' => true,
        b'#' => {
            let run = bytes.iter().take_while(|b| **b == b'#').count();
            run <= 6 && marker_ends(run)
        }
        b'+' => marker_ends(1),
        b'-' => marker_ends(1) || bytes.iter().all(|b| *b == b'-'),
        b'=' => bytes.iter().all(|b| *b == b'='),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            digits <= 9 && matches!(bytes.get(digits), Some(b'.' | b')')) && marker_ends(digits + 1)
        }
        _ => false,
    }
}

/// Escapes marked text that still begins a line once container prefixes
/// are accounted for, and drops every other mark.
fn resolve_line_marks(markdown: &str) -> String {
    if !markdown.contains(LINE_START_MARK) {
        return markdown.to_string();
    }

    let mut out = String::with_capacity(markdown.len() + 8);
    for (i, line) in markdown.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut rest = line;
        while let Some(pos) = rest.find(LINE_START_MARK) {
            let prefix = &line[..line.len() - rest.len() + pos];
            let after = &rest[pos + LINE_START_MARK.len_utf8()..];
            out.push_str(&rest[..pos]);
            rest = after;
            if is_container_prefix(prefix) {
                let digits = after.bytes().take_while(u8::is_ascii_digit).count();
                out.push_str(&after[..digits]);
                out.push('\\');
                rest = &after[digits..];
            }
        }
        out.push_str(rest);
    }
    out
}

/// Whether a line prefix holds nothing but quote and list markers.
fn is_container_prefix(prefix: &str) -> bool {
    prefix.split_whitespace().all(|token| {
        token.chars().all(|c| c == '>')
            || matches!(token, "-" | "*" | "+")
            || token
                .strip_suffix(['.', ')'])
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    })
}

fn restore_blocks(markdown: &str, blocks: &[String]) -> String {
    if blocks.is_empty() {
        return markdown.to_string();
    }

    let mut out = String::with_capacity(markdown.len() + blocks.iter().map(String::len).sum::<usize>());
    for (i, line) in markdown.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match split_placeholder(line).and_then(|(prefix, index, rest)| Some((prefix, blocks.get(index)?, rest))) {
            Some((prefix, block, rest)) => {
                let continuation: String = prefix.chars().map(|c| if c == '>' { '>' } else { ' ' }).collect();
                for (j, block_line) in block.split('\n').enumerate() {
                    if j == 0 {
                        out.push_str(prefix);
                    } else {
                        out.push('\n');
                        out.push_str(if block_line.is_empty() { continuation.trim_end() } else { &continuation });
                    }
                    out.push_str(block_line);
                }
                out.push_str(rest);
            }
            None => out.push_str(line),
        }
    }
    out
}

fn split_placeholder(line: &str) -> Option<(&str, usize, &str)> {
    let start = line.find(PLACEHOLDER_OPEN)?;
    let digits_start = start + PLACEHOLDER_OPEN.len_utf8();
    let end = digits_start + line[digits_start..].find(PLACEHOLDER_CLOSE)?;
    let index = line[digits_start..end].parse().ok()?;
    Some((&line[..start], index, &line[end + PLACEHOLDER_CLOSE.len_utf8()..]))
}
