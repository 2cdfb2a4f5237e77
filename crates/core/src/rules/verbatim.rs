//! Fenced blocks for preformatted content.
//!
//! The payload of a verbatim element is its text with tags stripped and `<br>`
//! turned into a newline; entities were already decoded by the parser. Nothing
//! else touches it: no trimming, no whitespace collapse, no escaping.

use scraper::{ElementRef, Node};

use super::{ConversionOptions, RuleError, Walker, is_block};
use crate::normalize::{looks_like_tree, preserves_whitespace};

/// Block containers that can hold a diagram or preformatted output.
const VERBATIM_CONTAINERS: &[&str] = &["div", "p", "section", "figure", "aside"];

const CLASS_LANGUAGE_PREFIXES: &[&str] = &["language-", "lang-", "highlight-source-"];

/// Substrings that suggest a language; a language needs two distinct hits.
const LANGUAGE_CUES: &[(&str, &[&str])] = &[
    ("rust", &["fn main", "let mut ", "pub fn ", "impl ", "println!", "&mut ", "use std::", "#[derive", "-> Result<"]),
    ("python", &["def ", "elif ", "self.", "__init__", "print(", "import ", "lambda ", "None"]),
    ("javascript", &["function ", "const ", "=> ", "console.log", "document.", "require(", "===", "let "]),
    ("bash", &["#!/bin/bash", "#!/bin/sh", "echo ", "sudo ", "apt-get ", "export ", "$ ", "fi\n", "then\n"]),
    ("html", &["<!DOCTYPE", "<html", "<div", "</div>", "<p>", "class=\"", "<head>", "<body>"]),
    ("sql", &["SELECT ", " FROM ", "WHERE ", "INSERT INTO", "CREATE TABLE", "JOIN ", "GROUP BY"]),
    ("go", &["package main", "func ", "fmt.", ":= ", "import (", "go func", "err != nil"]),
];

pub(super) fn is_verbatim(tag: &str, element: ElementRef<'_>, _: &ConversionOptions) -> bool {
    match tag {
        "pre" | "listing" | "xmp" | "plaintext" | "textarea" => true,
        "code" => raw_text(element).contains('\n'),
        _ if VERBATIM_CONTAINERS.contains(&tag) => {
            if !inline_only(element) {
                return false;
            }
            let el = element.value();
            preserves_whitespace(tag, el.attr("class"), el.attr("style")) || looks_like_tree(&raw_text(element))
        }
        _ => false,
    }
}

pub(super) fn verbatim_block(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let payload = raw_text(element);
    if payload.trim().is_empty() {
        return Ok(String::new());
    }

    let language = if looks_like_tree(&payload) {
        None
    } else {
        language_from_classes(element).or_else(|| {
            if walker.options().detect_language { detect_language(&payload).map(str::to_string) } else { None }
        })
    };

    let fence = fence_for(&payload, walker.options().fence_char);
    let mut block = format!("{fence}{}\n{payload}", language.unwrap_or_default());
    if !payload.ends_with('\n') {
        block.push('\n');
    }
    block.push_str(&fence);

    let token = walker.reserve_block(block);
    Ok(format!("\n\n{token}\n\n"))
}

/// Text of `element` with tags stripped and `<br>` as newline.
pub fn raw_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_raw(element, &mut out);
    out
}

fn collect_raw(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) if matches!(el.name(), "script" | "style") => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_raw(child, out);
                }
            }
            _ => {}
        }
    }
}

fn inline_only(element: ElementRef<'_>) -> bool {
    !element.descendants().skip(1).filter_map(ElementRef::wrap).any(|el| is_block(el.value().name()))
}

/// Fence long enough that no run inside `payload` closes it early.
pub fn fence_for(payload: &str, fence_char: char) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in payload.chars() {
        if ch == fence_char {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let len = if longest >= 3 { longest + 1 } else { 3 };
    fence_char.to_string().repeat(len)
}

/// Language named by a `language-*`, `lang-*` or `highlight-source-*` class
/// on the element or on a `code` child of it.
fn language_from_classes(element: ElementRef<'_>) -> Option<String> {
    let code_child = element.children().filter_map(ElementRef::wrap).find(|c| c.value().name() == "code");

    std::iter::once(element)
        .chain(code_child)
        .filter_map(|el| el.value().attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| {
            CLASS_LANGUAGE_PREFIXES.iter().find_map(|prefix| {
                let name: String = class
                    .strip_prefix(prefix)?
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '_' | '.'))
                    .collect::<String>()
                    .to_ascii_lowercase();
                (!name.is_empty()).then_some(name)
            })
        })
}

/// Guesses the language of a code payload from a fixed cue table.
///
/// Returns `None` unless one language scores at least two and no other
/// language ties it.
pub fn detect_language(payload: &str) -> Option<&'static str> {
    let mut scores: Vec<(&'static str, usize)> = LANGUAGE_CUES
        .iter()
        .map(|(language, cues)| (*language, cues.iter().filter(|cue| payload.contains(*cue)).count()))
        .collect();
    scores.push(("json", json_score(payload)));

    let best = scores.iter().map(|(_, score)| *score).max().unwrap_or(0);
    if best < 2 {
        return None;
    }

    let mut leaders = scores.iter().filter(|(_, score)| *score == best);
    match (leaders.next(), leaders.next()) {
        (Some((language, _)), None) => Some(language),
        _ => None,
    }
}

fn json_score(payload: &str) -> usize {
    let trimmed = payload.trim();
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if !bracketed {
        return 0;
    }
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() { 3 } else { 1 }
}
