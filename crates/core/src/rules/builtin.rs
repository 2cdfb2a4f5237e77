//! The built-in rule set.

use scraper::{ElementRef, Node};

use super::verbatim::{is_verbatim, verbatim_block};
use super::walker::{contains_block, join_inline, strip_reserved, tidy};
use super::{Filter, Rule, RuleError, Walker, is_block};

/// Largest start number an ordered-list marker may carry.
const MAX_LIST_START: i64 = 999_999_999;

const IGNORED_TAGS: &[&str] = &["head", "title", "meta", "link", "template", "script", "style", "noscript"];

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::for_tags("ignored", 700, IGNORED_TAGS, |_, _| Ok(String::new())),
        Rule::new("verbatim", 600, Filter::predicate(is_verbatim), verbatim_block),
        Rule::for_tags("inline-code", 500, &["code", "kbd", "samp", "tt"], inline_code),
        Rule::for_tags("heading", 400, &["h1", "h2", "h3", "h4", "h5", "h6"], heading),
        Rule::for_tags("list", 300, &["ul", "ol"], list),
        Rule::for_tag("table", 200, "table", table),
        Rule::for_tag("blockquote", 200, "blockquote", blockquote),
        Rule::for_tag("link", 200, "a", link),
        Rule::for_tag("image", 200, "img", image),
        Rule::for_tag("rule", 200, "hr", |_, _| Ok("\n\n---\n\n".to_string())),
        Rule::for_tag("line-break", 200, "br", |_, _| Ok("\n".to_string())),
        Rule::for_tags("emphasis", 200, &["em", "i"], |el, walker| delimited(el, walker, "_")),
        Rule::for_tags("strong", 200, &["strong", "b"], |el, walker| delimited(el, walker, "**")),
        Rule::for_tags("strikethrough", 200, &["del", "s", "strike"], |el, walker| delimited(el, walker, "~~")),
    ]
}

/// Output for elements no rule claims, and for subtrees whose rule failed.
pub(super) fn default_output(element: ElementRef<'_>, walker: &mut Walker<'_>) -> String {
    let content = walker.convert_children(element);
    if !is_block(element.value().name()) {
        return content;
    }

    let content = content.trim();
    if content.is_empty() { String::new() } else { format!("\n\n{content}\n\n") }
}

fn ensure_inline(content: &str, what: &str) -> Result<(), RuleError> {
    if contains_block(content) {
        return Err(RuleError::Malformed(format!("block content inside {what}")));
    }
    Ok(())
}

fn inline_code(element: ElementRef<'_>, _: &mut Walker<'_>) -> Result<String, RuleError> {
    let text = strip_reserved(&element.text().collect::<String>()).replace('\n', " ");
    if text.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(format!("`{}`", text.replace('`', "\\`")))
}

fn heading(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let level = element.value().name()[1..].parse::<usize>().unwrap_or(1).clamp(1, 6);
    let content = walker.convert_children(element);
    ensure_inline(&content, "heading")?;

    let text = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("\n\n{} {}\n\n", "#".repeat(level), text))
}

fn delimited(element: ElementRef<'_>, walker: &mut Walker<'_>, delimiter: &str) -> Result<String, RuleError> {
    let content = walker.convert_children(element);
    ensure_inline(&content, element.value().name())?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(if content.is_empty() { String::new() } else { " ".to_string() });
    }

    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    Ok(format!("{lead}{delimiter}{trimmed}{delimiter}{trail}"))
}

fn link(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let text = walker.convert_children(element);

    let Some(href) = element.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(text);
    };
    if href.to_ascii_lowercase().starts_with("javascript:") {
        return Ok(text);
    }
    ensure_inline(&text, "link")?;

    let mut destination = walker.resolve_url(href);
    if destination.contains(' ') {
        destination = format!("<{destination}>");
    }
    let label = match text.trim() {
        "" => destination.clone(),
        label => label.replace('\n', " "),
    };

    Ok(match element.value().attr("title").filter(|t| !t.trim().is_empty()) {
        Some(title) => format!("[{}]({} \"{}\")", label, destination, title.replace('"', "\\\"")),
        None => format!("[{}]({})", label, destination),
    })
}

fn image(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let el = element.value();
    let Some(src) = el.attr("src").or_else(|| el.attr("data-src")).map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(String::new());
    };

    let alt = walker.text(el.attr("alt").unwrap_or_default()).trim().to_string();
    let destination = walker.resolve_url(src);

    Ok(match el.attr("title").filter(|t| !t.trim().is_empty()) {
        Some(title) => format!("![{}]({} \"{}\")", alt, destination, title.replace('"', "\\\"")),
        None => format!("![{}]({})", alt, destination),
    })
}

fn blockquote(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let content = tidy(walker.convert_children(element).trim());
    if content.is_empty() {
        return Ok(String::new());
    }

    let quoted = content
        .lines()
        .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("\n\n{quoted}\n\n"))
}

/// One list item: content before its first nested list, then nested lists
/// and any content following them, in document order.
#[derive(Default)]
struct ListItem {
    lead: String,
    rest: Vec<String>,
}

fn list(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let ordered = element.value().name() == "ol";
    let start = element
        .value()
        .attr("start")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map_or(1, |n| n.clamp(0, MAX_LIST_START));
    let bullet = walker.options().bullet_marker;

    let mut items: Vec<ListItem> = Vec::new();
    for child in element.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "li" => items.push(list_item(child, walker)),
            // a list directly inside a list belongs to the preceding item
            "ul" | "ol" => {
                let nested = walker.convert_node(child).trim().to_string();
                if nested.is_empty() {
                    continue;
                }
                match items.last_mut() {
                    Some(item) => item.rest.push(nested),
                    None => items.push(ListItem { lead: String::new(), rest: vec![nested] }),
                }
            }
            _ => {
                let lead = tidy(walker.convert_node(child).trim());
                if !lead.is_empty() {
                    items.push(ListItem { lead, rest: Vec::new() });
                }
            }
        }
    }

    if items.is_empty() {
        return Ok(String::new());
    }

    let rendered: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if ordered { format!("{}.", start.saturating_add(i as i64)) } else { bullet.to_string() };
            render_item(&marker, item)
        })
        .collect();

    Ok(format!("\n\n{}\n\n", rendered.join("\n")))
}

fn list_item(li: ElementRef<'_>, walker: &mut Walker<'_>) -> ListItem {
    let mut item = ListItem::default();
    let mut current = String::new();
    let mut seen_nested = false;

    for child in li.children() {
        match child.value() {
            Node::Text(text) => {
                let piece = walker.text(text);
                join_inline(&mut current, &piece);
            }
            Node::Element(el) => {
                let Some(child) = ElementRef::wrap(child) else { continue };
                if matches!(el.name(), "ul" | "ol") {
                    let content = tidy(current.trim());
                    current.clear();
                    if seen_nested {
                        item.rest.push(content);
                    } else {
                        item.lead = content;
                        seen_nested = true;
                    }
                    item.rest.push(walker.convert_node(child).trim().to_string());
                } else {
                    let piece = walker.convert_node(child);
                    join_inline(&mut current, &piece);
                }
            }
            _ => {}
        }
    }

    let content = tidy(current.trim());
    if seen_nested {
        item.rest.push(content);
    } else {
        item.lead = content;
    }
    item.rest.retain(|segment| !segment.is_empty());
    item
}

/// Marker plus the item's first line; every later line is indented by the
/// marker width so nested content sits strictly deeper.
fn render_item(marker: &str, item: &ListItem) -> String {
    let indent = " ".repeat(marker.chars().count() + 1);
    let mut lines = item.lead.lines().chain(item.rest.iter().flat_map(|segment| segment.lines()));

    let mut out = marker.to_string();
    if !item.lead.is_empty()
        && let Some(first) = lines.next()
    {
        out.push(' ');
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&indent);
            out.push_str(line);
        }
    }
    out
}

fn table(element: ElementRef<'_>, walker: &mut Walker<'_>) -> Result<String, RuleError> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    for row in table_rows(element) {
        let mut cells = Vec::new();
        for cell in row.children().filter_map(ElementRef::wrap).filter(|c| matches!(c.value().name(), "td" | "th")) {
            if cell.descendants().filter_map(ElementRef::wrap).any(|d| d.value().name() == "table") {
                return Err(RuleError::Malformed("nested table".into()));
            }
            let content = walker.convert_children(cell);
            ensure_inline(&content, "table cell")?;
            let flat = content.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ");
            cells.push(strip_reserved(&flat).replace('|', "\\|"));
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Ok(String::new());
    }
    for row in &mut rows {
        row.resize(columns, String::new());
    }

    let widths: Vec<usize> =
        (0..columns).map(|c| rows.iter().map(|r| r[c].chars().count()).max().unwrap_or(0).max(3)).collect();

    let render = |cells: &[String]| {
        let padded: Vec<String> =
            cells.iter().zip(&widths).map(|(cell, width)| format!("{cell:<width$}", width = *width)).collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = vec![render(&rows[0])];
    lines.push(format!("| {} |", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join(" | ")));
    lines.extend(rows[1..].iter().map(|row| render(row)));

    Ok(format!("\n\n{}\n\n", lines.join("\n")))
}

/// Rows of `table` in document order, skipping rows of nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child.children().filter_map(ElementRef::wrap).filter(|r| r.value().name() == "tr"))
            }
            _ => {}
        }
    }
    rows
}
