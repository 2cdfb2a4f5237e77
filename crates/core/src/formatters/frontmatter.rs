use time::format_description::well_known::Rfc3339;

use crate::snapshot::PageSnapshot;
use crate::{PagemarkError, Result};

/// Frontmatter delimiter and syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontmatterStyle {
    /// `---` fenced YAML
    #[default]
    Yaml,
    /// `+++` fenced TOML
    Toml,
}

/// Configuration for the stored document
#[derive(Debug, Clone)]
pub struct FrontmatterConfig {
    /// Include a frontmatter block ahead of the body
    pub include_frontmatter: bool,
    pub style: FrontmatterStyle,
    /// Classification tags
    pub tags: Vec<String>,
}

impl Default for FrontmatterConfig {
    fn default() -> Self {
        Self { include_frontmatter: true, style: FrontmatterStyle::Yaml, tags: vec!["clipping".to_string()] }
    }
}

/// Frontmatter block for a captured page, including the closing delimiter
/// and a trailing newline.
///
/// # Errors
///
/// Returns [`PagemarkError::ConfigError`] when the capture time cannot be
/// written as RFC 3339.
pub fn generate_frontmatter(snapshot: &PageSnapshot, config: &FrontmatterConfig) -> Result<String> {
    let captured = snapshot
        .captured_at()
        .format(&Rfc3339)
        .map_err(|e| PagemarkError::ConfigError(format!("Invalid capture time: {e}")))?;
    let title = snapshot.title().trim();

    let mut frontmatter = String::new();
    match config.style {
        FrontmatterStyle::Yaml => {
            frontmatter.push_str("---");
            if !title.is_empty() {
                frontmatter.push_str(&format!("\ntitle: {}", quote(title)));
            }
            frontmatter.push_str(&format!("\nsource: {}", quote(snapshot.url())));
            frontmatter.push_str(&format!("\ncaptured: {captured}"));
            if config.tags.is_empty() {
                frontmatter.push_str("\ntags: []");
            } else {
                frontmatter.push_str("\ntags:");
                for tag in &config.tags {
                    frontmatter.push_str(&format!("\n  - {}", quote(tag)));
                }
            }
            frontmatter.push_str("\n---\n");
        }
        FrontmatterStyle::Toml => {
            frontmatter.push_str("+++");
            if !title.is_empty() {
                frontmatter.push_str(&format!("\ntitle = {}", quote(title)));
            }
            frontmatter.push_str(&format!("\nsource = {}", quote(snapshot.url())));
            frontmatter.push_str(&format!("\ncaptured = {captured}"));
            let tags: Vec<String> = config.tags.iter().map(|t| quote(t)).collect();
            frontmatter.push_str(&format!("\ntags = [{}]", tags.join(", ")));
            frontmatter.push_str("\n+++\n");
        }
    }

    Ok(frontmatter)
}

/// The stored document: frontmatter block, blank line, Markdown body.
pub fn render_document(markdown: &str, snapshot: &PageSnapshot, config: &FrontmatterConfig) -> Result<String> {
    let mut output = String::new();
    if config.include_frontmatter {
        output.push_str(&generate_frontmatter(snapshot, config)?);
        output.push('\n');
    }
    output.push_str(markdown.trim_end());
    output.push('\n');
    Ok(output)
}

/// Double-quoted string valid in both TOML and YAML.
fn quote(s: &str) -> String {
    let needs_escape = s.contains(['"', '\\', '\n', '\r', '\t']);
    if needs_escape {
        format!(
            "\"{}\"",
            s.replace('\\', "\\\\")
                .replace('\"', "\\\"")
                .replace('\n', "\\n")
                .replace('\r', "\\r")
                .replace('\t', "\\t")
        )
    } else {
        format!("\"{}\"", s)
    }
}
