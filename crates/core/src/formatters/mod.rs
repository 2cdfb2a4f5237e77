pub mod frontmatter;

pub use frontmatter::{FrontmatterConfig, FrontmatterStyle, generate_frontmatter, render_document};
