pub mod chain;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod formatters;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod probe;
pub mod protocol;
pub mod rules;
pub mod snapshot;

pub use chain::{
    CaptureFailure, CaptureStage, ChainConfig, ExtractionFallbackChain, ExtractionFallbackChainBuilder, FallbackOutcome,
    InjectionStage, MessagingStage, PageAgent, PageLink, PageTarget, StaticPage, is_restricted_url, minimal_document,
};
pub use error::{ErrorKind, PagemarkError, Result};
pub use extract::{ContentExtractor, ExtractorConfig, RootSource};
pub use fetch::{FetchConfig, fetch_file, fetch_stdin};
#[cfg(feature = "fetch")]
pub use fetch::fetch_url;
pub use formatters::{FrontmatterConfig, FrontmatterStyle, generate_frontmatter, render_document};
pub use normalize::{DomNormalizer, Fragment, HtmlNormalizer, Strategy, StreamNormalizer};
pub use parse::Document;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use probe::{AmbientProbe, CapabilityProbe, ExecutionContext, FixedProbe, within_page};
pub use protocol::{CaptureRequest, CaptureResponse};
pub use rules::{ConversionOptions, ConversionOptionsBuilder, ConversionResult, Filter, Rule, RuleEngine, RuleError};
pub use snapshot::PageSnapshot;
