//! One capture, start to finish: probe, parse, extract, normalize, convert.

use crate::error::{PagemarkError, Result};
use crate::extract::{ContentExtractor, RootSource};
use crate::normalize::{DomNormalizer, Fragment, HtmlNormalizer, StreamNormalizer};
use crate::parse::Document;
use crate::probe::{AmbientProbe, CapabilityProbe, ExecutionContext};
use crate::rules::{ConversionResult, RuleEngine};
use crate::snapshot::PageSnapshot;

/// The conversion components for one page, wired together explicitly.
///
/// # Example
///
/// ```rust
/// use pagemark_core::{ExecutionContext, FixedProbe, PageSnapshot, Pipeline};
///
/// let pipeline = Pipeline::builder().probe(FixedProbe(ExecutionContext::DomUnavailable)).build();
/// let snapshot = PageSnapshot::from_html("https://example.com", "<main><h1>Hi</h1><p>there</p></main>");
/// let result = pipeline.run(&snapshot).unwrap();
/// assert_eq!(result.markdown, "# Hi\n\nthere");
/// ```
pub struct Pipeline {
    extractor: ContentExtractor,
    dom: DomNormalizer,
    stream: StreamNormalizer,
    engine: RuleEngine,
    probe: Box<dyn CapabilityProbe>,
}

impl Pipeline {
    pub fn new(extractor: ContentExtractor, engine: RuleEngine) -> Self {
        Self { extractor, dom: DomNormalizer, stream: StreamNormalizer, engine, probe: Box::new(AmbientProbe) }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn extractor(&self) -> &ContentExtractor {
        &self.extractor
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// The normalizer usable in `context`.
    pub fn normalizer(&self, context: ExecutionContext) -> &dyn HtmlNormalizer {
        match context {
            ExecutionContext::DomAvailable => &self.dom,
            ExecutionContext::DomUnavailable => &self.stream,
        }
    }

    /// Converts the main content of `snapshot` to Markdown.
    ///
    /// The execution context is probed on every call.
    ///
    /// # Errors
    ///
    /// Returns [`PagemarkError::StageUnavailable`] when the page has no content
    /// at all.
    pub fn run(&self, snapshot: &PageSnapshot) -> Result<ConversionResult> {
        let context = self.probe.probe();
        let document = Document::parse_with_url(snapshot.raw_html(), snapshot.url());

        let extraction = self.extractor.extract_root(&document);
        if extraction.is_empty() {
            return Err(PagemarkError::StageUnavailable(format!("{} has no content", snapshot.url())));
        }

        if context == ExecutionContext::DomUnavailable {
            tracing::debug!("document access unavailable, using stream normalizer");
        }
        let normalizer = self.normalizer(context);
        let normalized = normalizer.normalize(Fragment::Node(extraction.element.node()));
        let result = self.engine.convert_with_url(&normalized, document.base_url());

        let root = match &extraction.source {
            RootSource::Selector(selector) => selector.as_str(),
            _ => "body",
        };
        tracing::debug!(
            root,
            strategy = ?normalizer.strategy(),
            warnings = result.warnings.len(),
            "converted page"
        );
        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ContentExtractor::default(), RuleEngine::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("extractor", &self.extractor).field("engine", &self.engine).finish()
    }
}

/// Builder for Pipeline.
pub struct PipelineBuilder {
    extractor: ContentExtractor,
    engine: RuleEngine,
    probe: Box<dyn CapabilityProbe>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self { extractor: ContentExtractor::default(), engine: RuleEngine::default(), probe: Box::new(AmbientProbe) }
    }

    pub fn extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn engine(mut self, engine: RuleEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            extractor: self.extractor,
            dom: DomNormalizer,
            stream: StreamNormalizer,
            engine: self.engine,
            probe: self.probe,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
