//! Capture with graceful degradation.
//!
//! [`ExtractionFallbackChain`] tries up to three strategies in order, each
//! under its own timeout:
//!
//! 1. **messaging**: ask a page agent that is already running in the page.
//! 2. **injection**: run the conversion against the page in a fresh task.
//! 3. **minimal**: a document holding only the page title and URL.
//!
//! The first stage that yields a non-blank document ends the chain. Timing
//! out counts the same as failing. Browser-internal and extension store
//! pages skip straight to the minimal document.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pagemark_core::{CaptureRequest, ExtractionFallbackChain, FallbackOutcome, InjectionStage, PageSnapshot};
//! use pagemark_core::{Pipeline, StaticPage};
//!
//! # let runtime = tokio::runtime::Runtime::new().unwrap();
//! # runtime.block_on(async {
//! let url = "https://example.com/post";
//! let page = StaticPage::new(PageSnapshot::from_html(url, "<article><p>Hello</p></article>"));
//! let chain = ExtractionFallbackChain::builder()
//!     .injection(InjectionStage::new(Arc::new(page), Arc::new(Pipeline::default())))
//!     .build();
//!
//! let outcome = chain.capture(&CaptureRequest::new(url, "Post", "docs")).await;
//! assert!(matches!(outcome, FallbackOutcome::Success(ref r) if r.markdown == "Hello"));
//! # });
//! ```

mod injection;
mod messaging;
mod restricted;

pub use injection::{InjectionStage, PageTarget, StaticPage};
pub use messaging::{AgentMessage, MessagingStage, PageAgent, PageLink};
pub use restricted::is_restricted_url;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{ErrorKind, PagemarkError, Result};
use crate::protocol::{CaptureRequest, CaptureResponse};
use crate::rules::ConversionResult;

/// Default per-stage timeout in seconds.
pub const DEFAULT_STAGE_TIMEOUT: u64 = 10;

/// One way of obtaining a converted page.
#[async_trait]
pub trait CaptureStage: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self, request: &CaptureRequest) -> Result<ConversionResult>;
}

/// Configuration for the fallback chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Budget for each of the messaging and injection stages.
    pub stage_timeout: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT) }
    }
}

/// A capture that could not produce any document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Result of one capture invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// A stage converted the page.
    Success(ConversionResult),
    /// Only the minimal document could be produced; `reason` says why.
    Degraded { result: ConversionResult, reason: String },
    Failed(CaptureFailure),
}

impl FallbackOutcome {
    /// The document produced, if any.
    pub fn result(&self) -> Option<&ConversionResult> {
        match self {
            FallbackOutcome::Success(result) | FallbackOutcome::Degraded { result, .. } => Some(result),
            FallbackOutcome::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FallbackOutcome::Success(_))
    }

    pub fn to_response(&self) -> CaptureResponse {
        match self {
            FallbackOutcome::Success(result) | FallbackOutcome::Degraded { result, .. } => {
                CaptureResponse::success(result)
            }
            FallbackOutcome::Failed(failure) => CaptureResponse::failure(failure.kind, failure.message.clone())
                .with_page(failure.title.clone(), failure.url.clone()),
        }
    }
}

/// Runs capture stages in order until one produces a document.
pub struct ExtractionFallbackChain {
    messaging: Option<Box<dyn CaptureStage>>,
    injection: Option<Box<dyn CaptureStage>>,
    config: ChainConfig,
}

impl ExtractionFallbackChain {
    pub fn builder() -> ExtractionFallbackChainBuilder {
        ExtractionFallbackChainBuilder::new()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Captures the page named by `request`.
    ///
    /// Yields exactly one outcome. Stage errors are recorded as warnings on
    /// the degraded result; only a request without a page URL fails outright.
    #[tracing::instrument(
        name = "capture",
        skip_all,
        fields(request_id = %request.request_id, source = %request.request_source, url = %request.page_url)
    )]
    pub async fn capture(&self, request: &CaptureRequest) -> FallbackOutcome {
        let url = request.page_url.trim();
        if url.is_empty() {
            let title = Some(request.page_title.trim().to_string()).filter(|t| !t.is_empty());
            warn!("request carries no page URL");
            return FallbackOutcome::Failed(CaptureFailure {
                kind: ErrorKind::TotalFailure,
                message: "no page URL to capture".to_string(),
                title,
                url: None,
            });
        }

        if is_restricted_url(url) {
            info!("restricted page, skipping extraction stages");
            let reason = PagemarkError::InjectionDisallowed(url.to_string()).to_string();
            return minimal(request, vec![reason]);
        }

        let mut reasons = Vec::new();
        for (slot, stage) in [("messaging", &self.messaging), ("injection", &self.injection)] {
            let Some(stage) = stage else {
                reasons.push(format!("{slot} stage not configured"));
                continue;
            };

            match self.run_stage(stage.as_ref(), request).await {
                Ok(result) => {
                    info!(stage = stage.name(), warnings = result.warnings.len(), "capture succeeded");
                    return FallbackOutcome::Success(result);
                }
                Err(err) => {
                    warn!(stage = stage.name(), kind = ?err.kind(), %err, "capture stage failed");
                    reasons.push(format!("{}: {}", stage.name(), err));
                }
            }
        }

        info!("falling back to minimal document");
        minimal(request, reasons)
    }

    async fn run_stage(&self, stage: &dyn CaptureStage, request: &CaptureRequest) -> Result<ConversionResult> {
        let timeout = self.config.stage_timeout;
        match tokio::time::timeout(timeout, stage.attempt(request)).await {
            Ok(Ok(result)) if result.markdown.trim().is_empty() => {
                Err(PagemarkError::StageUnavailable("stage produced an empty document".to_string()))
            }
            Ok(result) => result,
            Err(_) => Err(PagemarkError::StageTimeout { stage: stage.name().to_string(), timeout }),
        }
    }
}

impl std::fmt::Debug for ExtractionFallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionFallbackChain")
            .field("messaging", &self.messaging.as_ref().map(|s| s.name().to_string()))
            .field("injection", &self.injection.as_ref().map(|s| s.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

fn minimal(request: &CaptureRequest, reasons: Vec<String>) -> FallbackOutcome {
    let markdown = minimal_document(&request.page_title, request.page_url.trim());
    let reason = reasons.join("; ");
    FallbackOutcome::Degraded { result: ConversionResult { markdown, warnings: reasons }, reason }
}

/// A document holding only the page title (or URL) and a link to the page.
pub fn minimal_document(title: &str, url: &str) -> String {
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let heading = if title.is_empty() { url } else { title.as_str() };
    format!("# {heading}\n\n<{url}>")
}

/// Builder for ExtractionFallbackChain.
pub struct ExtractionFallbackChainBuilder {
    messaging: Option<Box<dyn CaptureStage>>,
    injection: Option<Box<dyn CaptureStage>>,
    config: ChainConfig,
}

impl ExtractionFallbackChainBuilder {
    pub fn new() -> Self {
        Self { messaging: None, injection: None, config: ChainConfig::default() }
    }

    /// Stage tried first.
    pub fn messaging(mut self, stage: impl CaptureStage + 'static) -> Self {
        self.messaging = Some(Box::new(stage));
        self
    }

    /// Stage tried when the first one fails.
    pub fn injection(mut self, stage: impl CaptureStage + 'static) -> Self {
        self.injection = Some(Box::new(stage));
        self
    }

    pub fn config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stage_timeout(mut self, timeout: Duration) -> Self {
        self.config.stage_timeout = timeout;
        self
    }

    pub fn build(self) -> ExtractionFallbackChain {
        ExtractionFallbackChain { messaging: self.messaging, injection: self.injection, config: self.config }
    }
}

impl Default for ExtractionFallbackChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}
