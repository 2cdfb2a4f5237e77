//! Stage B: run the conversion directly against the page in a fresh task.

use std::sync::Arc;

use async_trait::async_trait;

use super::CaptureStage;
use super::restricted::is_restricted_url;
use crate::error::{PagemarkError, Result};
use crate::pipeline::Pipeline;
use crate::protocol::CaptureRequest;
use crate::rules::ConversionResult;
use crate::snapshot::PageSnapshot;

/// A page that conversion logic can be run against.
#[async_trait]
pub trait PageTarget: Send + Sync {
    fn url(&self) -> &str;

    /// Whether the page permits running injected logic.
    fn allows_injection(&self) -> bool {
        !is_restricted_url(self.url())
    }

    /// Current state of the page.
    async fn snapshot(&self) -> Result<PageSnapshot>;
}

/// A page whose state is already known.
#[derive(Debug, Clone)]
pub struct StaticPage {
    snapshot: PageSnapshot,
}

impl StaticPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl PageTarget for StaticPage {
    fn url(&self) -> &str {
        self.snapshot.url()
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Runs the pipeline on a blocking worker outside any page scope, so the
/// stream normalizer is used.
pub struct InjectionStage {
    target: Arc<dyn PageTarget>,
    pipeline: Arc<Pipeline>,
}

impl InjectionStage {
    pub fn new(target: Arc<dyn PageTarget>, pipeline: Arc<Pipeline>) -> Self {
        Self { target, pipeline }
    }
}

#[async_trait]
impl CaptureStage for InjectionStage {
    fn name(&self) -> &str {
        "injection"
    }

    async fn attempt(&self, request: &CaptureRequest) -> Result<ConversionResult> {
        if request.page_url.trim() != self.target.url() {
            return Err(PagemarkError::StageUnavailable(format!("no injectable page for {}", request.page_url)));
        }
        if !self.target.allows_injection() {
            return Err(PagemarkError::InjectionDisallowed(request.page_url.clone()));
        }

        let snapshot = self.target.snapshot().await?;
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || pipeline.run(&snapshot))
            .await
            .map_err(|err| PagemarkError::InjectionFailed(err.to_string()))?
    }
}
