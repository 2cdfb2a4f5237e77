//! The in-page agent and the messaging stage that talks to it.
//!
//! A [`PageAgent`] is a task bound to one page. It owns the page snapshot and
//! answers conversion requests that arrive over a channel, running each
//! conversion inside a page scope so the document strategy applies. The
//! chain only ever holds a [`PageLink`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::CaptureStage;
use crate::error::{PagemarkError, Result};
use crate::pipeline::Pipeline;
use crate::probe::within_page;
use crate::protocol::CaptureRequest;
use crate::rules::ConversionResult;
use crate::snapshot::PageSnapshot;

const AGENT_QUEUE: usize = 8;

/// A conversion request addressed to a page agent.
#[derive(Debug)]
pub struct AgentMessage {
    pub request_id: Uuid,
    pub page_url: String,
    pub reply: oneshot::Sender<Result<ConversionResult>>,
}

/// Sending half of a page agent's channel.
#[derive(Debug, Clone)]
pub struct PageLink {
    sender: mpsc::Sender<AgentMessage>,
}

impl PageLink {
    /// Wraps an existing channel, for agents implemented elsewhere.
    pub fn new(sender: mpsc::Sender<AgentMessage>) -> Self {
        Self { sender }
    }

    /// Asks the agent to convert its page and waits for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`PagemarkError::Communication`] when the agent is gone or drops
    /// the request, and whatever error the agent itself replies with.
    pub async fn request(&self, request: &CaptureRequest) -> Result<ConversionResult> {
        let (reply, response) = oneshot::channel();
        let message = AgentMessage { request_id: request.request_id, page_url: request.page_url.clone(), reply };

        self.sender
            .send(message)
            .await
            .map_err(|_| PagemarkError::Communication("page agent is not listening".to_string()))?;

        response.await.map_err(|_| PagemarkError::Communication("page agent dropped the request".to_string()))?
    }
}

/// Task that answers conversion requests for one page.
pub struct PageAgent {
    snapshot: Arc<PageSnapshot>,
    pipeline: Arc<Pipeline>,
    receiver: mpsc::Receiver<AgentMessage>,
}

impl PageAgent {
    /// Starts an agent for `snapshot` on the current runtime.
    ///
    /// The agent stops once every [`PageLink`] to it is dropped.
    pub fn spawn(snapshot: PageSnapshot, pipeline: Arc<Pipeline>) -> (PageLink, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(AGENT_QUEUE);
        let agent = PageAgent { snapshot: Arc::new(snapshot), pipeline, receiver };
        let handle = tokio::spawn(agent.run());
        (PageLink::new(sender), handle)
    }

    async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            let outcome = answer(Arc::clone(&self.snapshot), Arc::clone(&self.pipeline), &message.page_url).await;
            if message.reply.send(outcome).is_err() {
                tracing::debug!(request_id = %message.request_id, "late reply discarded");
            }
        }
        tracing::debug!(url = self.snapshot.url(), "page agent stopped");
    }
}

async fn answer(snapshot: Arc<PageSnapshot>, pipeline: Arc<Pipeline>, page_url: &str) -> Result<ConversionResult> {
    if page_url.trim() != snapshot.url() {
        return Err(PagemarkError::StageUnavailable(format!("agent is attached to {}", snapshot.url())));
    }

    tokio::task::spawn_blocking(move || within_page(|| pipeline.run(&snapshot)))
        .await
        .map_err(|err| PagemarkError::Communication(format!("page agent task failed: {err}")))?
}

/// Stage A: asks an already-running page agent for the conversion.
#[derive(Debug, Clone)]
pub struct MessagingStage {
    link: PageLink,
}

impl MessagingStage {
    pub fn new(link: PageLink) -> Self {
        Self { link }
    }
}

#[async_trait]
impl CaptureStage for MessagingStage {
    fn name(&self) -> &str {
        "messaging"
    }

    async fn attempt(&self, request: &CaptureRequest) -> Result<ConversionResult> {
        self.link.request(request).await
    }
}
