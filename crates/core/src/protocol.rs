//! Request and response shapes exchanged with the triggering collaborator.
//!
//! Both serialize to camelCase JSON:
//!
//! ```json
//! {"pageUrl": "https://example.com/post", "pageTitle": "Post", "requestSource": "toolbar"}
//! {"ok": true, "markdown": "# Post\n\n...", "warnings": []}
//! {"ok": false, "errorKind": "TotalFailure", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::rules::ConversionResult;

fn default_source() -> String {
    "unknown".to_string()
}

/// One capture invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub page_url: String,

    #[serde(default)]
    pub page_title: String,

    #[serde(default = "default_source")]
    pub request_source: String,

    /// Correlates agent replies and log spans; fresh for every request.
    #[serde(skip, default = "Uuid::new_v4")]
    pub request_id: Uuid,
}

impl CaptureRequest {
    pub fn new(page_url: impl Into<String>, page_title: impl Into<String>, request_source: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            page_title: page_title.into(),
            request_source: request_source.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Reply to a [`CaptureRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

impl CaptureResponse {
    pub fn success(result: &ConversionResult) -> Self {
        Self {
            ok: true,
            markdown: Some(result.markdown.clone()),
            warnings: Some(result.warnings.clone()),
            error_kind: None,
            message: None,
            page_title: None,
            page_url: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            markdown: None,
            warnings: None,
            error_kind: Some(kind),
            message: Some(message.into()),
            page_title: None,
            page_url: None,
        }
    }

    /// Attaches whatever page identity is known to a failure.
    pub fn with_page(mut self, title: Option<String>, url: Option<String>) -> Self {
        self.page_title = title;
        self.page_url = url;
        self
    }
}
