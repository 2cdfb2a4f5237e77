//! Error types for pagemark operations.
//!
//! [`PagemarkError`] covers everything that can go wrong while loading a page,
//! running a capture stage, or converting markup. Most of these are recovered
//! inside the capture chain; [`ErrorKind`] is the classification that crosses
//! the boundary in a capture response.
//!
//! # Example
//!
//! ```rust
//! use pagemark_core::{ErrorKind, PagemarkError};
//!
//! let err = PagemarkError::StageUnavailable("no agent attached".into());
//! assert_eq!(err.kind(), ErrorKind::ExtractionUnavailable);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for capture and conversion operations.
#[derive(Error, Debug)]
pub enum PagemarkError {
    /// HTTP request errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// HTTP request exceeded the configured timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Markup or selector could not be parsed.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Reading a page from disk or stdin failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A cross-context message could not be delivered or answered.
    #[error("Page communication failed: {0}")]
    Communication(String),

    /// The stage cannot produce content for this page.
    #[error("Extraction unavailable: {0}")]
    StageUnavailable(String),

    /// A capture stage did not finish within its budget.
    #[error("Stage '{stage}' timed out after {}ms", timeout.as_millis())]
    StageTimeout { stage: String, timeout: Duration },

    /// The injected task could not run to completion.
    #[error("Injection failed: {0}")]
    InjectionFailed(String),

    /// The page does not allow script injection (internal or store pages).
    #[error("Injection disallowed for {0}")]
    InjectionDisallowed(String),
}

impl PagemarkError {
    /// Classifies this error for a capture response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PagemarkError::Timeout { .. } | PagemarkError::StageTimeout { .. } => ErrorKind::Timeout,
            PagemarkError::Communication(_) => ErrorKind::CommunicationFailure,
            PagemarkError::InjectionDisallowed(_) => ErrorKind::InjectionDisallowed,
            PagemarkError::StageUnavailable(_) | PagemarkError::InjectionFailed(_) => ErrorKind::ExtractionUnavailable,
            PagemarkError::HtmlParseError(_) => ErrorKind::NormalizationDegraded,
            _ => ErrorKind::TotalFailure,
        }
    }
}

/// Failure classification reported in the `errorKind` field of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No main-content selector matched; the body was used instead.
    ExtractionUnavailable,
    /// Document manipulation was unavailable; the string strategy was used.
    NormalizationDegraded,
    /// A conversion rule failed on a node and its default output was used.
    RuleFailure,
    /// The in-page collaborator could not be reached.
    CommunicationFailure,
    /// A stage exceeded its timeout.
    Timeout,
    /// Script injection is not permitted on the page.
    InjectionDisallowed,
    /// No stage, including the minimal capture, produced a document.
    TotalFailure,
}

/// Result type alias for PagemarkError.
pub type Result<T> = std::result::Result<T, PagemarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PagemarkError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_stage_timeout_display() {
        let err = PagemarkError::StageTimeout { stage: "messaging".into(), timeout: Duration::from_millis(1500) };
        assert_eq!(err.to_string(), "Stage 'messaging' timed out after 1500ms");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(PagemarkError::Communication("closed".into()).kind(), ErrorKind::CommunicationFailure);
        assert_eq!(
            PagemarkError::InjectionDisallowed("chrome://settings".into()).kind(),
            ErrorKind::InjectionDisallowed
        );
        assert_eq!(PagemarkError::ConfigError("bad".into()).kind(), ErrorKind::TotalFailure);
    }

    #[test]
    fn test_error_kind_serializes_as_name() {
        let json = serde_json::to_string(&ErrorKind::TotalFailure).unwrap();
        assert_eq!(json, "\"TotalFailure\"");
    }
}
