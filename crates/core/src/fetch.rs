//! Page loading from URLs, files, and stdin.
//!
//! The capture chain operates on an already-loaded [`PageSnapshot`](crate::PageSnapshot);
//! these helpers produce the raw HTML for one.

use std::fs;
use std::path::PathBuf;

#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::Client;
#[cfg(feature = "fetch")]
use url::Url;

use crate::{PagemarkError, Result};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; Pagemark/0.3)".to_string() }
    }
}

/// Fetches HTML content from an http(s) URL.
///
/// Follows redirects and maps client-side timeouts to [`PagemarkError::Timeout`].
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| PagemarkError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(PagemarkError::InvalidUrl(format!(
            "unsupported scheme '{}', expected http or https",
            parsed_url.scheme()
        )));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(PagemarkError::HttpError)?;

    tracing::debug!(url = %parsed_url, "fetching page");

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() { PagemarkError::Timeout { timeout: config.timeout } } else { PagemarkError::HttpError(e) }
        })?;

    let content = response.error_for_status()?.text().await?;

    Ok(content)
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(PagemarkError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(PagemarkError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(PagemarkError::from)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("Pagemark"));
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let result = fetch_url("not-a-url", &FetchConfig::default()).await;
        assert!(matches!(result, Err(PagemarkError::InvalidUrl(_))));
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_fetch_url_rejects_non_http_scheme() {
        let result = fetch_url("ftp://example.com/page.html", &FetchConfig::default()).await;
        assert!(matches!(result, Err(PagemarkError::InvalidUrl(msg)) if msg.contains("ftp")));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(PagemarkError::FileNotFound(_))));
    }

    #[test]
    fn test_fetch_file_reads_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p>saved page</p>").unwrap();

        let html = fetch_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(html, "<p>saved page</p>");
    }

    #[test]
    fn test_fetch_file_read_failure_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = fetch_file(dir.path().to_str().unwrap()).unwrap_err();

        assert!(matches!(err, PagemarkError::IoError(_)));
        assert!(err.to_string().starts_with("I/O error: "));
    }
}
