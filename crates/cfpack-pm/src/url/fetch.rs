//! HTTP fetching for remote indexes and archives
//!
//! Handles downloading content from HTTP/HTTPS URLs.

use reqwest::blocking::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching remote sources
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("Invalid JSON in {location}: {error}")]
    JsonError {
        location: String,
        error: serde_json::Error,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Content too large
    #[error("Content too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: u64, max: u64 },

    /// Archive extraction error
    #[error("Failed to extract archive: {0}")]
    ExtractionError(String),

    /// Git command failed
    #[error("git {command} failed: {stderr}")]
    GitError { command: String, stderr: String },

    /// Fetched source has no manifest
    #[error("'{0}' doesn't contain a valid cfpack.json manifest")]
    MissingManifest(String),
}

/// Maximum size of a downloaded document or archive (50 MB)
pub const MAX_CONTENT_SIZE: u64 = 50 * 1024 * 1024;

/// HTTP client configuration
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of fetching a URL
#[derive(Debug)]
pub struct FetchResult {
    /// Content bytes
    pub content: Vec<u8>,
    /// SHA-256 checksum (hex-encoded)
    pub checksum: String,
    /// Final URL (after redirects)
    pub final_url: String,
}

/// Blocking HTTP fetcher with a size limit
pub struct UrlFetcher {
    client: Client,
    max_size: u64,
}

impl UrlFetcher {
    /// Create a new URL fetcher
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("cfpack/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_size: MAX_CONTENT_SIZE,
        })
    }

    /// Fetch content from a URL
    pub fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        if !is_http_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        tracing::debug!(url, "downloading");
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_size {
                return Err(FetchError::ContentTooLarge {
                    size: len,
                    max: self.max_size,
                });
            }
        }

        let final_url = response.url().to_string();

        // Read with a limit, servers may omit or lie about content length
        let mut content = Vec::new();
        let mut reader = response.take(self.max_size + 1);
        reader.read_to_end(&mut content)?;

        if content.len() as u64 > self.max_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len() as u64,
                max: self.max_size,
            });
        }

        let checksum = compute_checksum(&content);

        Ok(FetchResult {
            content,
            checksum,
            final_url,
        })
    }
}

/// Compare a user-supplied checksum against a computed one
pub fn verify_checksum(expected: &str, actual: &str) -> Result<(), FetchError> {
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(FetchError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Compute SHA-256 checksum of bytes
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn is_http_url(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Download a JSON document, or read it from disk
///
/// Relative paths are resolved against `base_dir`.
pub fn fetch_or_read_json(locator: &str, base_dir: &Path) -> Result<Value, FetchError> {
    let bytes = if is_http_url(locator) {
        UrlFetcher::new()?.fetch(locator)?.content
    } else {
        let path = Path::new(locator);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        tracing::debug!(path = %path.display(), "reading JSON document");
        std::fs::read(&path)?
    };

    serde_json::from_slice(&bytes).map_err(|error| FetchError::JsonError {
        location: locator.to_string(),
        error,
    })
}
