//! Remote module sources
//!
//! Handles fetching manifests that publish modules, either from archives or
//! from git repositories.
//!
//! ## Supported sources
//!
//! - `https://example.com/modules-1.0.tar.gz` - archives (`.zip`, `.tar.gz`, `.tgz`, `.tar`)
//! - `https://github.com/org/modules` - git repositories (`https://`, `git://`, `ssh://`)
//! - `https://github.com/org/modules@<commit>` - git repository pinned to a commit
//!
//! ## Download structure
//!
//! ```text
//! ~/.cfpack/downloads/
//! ├── archives/<sha256>/       # Extracted archives, keyed by content checksum
//! └── <host>/<path>/<commit>/  # Git checkouts
//! ```

pub mod archive;
pub mod fetch;
pub mod git;

pub use archive::{fetch_archive, is_archive_url, SUPPORTED_ARCHIVES};
pub use fetch::{
    compute_checksum, fetch_or_read_json, FetchError, FetchResult, UrlFetcher, MAX_CONTENT_SIZE,
    REQUEST_TIMEOUT,
};
pub use git::clone_repo;

use std::path::PathBuf;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CFPACK_DIR";

/// URL schemes that denote a git repository source
pub const REPOSITORY_SCHEMES: &[&str] = &["https://", "git://", "ssh://"];

/// A fetched remote manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    /// Local path of the fetched manifest
    pub manifest_path: PathBuf,
    /// Commit id for repositories, SHA-256 for archives
    pub version: String,
}

/// Whether a module reference names a remote source rather than a module
pub fn is_remote_source(reference: &str) -> bool {
    is_archive_url(reference)
        || REPOSITORY_SCHEMES
            .iter()
            .any(|scheme| reference.starts_with(scheme))
}

/// Directory holding downloads and other cached data
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .map(|h| h.join(".cfpack"))
        .unwrap_or_else(|| PathBuf::from(".cfpack"))
}

/// Retrieves remote manifests for bulk adds
pub trait SourceFetcher {
    /// Download, verify and extract an archive
    fn fetch_archive(&self, url: &str, checksum: Option<&str>) -> Result<FetchedSource, FetchError>;

    /// Clone a git repository
    fn clone_repo(&self, url: &str) -> Result<FetchedSource, FetchError>;
}

/// Fetcher backed by HTTP downloads and the `git` executable
pub struct RemoteFetcher {
    fetcher: UrlFetcher,
    downloads: PathBuf,
}

impl RemoteFetcher {
    /// Create a fetcher storing downloads in the default data directory
    pub fn new() -> Result<Self, FetchError> {
        Self::with_data_dir(data_dir())
    }

    /// Create a fetcher storing downloads under `dir`
    pub fn with_data_dir(dir: PathBuf) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: UrlFetcher::new()?,
            downloads: dir.join("downloads"),
        })
    }
}

impl SourceFetcher for RemoteFetcher {
    fn fetch_archive(&self, url: &str, checksum: Option<&str>) -> Result<FetchedSource, FetchError> {
        archive::fetch_archive(&self.fetcher, &self.downloads, url, checksum)
    }

    fn clone_repo(&self, url: &str) -> Result<FetchedSource, FetchError> {
        git::clone_repo(&self.downloads, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote_source() {
        assert!(is_remote_source("https://github.com/org/modules"));
        assert!(is_remote_source("git://example.com/modules.git"));
        assert!(is_remote_source("ssh://git@example.com/modules.git"));
        assert!(is_remote_source("./vendor/modules.tar.gz"));
        assert!(!is_remote_source("masterfiles"));
        assert!(!is_remote_source("./policy.cf"));
        assert!(!is_remote_source("http://example.com/modules"));
    }
}
