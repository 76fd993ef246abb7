//! Archive sources
//!
//! Downloads an archive, verifies it, and unpacks it under the downloads
//! directory keyed by its SHA-256 checksum.

use super::fetch::{compute_checksum, is_http_url, verify_checksum, FetchError, UrlFetcher};
use super::FetchedSource;
use crate::manifest::MANIFEST_FILE;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Archive extensions accepted as remote sources
pub const SUPPORTED_ARCHIVES: &[&str] = &[".zip", ".tar.gz", ".tgz", ".tar"];

/// Check if URL names a supported archive
pub fn is_archive_url(url: &str) -> bool {
    SUPPORTED_ARCHIVES.iter().any(|ext| url.ends_with(ext))
}

/// Download, verify and extract an archive, then locate its manifest
///
/// `url` may also be a path to an archive on disk. When `checksum` is given and
/// that archive was already extracted, the cached copy is used as is.
pub fn fetch_archive(
    fetcher: &UrlFetcher,
    downloads: &Path,
    url: &str,
    checksum: Option<&str>,
) -> Result<FetchedSource, FetchError> {
    if let Some(expected) = checksum {
        let cached = downloads.join("archives").join(expected.to_ascii_lowercase());
        if let Ok(manifest_path) = find_manifest(&cached, url) {
            tracing::debug!(url, path = %cached.display(), "using cached archive");
            return Ok(FetchedSource {
                manifest_path,
                version: expected.to_ascii_lowercase(),
            });
        }
    }

    let (content, actual) = if is_http_url(url) {
        let result = fetcher.fetch(url)?;
        (result.content, result.checksum)
    } else {
        // Archives on disk are accepted too
        let content = fs::read(url)?;
        let actual = compute_checksum(&content);
        (content, actual)
    };
    if let Some(expected) = checksum {
        verify_checksum(expected, &actual)?;
    }

    let dest = downloads.join("archives").join(&actual);
    if dest.exists() {
        fs::remove_dir_all(&dest)?;
    }
    fs::create_dir_all(&dest)?;
    extract_archive(&content, &dest, url)?;
    tracing::info!(url, checksum = %actual, "extracted archive");

    Ok(FetchedSource {
        manifest_path: find_manifest(&dest, url)?,
        version: actual,
    })
}

/// Extract archive bytes into `dest`, choosing the format from the URL
pub fn extract_archive(content: &[u8], dest: &Path, url: &str) -> Result<(), FetchError> {
    if url.ends_with(".tar.gz") || url.ends_with(".tgz") {
        let decoder = flate2::read::GzDecoder::new(Cursor::new(content));
        unpack_tar(tar::Archive::new(decoder), dest)
    } else if url.ends_with(".tar") {
        unpack_tar(tar::Archive::new(Cursor::new(content)), dest)
    } else if url.ends_with(".zip") {
        unpack_zip(content, dest)
    } else {
        Err(FetchError::ExtractionError(format!(
            "Unknown archive format: {}",
            url
        )))
    }
}

fn unpack_tar<R: std::io::Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<(), FetchError> {
    let entries = archive.entries().map_err(|e| {
        FetchError::ExtractionError(format!("Failed to read tar entries: {}", e))
    })?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| FetchError::ExtractionError(format!("Failed to read entry: {}", e)))?;
        // unpack_in refuses entries that would land outside of dest
        entry.unpack_in(dest).map_err(|e| {
            FetchError::ExtractionError(format!("Failed to extract entry: {}", e))
        })?;
    }

    Ok(())
}

fn unpack_zip(content: &[u8], dest: &Path) -> Result<(), FetchError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))
        .map_err(|e| FetchError::ExtractionError(format!("Failed to read zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| FetchError::ExtractionError(format!("Failed to read entry: {}", e)))?;
        let relative = file.enclosed_name().ok_or_else(|| {
            FetchError::ExtractionError(format!("Invalid entry path: {}", file.name()))
        })?;
        let dest_path = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&dest_path)?;
            std::io::copy(&mut file, &mut out)?;
        }
    }

    Ok(())
}

/// Find the manifest at the root of an extracted tree, or inside its single
/// top-level directory
pub fn find_manifest(dir: &Path, url: &str) -> Result<PathBuf, FetchError> {
    let direct = dir.join(MANIFEST_FILE);
    if direct.is_file() {
        return Ok(direct);
    }

    let mut subdirs = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                subdirs.push(entry.path());
            }
        }
    }

    if let [only] = subdirs.as_slice() {
        let nested = only.join(MANIFEST_FILE);
        if nested.is_file() {
            return Ok(nested);
        }
    }

    Err(FetchError::MissingManifest(url.to_string()))
}
