//! Add command
//!
//! Adds modules to the build list of cfpack.json and saves it.

use crate::index::IndexSource;
use crate::manifest::{ManifestDocument, ManifestError, MANIFEST_FILE};
use crate::resolver::{AddOptions, AddReport, Confirm, ModuleResolver, ResolveError};
use crate::url::SourceFetcher;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when adding modules
#[derive(Debug, Error)]
pub enum AddError {
    /// No cfpack.json found
    #[error("No {} found. Run `cfpack init` to create a project.", MANIFEST_FILE)]
    NoManifest,

    /// Manifest error
    #[error("Manifest error: {0}")]
    ManifestError(#[from] ManifestError),

    /// Resolution error
    #[error(transparent)]
    ResolveError(#[from] ResolveError),
}

/// Add modules to the project in `dir`
///
/// `index` replaces the catalog named by the manifest. The manifest is written
/// back only when every reference was added and the build list changed.
pub fn add_modules(
    dir: &Path,
    references: &[String],
    options: &AddOptions,
    index: Option<&str>,
    fetcher: &dyn SourceFetcher,
    confirm: &dyn Confirm,
) -> Result<AddReport, AddError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(AddError::NoManifest);
    }

    let mut manifest = ManifestDocument::from_file(&manifest_path)?;
    if let Some(locator) = index {
        manifest = manifest.with_index(IndexSource::Locator(locator.to_string()));
    }

    let before = manifest.build().to_vec();
    let report = {
        let mut resolver = ModuleResolver::new(&mut manifest, fetcher, confirm)?;
        resolver.add(references, options)?
    };

    if manifest.build() == before.as_slice() {
        tracing::debug!(path = %manifest_path.display(), "build unchanged, not saving");
        return Ok(report);
    }

    manifest.save()?;
    tracing::debug!(path = %manifest_path.display(), added = report.added().len(), "saved manifest");

    Ok(report)
}
