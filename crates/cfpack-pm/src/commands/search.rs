//! Search command
//!
//! Lists catalog modules matching a term.

use crate::index::{IndexError, IndexSource, ModuleIndex};
use crate::manifest::{ManifestDocument, ManifestError, MANIFEST_FILE};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when searching the catalog
#[derive(Debug, Error)]
pub enum SearchError {
    /// Manifest error
    #[error("Manifest error: {0}")]
    ManifestError(#[from] ManifestError),

    /// Catalog error
    #[error(transparent)]
    IndexError(#[from] IndexError),
}

/// A catalog entry matching a search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Module {
        name: String,
        description: Option<String>,
    },
    Alias {
        name: String,
        target: String,
    },
}

/// Search the catalog used by the project in `dir`
///
/// Without a project the `index` locator, or the default catalog, is searched.
/// An empty `term` lists everything.
pub fn search_modules(
    dir: &Path,
    term: Option<&str>,
    index: Option<&str>,
) -> Result<Vec<SearchResult>, SearchError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let index = if manifest_path.exists() {
        let mut manifest = ManifestDocument::from_file(&manifest_path)?;
        if let Some(locator) = index {
            manifest = manifest.with_index(IndexSource::Locator(locator.to_string()));
        }
        manifest.ensure_index()?.clone()
    } else {
        let source = index
            .map(|locator| IndexSource::Locator(locator.to_string()))
            .unwrap_or_default();
        source.load(dir)?
    };

    Ok(matching(&index, term.unwrap_or("")))
}

/// Entries whose name or description contains `term`, ignoring case
pub fn matching(index: &ModuleIndex, term: &str) -> Vec<SearchResult> {
    let term = term.to_lowercase();
    let matches = |text: &str| text.to_lowercase().contains(&term);

    index
        .entries()
        .filter_map(|(name, entry)| match &entry.alias {
            Some(target) => (matches(name) || matches(target)).then(|| SearchResult::Alias {
                name: name.to_string(),
                target: target.clone(),
            }),
            None => {
                let described = entry.description.as_deref().map(matches).unwrap_or(false);
                (matches(name) || described).then(|| SearchResult::Module {
                    name: name.to_string(),
                    description: entry.description.clone(),
                })
            }
        })
        .collect()
}
