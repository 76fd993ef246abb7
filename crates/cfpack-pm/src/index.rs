//! Module catalog
//!
//! An [`IndexSource`] says where the catalog lives and is cheap to hold. Calling
//! [`IndexSource::load`] fetches it once and yields an immutable [`ModuleIndex`].

use crate::module::{IndexEntry, Module};
use crate::path::{is_local_reference, local_path, LocalKind};
use crate::url::{fetch_or_read_json, FetchError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Catalog used when neither the command line nor the manifest names one
pub const DEFAULT_INDEX: &str =
    "https://raw.githubusercontent.com/cfengine/build-index/master/cfbs.json";

/// Errors that can occur while loading or querying the catalog
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index could not be downloaded or read
    #[error("Could not download or find module index '{locator}': {source}")]
    Unavailable {
        locator: String,
        #[source]
        source: FetchError,
    },

    /// The document has no `index` mapping
    #[error("Empty or invalid module index: {0}")]
    Invalid(String),

    /// An entry does not have the expected shape
    #[error("Invalid definition of module '{name}' in index: {error}")]
    InvalidEntry {
        name: String,
        error: serde_json::Error,
    },

    /// Name is neither a catalog key nor an existing local path
    #[error("Module '{0}' not found")]
    NotFound(String),

    /// Aliases are substituted before lookup and never materialized
    #[error("Module '{name}' is an alias for '{target}' and cannot be added directly")]
    UnresolvedAlias { name: String, target: String },
}

/// Where the catalog comes from
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSource {
    /// Mapping embedded in a manifest
    Inline(Map<String, Value>),

    /// URL or filesystem path of an index document
    Locator(String),
}

impl Default for IndexSource {
    fn default() -> Self {
        IndexSource::Locator(DEFAULT_INDEX.to_string())
    }
}

impl IndexSource {
    /// Interpret the value of a manifest's `index` key
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(IndexSource::Inline(map.clone())),
            Value::String(locator) => Some(IndexSource::Locator(locator.clone())),
            _ => None,
        }
    }

    /// Fetch the catalog
    ///
    /// `root` is the project directory: relative locators and local module
    /// references are resolved against it.
    pub fn load(&self, root: &Path) -> Result<ModuleIndex, IndexError> {
        match self {
            IndexSource::Inline(entries) => ModuleIndex::from_entries(root, entries),
            IndexSource::Locator(locator) => {
                tracing::debug!(locator = %locator, "loading module index");
                let document =
                    fetch_or_read_json(locator, root).map_err(|source| IndexError::Unavailable {
                        locator: locator.clone(),
                        source,
                    })?;
                let entries = document
                    .get("index")
                    .and_then(Value::as_object)
                    .ok_or_else(|| IndexError::Invalid(locator.clone()))?;
                ModuleIndex::from_entries(root, entries)
            }
        }
    }
}

/// A loaded, read-only catalog
#[derive(Debug, Clone)]
pub struct ModuleIndex {
    root: PathBuf,
    order: Vec<String>,
    entries: HashMap<String, IndexEntry>,
}

impl ModuleIndex {
    /// Build an index from the `index` mapping of a document
    pub fn from_entries(root: &Path, entries: &Map<String, Value>) -> Result<Self, IndexError> {
        let mut order = Vec::with_capacity(entries.len());
        let mut parsed = HashMap::with_capacity(entries.len());

        for (name, value) in entries {
            let entry = IndexEntry::from_value(value).map_err(|error| {
                IndexError::InvalidEntry {
                    name: name.clone(),
                    error,
                }
            })?;
            order.push(name.clone());
            parsed.insert(name.clone(), entry);
        }

        Ok(Self {
            root: root.to_path_buf(),
            order,
            entries: parsed,
        })
    }

    /// Whether `name` is a catalog key
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Catalog lookup, without alias resolution
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name)
    }

    /// Whether `name` is a catalog key or an existing path in the project
    pub fn exists(&self, name: &str) -> bool {
        self.contains(name) || self.root.join(name).exists()
    }

    /// Iterate the catalog in document order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.order
            .iter()
            .filter_map(move |name| self.entries.get(name).map(|e| (name.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Project directory local references are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Produce the unattributed module object for a name
    ///
    /// Local references are synthesized from the filesystem; catalog names are
    /// the catalog entry merged with the name.
    pub fn resolve_object(&self, name: &str) -> Result<Module, IndexError> {
        if is_local_reference(name) {
            let path = local_path(&self.root, name);
            let kind = if path.is_dir() {
                LocalKind::Directory
            } else if path.is_file() {
                LocalKind::from_name(name).ok_or_else(|| IndexError::NotFound(name.to_string()))?
            } else {
                return Err(IndexError::NotFound(name.to_string()));
            };
            return Ok(Module::local(name, kind));
        }

        let entry = self
            .get(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;
        if let Some(target) = &entry.alias {
            return Err(IndexError::UnresolvedAlias {
                name: name.to_string(),
                target: target.clone(),
            });
        }
        Ok(entry.to_module(name))
    }
}
