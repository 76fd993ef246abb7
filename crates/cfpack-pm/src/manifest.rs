//! Build manifest (cfpack.json)
//!
//! A [`ManifestDocument`] keeps every top-level key of the file in its original
//! order. The `build` list is held as typed [`Module`]s and written back in
//! place when the document is saved.

use crate::index::{IndexError, IndexSource, ModuleIndex};
use crate::module::{body_keys, AddedBy, Module};
use crate::pretty;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name
pub const MANIFEST_FILE: &str = "cfpack.json";

/// Errors that can occur when working with manifests
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read or write manifest file
    #[error("Failed to access manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse JSON
    #[error("Failed to parse manifest {path}: {error}")]
    ParseError {
        path: String,
        error: serde_json::Error,
    },

    /// Top-level value is not an object
    #[error("Manifest must be a JSON object: {0}")]
    NotAnObject(String),

    /// A `build` entry does not have the expected shape
    #[error("Invalid build list in manifest: {0}")]
    InvalidBuild(serde_json::Error),

    /// A provided module definition does not have the expected shape
    #[error("Invalid definition of provided module '{name}': {error}")]
    InvalidDefinition {
        name: String,
        error: serde_json::Error,
    },

    /// Missing required key
    #[error("missing required key '{key}' in module definition: {definition}")]
    MissingKey {
        key: &'static str,
        definition: String,
    },

    /// Catalog error
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Failed to serialize
    #[error("Failed to serialize manifest: {0}")]
    SerializeError(serde_json::Error),
}

/// Shape of an entry in a manifest's `provides` section
#[derive(Debug, Deserialize)]
struct ProvidedDefinition {
    description: Option<String>,
    steps: Option<Vec<String>>,
    #[serde(default)]
    subdirectory: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// In-memory manifest
#[derive(Debug)]
pub struct ManifestDocument {
    path: PathBuf,
    data: Map<String, Value>,
    build: Vec<Module>,
    index_source: IndexSource,
    index: Option<ModuleIndex>,
    url: Option<String>,
    commit: Option<String>,
}

impl ManifestDocument {
    /// Load a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|error| ManifestError::ParseError {
                path: path.display().to_string(),
                error,
            })?;

        match value {
            Value::Object(data) => Self::from_data(path, data),
            _ => Err(ManifestError::NotAnObject(path.display().to_string())),
        }
    }

    /// Build a manifest from already-loaded data
    ///
    /// The catalog comes from the data's `index` key when present, otherwise from
    /// [`crate::index::DEFAULT_INDEX`]. Use [`ManifestDocument::with_index`] to
    /// override both.
    pub fn from_data(path: &Path, data: Map<String, Value>) -> Result<Self, ManifestError> {
        let build = match data.get("build") {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(ManifestError::InvalidBuild)?
            }
            None => Vec::new(),
        };

        let index_source = data
            .get("index")
            .and_then(IndexSource::from_value)
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            data,
            build,
            index_source,
            index: None,
            url: None,
            commit: None,
        })
    }

    /// Use an explicit catalog instead of the one the manifest names
    pub fn with_index(mut self, source: IndexSource) -> Self {
        self.index_source = source;
        self.index = None;
        self
    }

    /// Use a catalog that is already loaded
    pub fn with_loaded_index(mut self, index: ModuleIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Mark the document as fetched from `url` at `commit`
    pub fn with_origin(mut self, url: impl Into<String>, commit: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.commit = Some(commit.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest
    pub fn root(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Read a top-level key
    ///
    /// `build` is not served from here since it is kept typed, see
    /// [`ManifestDocument::build`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == "build" {
            return None;
        }
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        key == "build" || self.data.contains_key(key)
    }

    /// Project name, if the manifest has one
    pub fn name(&self) -> Option<&str> {
        self.data.get("name").and_then(Value::as_str)
    }

    pub fn index_source(&self) -> &IndexSource {
        &self.index_source
    }

    pub fn build(&self) -> &[Module] {
        &self.build
    }

    /// Load the catalog on first use
    pub fn ensure_index(&mut self) -> Result<&ModuleIndex, IndexError> {
        let (index, _) = self.resolution_parts()?;
        Ok(index)
    }

    /// Borrow the loaded catalog and the build list together
    pub fn resolution_parts(&mut self) -> Result<(&ModuleIndex, &mut Vec<Module>), IndexError> {
        let index = match self.index.take() {
            Some(index) => index,
            None => self.index_source.load(&self.root())?,
        };
        let index: &ModuleIndex = self.index.insert(index);
        Ok((index, &mut self.build))
    }

    /// Modules published by this manifest, in declaration order
    ///
    /// Each is stamped with the document's origin `url` and `commit`.
    pub fn get_provides(&self) -> Result<Vec<Module>, ManifestError> {
        let provides = self
            .data
            .get("provides")
            .and_then(Value::as_object)
            .ok_or_else(|| ManifestError::MissingKey {
                key: "provides",
                definition: pretty::to_string(&Value::Object(self.data.clone())),
            })?;

        provides
            .iter()
            .map(|(name, definition)| self.construct_provided_module(name, definition))
            .collect()
    }

    fn construct_provided_module(
        &self,
        name: &str,
        definition: &Value,
    ) -> Result<Module, ManifestError> {
        let parsed: ProvidedDefinition =
            serde_json::from_value(definition.clone()).map_err(|error| {
                ManifestError::InvalidDefinition {
                    name: name.to_string(),
                    error,
                }
            })?;

        let description = parsed.description.ok_or_else(|| ManifestError::MissingKey {
            key: "description",
            definition: pretty::to_string(definition),
        })?;
        let steps = parsed.steps.ok_or_else(|| ManifestError::MissingKey {
            key: "steps",
            definition: pretty::to_string(definition),
        })?;

        let mut module = Module::new(name, steps);
        if let Value::Object(object) = definition {
            module.key_order = body_keys(object);
        }
        module.description = Some(description);
        module.url = self.url.clone();
        module.commit = self.commit.clone();
        module.subdirectory = parsed.subdirectory.filter(|s| !s.is_empty());
        module.dependencies = parsed.dependencies;
        module.extra = parsed.extra;
        Ok(module.added_by(AddedBy::User))
    }

    /// Find a module in this manifest's `provides`, then in its catalog
    pub fn get_module_for_build(&mut self, name: &str) -> Result<Option<Module>, ManifestError> {
        if let Some(definition) = self
            .data
            .get("provides")
            .and_then(Value::as_object)
            .and_then(|provides| provides.get(name))
        {
            let definition = definition.clone();
            return self.construct_provided_module(name, &definition).map(Some);
        }

        let index = self.ensure_index()?;
        if index.contains(name) {
            return Ok(Some(index.resolve_object(name)?));
        }
        Ok(None)
    }

    /// Render the document as it would be saved
    pub fn to_json_string(&self) -> Result<String, ManifestError> {
        let mut data = self.data.clone();
        let build = serde_json::to_value(&self.build).map_err(ManifestError::SerializeError)?;
        // Replacing an existing key keeps its position
        data.insert("build".to_string(), build);
        Ok(pretty::to_string(&Value::Object(data)) + "\n")
    }

    /// Write the document back to its path
    ///
    /// The content goes to a temporary file next to the manifest first and is
    /// then renamed over it, so readers never see a partial file.
    pub fn save(&self) -> Result<(), ManifestError> {
        let content = self.to_json_string()?;

        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        let mut tmp_file = fs::File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
