//! Module objects and catalog entries
//!
//! A [`Module`] is one entry of a manifest's `build` list. An [`IndexEntry`] is the
//! catalog's description of a module before it is given a name and attribution.

use crate::path::LocalKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Attribution value meaning "explicitly requested by the user"
pub const USER_MARKER: &str = "cfpack add";

/// Catalog module every local policy file depends on
pub const AUTORUN_MODULE: &str = "autorun";

/// Who caused a module to be added to the build
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddedBy {
    /// Named explicitly in a request
    User,

    /// Pulled in as a dependency of the named module
    Module(String),
}

impl AddedBy {
    /// Parse a stored attribution string
    pub fn from_marker(marker: &str) -> Self {
        if marker == USER_MARKER {
            AddedBy::User
        } else {
            AddedBy::Module(marker.to_string())
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, AddedBy::User)
    }

    pub fn as_str(&self) -> &str {
        match self {
            AddedBy::User => USER_MARKER,
            AddedBy::Module(name) => name,
        }
    }
}

impl fmt::Display for AddedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AddedBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AddedBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let marker = String::deserialize(deserializer)?;
        Ok(AddedBy::from_marker(&marker))
    }
}

/// One entry of the build list
///
/// Keys are written in the order they were read, with `name` first and
/// `added_by` last. Keys the module was never read with follow in field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Module {
    /// Catalog name, or a `./` local reference
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub repo: Option<String>,
    pub by: Option<String>,
    pub version: Option<String>,

    /// Origin of a module provided by a remote manifest
    pub url: Option<String>,

    /// Resolved commit or archive checksum of the origin
    pub commit: Option<String>,

    /// Path within the remote source tree
    pub subdirectory: Option<String>,

    /// Modules that must be in the build before this one
    pub dependencies: Vec<String>,

    /// Build instructions, opaque to the resolver
    pub steps: Vec<String>,

    pub added_by: Option<AddedBy>,

    /// Keys not modelled above, kept as read
    pub extra: Map<String, Value>,

    /// Order of the keys between `name` and `added_by`
    pub key_order: Vec<String>,
}

/// Typed view of a build entry used while parsing
#[derive(Deserialize)]
struct ModuleFields {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    commit: Option<String>,
    #[serde(default)]
    subdirectory: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    added_by: Option<AddedBy>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Keys of an object other than `name` and `added_by`, in document order
pub(crate) fn body_keys(object: &Map<String, Value>) -> Vec<String> {
    object
        .keys()
        .filter(|key| *key != "name" && *key != "added_by")
        .cloned()
        .collect()
}

impl TryFrom<Map<String, Value>> for Module {
    type Error = serde_json::Error;

    fn try_from(object: Map<String, Value>) -> Result<Self, Self::Error> {
        let key_order = body_keys(&object);
        let fields: ModuleFields = serde_json::from_value(Value::Object(object))?;
        Ok(Module {
            name: fields.name,
            description: fields.description,
            tags: fields.tags,
            repo: fields.repo,
            by: fields.by,
            version: fields.version,
            url: fields.url,
            commit: fields.commit,
            subdirectory: fields.subdirectory,
            dependencies: fields.dependencies,
            steps: fields.steps,
            added_by: fields.added_by,
            extra: fields.extra,
            key_order,
        })
    }
}

fn push_optional(body: &mut Vec<(String, Value)>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        body.push((key.to_string(), Value::from(value)));
    }
}

impl From<Module> for Map<String, Value> {
    fn from(module: Module) -> Self {
        let mut body: Vec<(String, Value)> = Vec::new();
        push_optional(&mut body, "description", module.description);
        if !module.tags.is_empty() {
            body.push(("tags".to_string(), Value::from(module.tags)));
        }
        push_optional(&mut body, "repo", module.repo);
        push_optional(&mut body, "by", module.by);
        push_optional(&mut body, "version", module.version);
        push_optional(&mut body, "url", module.url);
        push_optional(&mut body, "commit", module.commit);
        push_optional(&mut body, "subdirectory", module.subdirectory);
        if !module.dependencies.is_empty() {
            body.push(("dependencies".to_string(), Value::from(module.dependencies)));
        }
        body.push(("steps".to_string(), Value::from(module.steps)));
        body.extend(module.extra);

        let mut object = Map::new();
        object.insert("name".to_string(), Value::from(module.name));
        for key in &module.key_order {
            if let Some(position) = body.iter().position(|(k, _)| k == key) {
                let (key, value) = body.remove(position);
                object.insert(key, value);
            }
        }
        for (key, value) in body {
            object.insert(key, value);
        }
        if let Some(added_by) = module.added_by {
            object.insert("added_by".to_string(), Value::from(added_by.as_str()));
        }
        object
    }
}

impl Module {
    /// Create a module with only a name and steps
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: Vec::new(),
            repo: None,
            by: None,
            version: None,
            url: None,
            commit: None,
            subdirectory: None,
            dependencies: Vec::new(),
            steps,
            added_by: None,
            extra: Map::new(),
            key_order: Vec::new(),
        }
    }

    /// Synthesize the module for a canonical local reference
    ///
    /// `name` must already be in canonical form (see [`crate::path::local_module_name`]).
    pub fn local(name: &str, kind: LocalKind) -> Self {
        let (description, steps, dependencies) = match kind {
            LocalKind::Directory => {
                let relative = name.trim_start_matches("./");
                (
                    "Local subdirectory added using cfpack command line",
                    vec![format!("directory {} services/cfpack/{}", name, relative)],
                    Vec::new(),
                )
            }
            LocalKind::PolicyFile => {
                let file_name = name.rsplit('/').next().unwrap_or(name);
                (
                    "Local policy file added using cfpack command line",
                    vec![format!("copy {} services/autorun/{}", name, file_name)],
                    vec![AUTORUN_MODULE.to_string()],
                )
            }
            LocalKind::AugmentsFile => (
                "Local augments file added using cfpack command line",
                vec![format!("json {} def.json", name)],
                Vec::new(),
            ),
        };

        let mut module = Module::new(name, steps);
        module.description = Some(description.to_string());
        module.tags = vec!["local".to_string()];
        module.dependencies = dependencies;
        module
    }

    pub fn is_local(&self) -> bool {
        self.tags.iter().any(|t| t == "local") || self.name.starts_with("./")
    }

    /// Return this module with its attribution set
    pub fn added_by(mut self, added_by: AddedBy) -> Self {
        self.added_by = Some(added_by);
        self
    }
}

/// A catalog entry, keyed by module name in the index document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,

    /// Name of the entry this one redirects to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Keys in catalog order, carried over to the build entry
    #[serde(skip)]
    pub key_order: Vec<String>,
}

impl IndexEntry {
    /// Parse a catalog entry, remembering its key order
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let mut entry: IndexEntry = serde_json::from_value(value.clone())?;
        if let Value::Object(object) = value {
            entry.key_order = body_keys(object);
        }
        Ok(entry)
    }

    /// Merge the entry with a name, producing an unattributed module
    pub fn to_module(&self, name: &str) -> Module {
        Module {
            name: name.to_string(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            repo: self.repo.clone(),
            by: self.by.clone(),
            version: self.version.clone(),
            url: None,
            commit: self.commit.clone(),
            subdirectory: self.subdirectory.clone(),
            dependencies: self.dependencies.clone(),
            steps: self.steps.clone(),
            added_by: None,
            extra: self.extra.clone(),
            key_order: self.key_order.clone(),
        }
    }
}
