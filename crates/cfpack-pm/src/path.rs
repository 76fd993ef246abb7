//! Local module references
//!
//! Normalizes filesystem paths given on the command line into the canonical
//! `./relative/path` names stored in the build list, and classifies them.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while naming a local module
#[derive(Debug, Error)]
pub enum PathError {
    /// Path does not exist
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but cannot be added as a module
    #[error("Not a .cf or .json file, or a directory: {0}")]
    UnsupportedModule(String),

    /// Path traversal outside project root
    #[error("Path is outside of the project directory: {0}")]
    PathTraversal(String),
}

/// What a local module reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    /// A directory copied into the build tree
    Directory,

    /// A `.cf` policy file copied into the autorun services directory
    PolicyFile,

    /// A `.json` file merged as augments
    AugmentsFile,
}

impl LocalKind {
    /// Classify a canonical local name by its suffix
    pub fn from_name(name: &str) -> Option<Self> {
        if !name.starts_with("./") {
            return None;
        }
        if name.ends_with('/') {
            Some(LocalKind::Directory)
        } else if name.ends_with(".cf") {
            Some(LocalKind::PolicyFile)
        } else if name.ends_with(".json") {
            Some(LocalKind::AugmentsFile)
        } else {
            None
        }
    }
}

/// Whether `name` has the shape of a canonical local reference
pub fn is_local_reference(name: &str) -> bool {
    LocalKind::from_name(name).is_some()
}

/// Filesystem location of a local reference, relative to the project root
pub fn local_path(root: &Path, name: &str) -> PathBuf {
    let relative = name.trim_start_matches("./");
    if relative.is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

/// Convert a user-supplied path into its canonical local module name
///
/// The result starts with `./`, uses forward slashes, contains no `.` or `..`
/// components, and ends with `/` for directories. Only directories and `.cf` or
/// `.json` files are accepted.
pub fn local_module_name(root: &Path, path: &str) -> Result<String, PathError> {
    let given = Path::new(path);
    let relative = if given.is_absolute() {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let absolute = given
            .canonicalize()
            .map_err(|_| PathError::PathNotFound(given.to_path_buf()))?;
        absolute
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| PathError::PathTraversal(path.to_string()))?
    } else {
        given.to_path_buf()
    };

    let normalized =
        normalize(&relative).ok_or_else(|| PathError::PathTraversal(path.to_string()))?;
    let parts: Vec<String> = normalized
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Err(PathError::UnsupportedModule(path.to_string()));
    }

    let full = root.join(&normalized);
    if !full.exists() {
        return Err(PathError::PathNotFound(full));
    }

    let mut name = format!("./{}", parts.join("/"));
    if full.is_dir() {
        name.push('/');
        return Ok(name);
    }

    if name.ends_with(".cf") || name.ends_with(".json") {
        Ok(name)
    } else {
        Err(PathError::UnsupportedModule(path.to_string()))
    }
}

/// Remove `.` components and resolve `..` lexically
///
/// Returns `None` when the path climbs above its starting point.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                components.pop()?;
            }
            Component::CurDir => {}
            Component::Normal(part) => components.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(components.iter().collect())
}
