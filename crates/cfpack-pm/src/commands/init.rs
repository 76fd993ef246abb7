//! Project initialization command
//!
//! Creates a new policy set with an empty cfpack.json.

use crate::manifest::{ManifestDocument, MANIFEST_FILE};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during project initialization
#[derive(Debug, Error)]
pub enum InitError {
    /// Project already exists
    #[error("Project already exists: {} found in {0}", MANIFEST_FILE)]
    AlreadyExists(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Manifest error
    #[error("Manifest error: {0}")]
    ManifestError(#[from] crate::manifest::ManifestError),
}

/// Initialize a new project
///
/// Creates a cfpack.json file in the specified directory.
pub fn init_project(dir: &Path, name: Option<&str>) -> Result<(), InitError> {
    let manifest_path = dir.join(MANIFEST_FILE);

    if manifest_path.exists() {
        return Err(InitError::AlreadyExists(dir.display().to_string()));
    }

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(name) => name.to_string(),
        None => default_name(dir),
    };

    let mut data = Map::new();
    data.insert("name".to_string(), Value::from(project_name.as_str()));
    data.insert("type".to_string(), Value::from("policy-set"));
    data.insert(
        "description".to_string(),
        Value::from("Policy set built with cfpack"),
    );
    data.insert("build".to_string(), Value::Array(Vec::new()));

    fs::create_dir_all(dir)?;
    ManifestDocument::from_data(&manifest_path, data)?.save()?;
    tracing::debug!(path = %manifest_path.display(), "created manifest");

    println!("Created new project: {}", project_name);
    println!("  - {}", MANIFEST_FILE);

    Ok(())
}

fn default_name(dir: &Path) -> String {
    let dir = dir.canonicalize().unwrap_or_else(|_| PathBuf::from(dir));
    dir.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("my-project")
        .to_string()
}
