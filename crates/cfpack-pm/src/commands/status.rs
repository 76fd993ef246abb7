//! Status command
//!
//! Summarizes the build list of cfpack.json.

use crate::manifest::{ManifestDocument, ManifestError, MANIFEST_FILE};
use crate::module::AddedBy;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when reading project status
#[derive(Debug, Error)]
pub enum StatusError {
    /// No cfpack.json found
    #[error("No {} found. Run `cfpack init` to create a project.", MANIFEST_FILE)]
    NoManifest,

    /// Manifest error
    #[error("Manifest error: {0}")]
    ManifestError(#[from] ManifestError),
}

/// One build entry as shown by `status`
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEntry {
    pub name: String,
    pub added_by: Option<AddedBy>,
}

/// Project summary
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStatus {
    pub name: Option<String>,
    pub build: Vec<BuildEntry>,
}

/// Read the build list of the project in `dir`
pub fn project_status(dir: &Path) -> Result<ProjectStatus, StatusError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(StatusError::NoManifest);
    }

    let manifest = ManifestDocument::from_file(&manifest_path)?;
    Ok(ProjectStatus {
        name: manifest.name().map(str::to_string),
        build: manifest
            .build()
            .iter()
            .map(|m| BuildEntry {
                name: m.name.clone(),
                added_by: m.added_by.clone(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_project_status() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join(MANIFEST_FILE),
            r#"{
  "name": "example",
  "build": [
    { "name": "lib", "steps": [], "added_by": "app" },
    { "name": "app", "steps": [], "added_by": "cfpack add" },
    { "name": "legacy", "steps": [] }
  ]
}"#,
        )
        .unwrap();

        let status = project_status(temp_dir.path()).unwrap();
        assert_eq!(status.name.as_deref(), Some("example"));
        assert_eq!(
            status.build,
            vec![
                BuildEntry {
                    name: "lib".to_string(),
                    added_by: Some(AddedBy::Module("app".to_string())),
                },
                BuildEntry {
                    name: "app".to_string(),
                    added_by: Some(AddedBy::User),
                },
                BuildEntry {
                    name: "legacy".to_string(),
                    added_by: None,
                },
            ]
        );
    }

    #[test]
    fn test_status_without_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            project_status(temp_dir.path()),
            Err(StatusError::NoManifest)
        ));
    }
}
