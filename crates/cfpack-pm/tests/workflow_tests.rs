//! End-to-end tests for the init, add, status and search workflow

use cfpack_pm::commands::{
    add_modules, init_project, project_status, search_modules, BuildEntry, SearchResult,
};
use cfpack_pm::{AddOptions, AddedBy, Confirm, FetchError, FetchedSource, SourceFetcher};
use std::fs;
use tempfile::TempDir;

struct Offline;

impl SourceFetcher for Offline {
    fn fetch_archive(&self, url: &str, _: Option<&str>) -> Result<FetchedSource, FetchError> {
        Err(FetchError::InvalidUrl(url.to_string()))
    }

    fn clone_repo(&self, url: &str) -> Result<FetchedSource, FetchError> {
        Err(FetchError::InvalidUrl(url.to_string()))
    }
}

struct No;

impl Confirm for No {
    fn confirm(&self, _: &str) -> bool {
        false
    }
}

const INDEX: &str = r#"{
  "index": {
    "autorun": { "description": "Enable autorun functionality", "steps": ["json def.json def.json"] },
    "delete-files": {
      "description": "Allows you to specify a list of files you want deleted on hosts",
      "dependencies": ["autorun"],
      "steps": ["copy delete-files.cf services/autorun/"]
    }
  }
}"#;

#[test]
fn test_init_add_status() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("index.json"), INDEX).unwrap();

    init_project(root, Some("site-policy")).unwrap();
    add_modules(
        root,
        &["delete-files".to_string()],
        &AddOptions::default(),
        Some("index.json"),
        &Offline,
        &No,
    )
    .unwrap();

    let status = project_status(root).unwrap();
    assert_eq!(status.name.as_deref(), Some("site-policy"));
    assert_eq!(
        status.build,
        vec![
            BuildEntry {
                name: "autorun".to_string(),
                added_by: Some(AddedBy::Module("delete-files".to_string())),
            },
            BuildEntry {
                name: "delete-files".to_string(),
                added_by: Some(AddedBy::User),
            },
        ]
    );

    let saved = fs::read_to_string(root.join("cfpack.json")).unwrap();
    assert_eq!(
        saved,
        r#"{
  "name": "site-policy",
  "type": "policy-set",
  "description": "Policy set built with cfpack",
  "build": [
    {
      "name": "autorun",
      "description": "Enable autorun functionality",
      "steps": ["json def.json def.json"],
      "added_by": "delete-files"
    },
    {
      "name": "delete-files",
      "description": "Allows you to specify a list of files you want deleted on hosts",
      "dependencies": ["autorun"],
      "steps": ["copy delete-files.cf services/autorun/"],
      "added_by": "cfpack add"
    }
  ]
}
"#
    );
}

#[test]
fn test_search_without_project() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("index.json"), INDEX).unwrap();

    let results = search_modules(temp.path(), Some("delete"), Some("index.json")).unwrap();
    assert_eq!(
        results,
        vec![SearchResult::Module {
            name: "delete-files".to_string(),
            description: Some(
                "Allows you to specify a list of files you want deleted on hosts".to_string()
            ),
        }]
    );
}
