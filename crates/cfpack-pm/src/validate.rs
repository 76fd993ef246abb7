//! Add-time advisory checks
//!
//! Autorun detection is substring matching, not a policy parse. A file can be
//! reported as untagged when its tag is assembled indirectly, and accepted when
//! the words only appear in a comment. Results are warnings, never errors.

use crate::module::Module;
use crate::path::{local_path, LocalKind};
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

/// Suggested snippet shown with every autorun warning
pub const AUTORUN_HINT: &str = r#"  meta: "tags" slist => { "autorun" };"#;

/// A non-fatal problem found with a freshly added module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutorunWarning {
    /// A local policy file with no autorun tag
    UntaggedPolicyFile(String),

    /// A local directory whose policy files carry no autorun tag
    UntaggedDirectory(String),
}

impl fmt::Display for AutorunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutorunWarning::UntaggedPolicyFile(name) => {
                writeln!(f, "No autorun tag found in policy file: '{}'", name)?;
                writeln!(f, "Tag the bundle(s) you want evaluated:")?;
                write!(f, "{}", AUTORUN_HINT)
            }
            AutorunWarning::UntaggedDirectory(name) => {
                writeln!(f, "No bundles tagged with autorun found in: '{}'", name)?;
                writeln!(f, "Tag the bundle(s) you want evaluated in .cf policy files:")?;
                write!(f, "{}", AUTORUN_HINT)
            }
        }
    }
}

/// Whether policy text looks like it tags a bundle with autorun
pub fn has_autorun_tag(content: &str) -> bool {
    ["meta:", "tags", "slist", "autorun"]
        .iter()
        .all(|needle| content.contains(needle))
}

fn file_has_autorun_tag(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(content) => has_autorun_tag(&content),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not read policy file");
            false
        }
    }
}

/// Inspect a module that was just appended to the build
///
/// Only local policy files and local directories are checked.
pub fn check_added_module(root: &Path, module: &Module) -> Option<AutorunWarning> {
    match LocalKind::from_name(&module.name)? {
        LocalKind::PolicyFile => {
            let path = local_path(root, &module.name);
            if file_has_autorun_tag(&path) {
                None
            } else {
                Some(AutorunWarning::UntaggedPolicyFile(module.name.clone()))
            }
        }
        LocalKind::Directory => {
            let dir = local_path(root, &module.name);
            let policy_files: Vec<_> = WalkDir::new(&dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path().is_file()
                        && e.path()
                            .extension()
                            .map(|ext| ext == "cf")
                            .unwrap_or(false)
                })
                .collect();

            if !policy_files.is_empty()
                && !policy_files.iter().any(|e| file_has_autorun_tag(e.path()))
            {
                Some(AutorunWarning::UntaggedDirectory(module.name.clone()))
            } else {
                None
            }
        }
        LocalKind::AugmentsFile => None,
    }
}
