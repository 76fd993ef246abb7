//! Git repository sources
//!
//! Clones are kept under `<downloads>/<host>/<path>/<commit>/` so that a second
//! add of the same commit reuses the checkout.

use super::fetch::FetchError;
use super::FetchedSource;
use crate::manifest::MANIFEST_FILE;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Split an optional `@<commit>` pin off a repository URL
pub fn split_commit(url: &str) -> (&str, Option<&str>) {
    if let Some(at) = url.rfind('@') {
        let candidate = &url[at + 1..];
        if is_commit_hash(candidate) {
            return (&url[..at], Some(candidate));
        }
    }
    (url, None)
}

fn is_commit_hash(s: &str) -> bool {
    (7..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Cache location of a repository, relative to the downloads directory
pub fn repo_cache_path(repo_url: &str) -> Result<PathBuf, FetchError> {
    let parsed =
        ::url::Url::parse(repo_url).map_err(|_| FetchError::InvalidUrl(repo_url.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl(repo_url.to_string()))?;

    let mut path = PathBuf::from(host);
    for segment in parsed.path().split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." {
            return Err(FetchError::InvalidUrl(repo_url.to_string()));
        }
        path.push(segment.strip_suffix(".git").unwrap_or(segment));
    }
    Ok(path)
}

fn run_git(args: &[&str], dir: Option<&Path>) -> Result<String, FetchError> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    tracing::debug!(?args, "running git");
    let output = command.output()?;
    if !output.status.success() {
        return Err(FetchError::GitError {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Clone a repository (or reuse a cached checkout) and locate its manifest
pub fn clone_repo(downloads: &Path, url: &str) -> Result<FetchedSource, FetchError> {
    let (repo_url, pinned) = split_commit(url);
    let repo_dir = downloads.join(repo_cache_path(repo_url)?);
    fs::create_dir_all(&repo_dir)?;

    let (checkout, commit) = match pinned {
        Some(commit) => {
            let checkout = repo_dir.join(commit);
            if checkout.join(MANIFEST_FILE).is_file() {
                tracing::debug!(url = repo_url, commit, "using cached checkout");
            } else {
                if checkout.exists() {
                    fs::remove_dir_all(&checkout)?;
                }
                let target = checkout.to_string_lossy().into_owned();
                run_git(&["clone", "--no-checkout", repo_url, target.as_str()], None)?;
                run_git(&["checkout", commit], Some(&checkout))?;
            }
            (checkout, commit.to_string())
        }
        None => {
            let staging = repo_dir.join("HEAD");
            if staging.exists() {
                fs::remove_dir_all(&staging)?;
            }
            let target = staging.to_string_lossy().into_owned();
            run_git(&["clone", repo_url, target.as_str()], None)?;
            let commit = run_git(&["rev-parse", "HEAD"], Some(&staging))?
                .trim()
                .to_string();

            let checkout = repo_dir.join(&commit);
            if checkout.exists() {
                fs::remove_dir_all(&staging)?;
            } else {
                fs::rename(&staging, &checkout)?;
            }
            (checkout, commit)
        }
    };

    tracing::info!(url = repo_url, commit = %commit, "cloned repository");

    let manifest_path = checkout.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(FetchError::MissingManifest(repo_url.to_string()));
    }

    Ok(FetchedSource {
        manifest_path,
        version: commit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_commit() {
        assert_eq!(
            split_commit("https://github.com/org/modules@0123abcd"),
            ("https://github.com/org/modules", Some("0123abcd"))
        );
        assert_eq!(
            split_commit("ssh://git@github.com/org/modules.git"),
            ("ssh://git@github.com/org/modules.git", None)
        );
        // Branch names are not commits
        assert_eq!(
            split_commit("https://github.com/org/modules@main"),
            ("https://github.com/org/modules@main", None)
        );
    }

    #[test]
    fn test_repo_cache_path() {
        assert_eq!(
            repo_cache_path("https://github.com/org/modules.git").unwrap(),
            PathBuf::from("github.com").join("org").join("modules")
        );
        assert_eq!(
            repo_cache_path("ssh://git@gitlab.example.com/team/policy").unwrap(),
            PathBuf::from("gitlab.example.com").join("team").join("policy")
        );
        assert!(repo_cache_path("not a url").is_err());
    }
}
