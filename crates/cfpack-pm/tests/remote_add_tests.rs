//! Integration tests for adding modules provided by remote sources

use cfpack_pm::commands::{add_modules, AddError};
use cfpack_pm::{
    AddEvent, AddOptions, AddReport, AddedBy, Confirm, FetchError, FetchedSource,
    ManifestDocument, ManifestError, RemoteFetcher, ResolveError, SourceFetcher, MANIFEST_FILE,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const REPO_URL: &str = "https://github.com/example/modules";
const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";

/// Serves a manifest already on disk and records what was requested
struct StubFetcher {
    manifest_path: PathBuf,
    requests: RefCell<Vec<(String, Option<String>)>>,
}

impl StubFetcher {
    fn new(manifest_path: PathBuf) -> Self {
        Self {
            manifest_path,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl SourceFetcher for StubFetcher {
    fn fetch_archive(&self, url: &str, checksum: Option<&str>) -> Result<FetchedSource, FetchError> {
        self.requests
            .borrow_mut()
            .push((url.to_string(), checksum.map(str::to_string)));
        Ok(FetchedSource {
            manifest_path: self.manifest_path.clone(),
            version: "f".repeat(64),
        })
    }

    fn clone_repo(&self, url: &str) -> Result<FetchedSource, FetchError> {
        self.requests.borrow_mut().push((url.to_string(), None));
        Ok(FetchedSource {
            manifest_path: self.manifest_path.clone(),
            version: COMMIT.to_string(),
        })
    }
}

struct Answer {
    yes: bool,
    questions: RefCell<Vec<String>>,
}

impl Answer {
    fn new(yes: bool) -> Self {
        Self {
            yes,
            questions: RefCell::new(Vec::new()),
        }
    }
}

impl Confirm for Answer {
    fn confirm(&self, question: &str) -> bool {
        self.questions.borrow_mut().push(question.to_string());
        self.yes
    }
}

const REMOTE: &str = r#"{
  "name": "example-modules",
  "provides": {
    "m1": {
      "description": "First module",
      "subdirectory": "m1",
      "steps": ["copy m1.cf services/m1.cf"]
    },
    "m2": {
      "description": "Second module",
      "subdirectory": "m2",
      "steps": ["copy m2.cf services/m2.cf"]
    },
    "m3": {
      "description": "Depends on a sibling and on the catalog",
      "dependencies": ["m1", "lib"],
      "steps": ["copy m3.cf services/m3.cf"]
    }
  }
}"#;

struct Fixture {
    _temp: TempDir,
    project: PathBuf,
    remote_manifest: PathBuf,
}

fn fixture(remote: &str) -> Fixture {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    let remote_dir = temp.path().join("remote");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(&remote_dir).unwrap();

    fs::write(
        project.join(MANIFEST_FILE),
        r#"{
  "name": "project",
  "index": {
    "lib": { "description": "Library", "steps": ["copy lib.cf lib/"] },
    "library": { "alias": "lib" }
  },
  "build": []
}"#,
    )
    .unwrap();
    let remote_manifest = remote_dir.join(MANIFEST_FILE);
    fs::write(&remote_manifest, remote).unwrap();

    Fixture {
        _temp: temp,
        project,
        remote_manifest,
    }
}

fn run(
    project: &Path,
    references: &[&str],
    options: &AddOptions,
    fetcher: &dyn SourceFetcher,
    confirm: &dyn Confirm,
) -> Result<AddReport, AddError> {
    let references: Vec<String> = references.iter().map(|s| s.to_string()).collect();
    add_modules(project, &references, options, None, fetcher, confirm)
}

fn load(project: &Path) -> ManifestDocument {
    ManifestDocument::from_file(&project.join(MANIFEST_FILE)).unwrap()
}

fn build_names(project: &Path) -> Vec<String> {
    load(project).build().iter().map(|m| m.name.clone()).collect()
}

const TWO_MODULES: &str = r#"{
  "provides": {
    "m1": { "description": "First module", "steps": ["copy m1.cf services/m1.cf"] },
    "m2": { "description": "Second module", "steps": ["copy m2.cf services/m2.cf"] }
  }
}"#;

#[test]
fn test_bulk_add_after_confirmation() {
    let fx = fixture(TWO_MODULES);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());
    let confirm = Answer::new(true);

    let report = run(&fx.project, &[REPO_URL], &AddOptions::default(), &fetcher, &confirm).unwrap();

    assert_eq!(
        report.events[0],
        AddEvent::ModulesFound {
            url: REPO_URL.to_string(),
            names: vec!["m1".to_string(), "m2".to_string()],
        }
    );
    assert_eq!(
        confirm.questions.borrow().as_slice(),
        ["Do you want to add all 2 of them? [y/N] ".to_string()]
    );
    assert_eq!(build_names(&fx.project), vec!["m1", "m2"]);

    let manifest = load(&fx.project);
    for module in manifest.build() {
        assert_eq!(module.added_by, Some(AddedBy::User));
        assert_eq!(module.url.as_deref(), Some(REPO_URL));
        assert_eq!(module.commit.as_deref(), Some(COMMIT));
    }
    assert_eq!(
        fetcher.requests.borrow().as_slice(),
        [(REPO_URL.to_string(), None)]
    );
}

#[test]
fn test_bulk_add_declined() {
    let fx = fixture(TWO_MODULES);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());
    let before = fs::read_to_string(fx.project.join(MANIFEST_FILE)).unwrap();

    let result = run(
        &fx.project,
        &[REPO_URL],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(false),
    );

    assert!(matches!(
        result,
        Err(AddError::ResolveError(ResolveError::Declined))
    ));
    assert_eq!(fs::read_to_string(fx.project.join(MANIFEST_FILE)).unwrap(), before);
}

#[test]
fn test_bulk_add_non_interactive() {
    let fx = fixture(TWO_MODULES);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());
    let confirm = Answer::new(false);
    let options = AddOptions {
        non_interactive: true,
        ..AddOptions::default()
    };

    run(&fx.project, &[REPO_URL], &options, &fetcher, &confirm).unwrap();

    assert!(confirm.questions.borrow().is_empty());
    assert_eq!(build_names(&fx.project), vec!["m1", "m2"]);
}

#[test]
fn test_no_modules_available() {
    let fx = fixture(r#"{"provides": {}}"#);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());

    let result = run(
        &fx.project,
        &[REPO_URL],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(true),
    );

    assert!(matches!(
        result,
        Err(AddError::ResolveError(ResolveError::NoModulesAvailable(_)))
    ));
}

#[test]
fn test_missing_provides_section() {
    let fx = fixture(r#"{"name": "nothing-here"}"#);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());

    let result = run(
        &fx.project,
        &[REPO_URL],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(true),
    );

    assert!(matches!(
        result,
        Err(AddError::ResolveError(ResolveError::Manifest(
            ManifestError::MissingKey { key: "provides", .. }
        )))
    ));
}

#[test]
fn test_named_modules_must_be_provided() {
    let fx = fixture(REMOTE);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());

    let result = run(
        &fx.project,
        &[REPO_URL, "m1", "x", "y"],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(true),
    );

    match result {
        Err(AddError::ResolveError(ResolveError::MissingModules(names))) => {
            assert_eq!(names, vec!["x", "y"])
        }
        other => panic!("expected missing modules, got {:?}", other),
    }
    assert!(build_names(&fx.project).is_empty());
}

#[test]
fn test_named_module_with_dependencies() {
    let fx = fixture(REMOTE);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());
    let pinned = format!("{}@{}", REPO_URL, &COMMIT[..12]);

    let report = run(
        &fx.project,
        &[pinned.as_str(), "m3"],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(true),
    )
    .unwrap();

    assert_eq!(build_names(&fx.project), vec!["m1", "lib", "m3"]);
    assert_eq!(
        report.added(),
        vec!["m1", "lib", "m3"]
    );

    let manifest = load(&fx.project);
    let build = manifest.build();
    assert_eq!(build[0].added_by, Some(AddedBy::Module("m3".to_string())));
    assert_eq!(build[0].subdirectory.as_deref(), Some("m1"));
    assert_eq!(build[0].url.as_deref(), Some(REPO_URL));
    assert_eq!(build[1].added_by, Some(AddedBy::Module("m3".to_string())));
    assert!(build[1].url.is_none());
    assert_eq!(build[2].added_by, Some(AddedBy::User));
    assert_eq!(build[2].dependencies, vec!["m1", "lib"]);
}

#[test]
fn test_already_added_remote_module_is_skipped() {
    let fx = fixture(REMOTE);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());

    run(&fx.project, &[REPO_URL, "m1"], &AddOptions::default(), &fetcher, &Answer::new(true))
        .unwrap();
    let report = run(
        &fx.project,
        &[REPO_URL, "m1", "m3"],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(true),
    )
    .unwrap();

    assert_eq!(report.events[0], AddEvent::AlreadyAdded("m1".to_string()));
    assert_eq!(build_names(&fx.project), vec!["m1", "lib", "m3"]);
}

#[test]
fn test_dependency_alias_is_substituted() {
    let fx = fixture(
        r#"{
  "provides": {
    "m4": {
      "description": "Needs the library by its alias",
      "dependencies": ["library"],
      "steps": ["copy m4.cf services/m4.cf"]
    }
  }
}"#,
    );
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());

    let report = run(
        &fx.project,
        &[REPO_URL, "m4"],
        &AddOptions::default(),
        &fetcher,
        &Answer::new(true),
    )
    .unwrap();

    assert_eq!(build_names(&fx.project), vec!["lib", "m4"]);
    assert_eq!(
        report.events[0],
        AddEvent::AliasSubstituted {
            alias: "library".to_string(),
            target: "lib".to_string(),
        }
    );
    assert_eq!(
        load(&fx.project).build()[0].added_by,
        Some(AddedBy::Module("m4".to_string()))
    );
}

#[test]
fn test_archive_checksum_is_passed_to_fetcher() {
    let fx = fixture(TWO_MODULES);
    let fetcher = StubFetcher::new(fx.remote_manifest.clone());
    let url = "https://example.com/modules-1.0.tar.gz";
    let options = AddOptions {
        checksum: Some("ab".repeat(32)),
        ..AddOptions::default()
    };

    run(&fx.project, &[url, "m2"], &options, &fetcher, &Answer::new(true)).unwrap();

    assert_eq!(
        fetcher.requests.borrow().as_slice(),
        [(url.to_string(), Some("ab".repeat(32)))]
    );
    let manifest = load(&fx.project);
    assert_eq!(manifest.build()[0].commit.as_deref(), Some("f".repeat(64).as_str()));
}

#[test]
fn test_local_archive_end_to_end() {
    let fx = fixture(TWO_MODULES);
    let data_dir = fx.project.join("data");

    // Archive with a single top-level directory
    let archive_path = fx.project.join("modules-1.0.tar.gz");
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let content = TWO_MODULES.as_bytes();
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "modules-1.0/cfpack.json", content)
        .unwrap();
    let bytes = builder.into_inner().unwrap().finish().unwrap();
    fs::write(&archive_path, &bytes).unwrap();

    let fetcher = RemoteFetcher::with_data_dir(data_dir.clone()).unwrap();
    let url = archive_path.to_string_lossy().into_owned();
    let checksum = cfpack_pm::url::compute_checksum(&bytes);
    let options = AddOptions {
        checksum: Some(checksum.clone()),
        ..AddOptions::default()
    };

    run(&fx.project, &[url.as_str(), "m1"], &options, &fetcher, &Answer::new(true)).unwrap();

    assert_eq!(build_names(&fx.project), vec!["m1"]);
    assert!(data_dir
        .join("downloads/archives")
        .join(&checksum)
        .join("modules-1.0")
        .join(MANIFEST_FILE)
        .is_file());
    assert_eq!(
        load(&fx.project).build()[0].commit.as_deref(),
        Some(checksum.as_str())
    );
}

#[test]
fn test_checksum_mismatch() {
    let fx = fixture(TWO_MODULES);
    let archive_path = fx.project.join("modules.tar");
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(TWO_MODULES.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "cfpack.json", TWO_MODULES.as_bytes())
        .unwrap();
    fs::write(&archive_path, builder.into_inner().unwrap()).unwrap();

    let fetcher = RemoteFetcher::with_data_dir(fx.project.join("data")).unwrap();
    let options = AddOptions {
        checksum: Some("0".repeat(64)),
        ..AddOptions::default()
    };
    let url = archive_path.to_string_lossy().into_owned();

    let result = run(&fx.project, &[url.as_str()], &options, &fetcher, &Answer::new(true));

    assert!(matches!(
        result,
        Err(AddError::ResolveError(ResolveError::Fetch(
            FetchError::ChecksumMismatch { .. }
        )))
    ));
}
