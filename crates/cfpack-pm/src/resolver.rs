//! Module resolution
//!
//! Turns the references given to `add` into appended build entries, pulling in
//! dependencies ahead of the modules that need them.
//!
//! A reference either names a remote source (archive or git repository) whose
//! manifest provides modules, or it names catalog modules and local paths.

use crate::index::{IndexError, ModuleIndex};
use crate::manifest::{ManifestDocument, ManifestError};
use crate::module::{AddedBy, Module};
use crate::path::{is_local_reference, local_module_name, PathError};
use crate::url::git::split_commit;
use crate::url::{is_archive_url, is_remote_source, FetchError, SourceFetcher};
use crate::validate::{check_added_module, AutorunWarning};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while adding modules
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing to add
    #[error("Must specify at least one module to add")]
    NoModulesRequested,

    /// A reference is neither a catalog module nor an existing path
    #[error("Module '{0}' does not exist")]
    NotFound(String),

    /// References missing from the catalog or a remote manifest
    #[error("Module(s) could not be found: {}", .0.join(", "))]
    MissingModules(Vec<String>),

    /// A remote manifest provides nothing
    #[error("No modules available in '{0}', nothing to do")]
    NoModulesAvailable(String),

    /// Confirmation prompt answered negatively
    #[error("Declined to add modules")]
    Declined,

    /// Dependencies form a cycle
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Asks the user a yes/no question
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Prompts on stdout and reads the answer from stdin
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        print!("{}", question);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                tracing::debug!(error = %e, "could not read confirmation");
                false
            }
        }
    }
}

/// Whether an answer to a prompt means yes
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Options for a single `add` call
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Add everything a remote source provides without asking
    pub non_interactive: bool,

    /// Expected SHA-256 of an archive source
    pub checksum: Option<String>,

    /// Attribution per reference as given; unlisted references are user requests
    pub added_by: HashMap<String, AddedBy>,
}

/// Attribution of every translated reference in one call
#[derive(Debug, Clone, Default)]
pub struct AttributionMap {
    entries: HashMap<String, AddedBy>,
}

impl AttributionMap {
    /// Build the map for `(reference, translated)` pairs
    ///
    /// An attribution given for either form of a reference is used, otherwise the
    /// reference counts as requested by the user.
    pub fn build(translated: &[(String, String)], given: &HashMap<String, AddedBy>) -> Self {
        let entries = translated
            .iter()
            .map(|(reference, name)| {
                let added_by = given
                    .get(reference)
                    .or_else(|| given.get(name))
                    .cloned()
                    .unwrap_or(AddedBy::User);
                (name.clone(), added_by)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&AddedBy> {
        self.entries.get(name)
    }

    pub fn is_user(&self, name: &str) -> bool {
        self.get(name).map(AddedBy::is_user).unwrap_or(false)
    }
}

/// Something reported to the user during an add
#[derive(Debug, Clone, PartialEq)]
pub enum AddEvent {
    /// Appended on request
    Added(String),

    /// Appended because another module needs it
    AddedAsDependency { name: String, dependent: String },

    /// Requested but already in the build
    Skipped(String),

    /// Reached from a remote source but already in the build
    AlreadyAdded(String),

    /// An alias was replaced by its target
    AliasSubstituted { alias: String, target: String },

    /// A local module was added without an autorun tag
    AutorunWarning(AutorunWarning),

    /// Modules listed by a remote source
    ModulesFound { url: String, names: Vec<String> },
}

impl fmt::Display for AddEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddEvent::Added(name) => write!(f, "Added module: {}", name),
            AddEvent::AddedAsDependency { name, dependent } => {
                write!(f, "Added module: {} (Dependency of {})", name, dependent)
            }
            AddEvent::Skipped(name) => write!(f, "Skipping already added module: {}", name),
            AddEvent::AlreadyAdded(name) => {
                write!(f, "Skipping already added module '{}'", name)
            }
            AddEvent::AliasSubstituted { alias, target } => {
                write!(f, "{} is an alias for {}", alias, target)
            }
            AddEvent::AutorunWarning(warning) => write!(f, "{}", warning),
            AddEvent::ModulesFound { url, names } => {
                write!(f, "Found {} modules in '{}':", names.len(), url)?;
                for name in names {
                    write!(f, "\n  - {}", name)?;
                }
                Ok(())
            }
        }
    }
}

/// Everything reported by one add call, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddReport {
    pub events: Vec<AddEvent>,
}

impl AddReport {
    /// Names of the modules appended, in build order
    pub fn added(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                AddEvent::Added(name) | AddEvent::AddedAsDependency { name, .. } => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &AutorunWarning> {
        self.events.iter().filter_map(|event| match event {
            AddEvent::AutorunWarning(warning) => Some(warning),
            _ => None,
        })
    }
}

/// Adds modules to a manifest's build list
///
/// The catalog is loaded when the resolver is created and used read-only from
/// then on. A failed add leaves the build list as it was.
pub struct ModuleResolver<'a> {
    index: &'a ModuleIndex,
    build: &'a mut Vec<Module>,
    root: PathBuf,
    fetcher: &'a dyn SourceFetcher,
    confirm: &'a dyn Confirm,
    report: AddReport,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(
        manifest: &'a mut ManifestDocument,
        fetcher: &'a dyn SourceFetcher,
        confirm: &'a dyn Confirm,
    ) -> Result<Self, ResolveError> {
        let root = manifest.root();
        let (index, build) = manifest.resolution_parts()?;
        Ok(Self {
            index,
            build,
            root,
            fetcher,
            confirm,
            report: AddReport::default(),
        })
    }

    /// Add `references` to the build
    pub fn add(
        &mut self,
        references: &[String],
        options: &AddOptions,
    ) -> Result<AddReport, ResolveError> {
        let (first, rest) = references
            .split_first()
            .ok_or(ResolveError::NoModulesRequested)?;

        let snapshot = self.build.clone();
        let result = if is_remote_source(first) {
            self.add_from_source(first, rest, options)
        } else {
            self.add_references(references, options)
        };

        let report = std::mem::take(&mut self.report);
        match result {
            Ok(()) => Ok(report),
            Err(e) => {
                *self.build = snapshot;
                Err(e)
            }
        }
    }

    fn emit(&mut self, event: AddEvent) {
        match &event {
            AddEvent::AutorunWarning(warning) => {
                for line in warning.to_string().lines() {
                    tracing::warn!("{}", line);
                }
            }
            _ => println!("{}", event),
        }
        self.report.events.push(event);
    }

    fn is_in_build(&self, name: &str) -> bool {
        self.build.iter().any(|m| m.name == name)
    }

    /// Append a concrete module, report it, and run add-time checks
    fn append(&mut self, module: Module) {
        let event = match &module.added_by {
            Some(AddedBy::Module(dependent)) => AddEvent::AddedAsDependency {
                name: module.name.clone(),
                dependent: dependent.clone(),
            },
            _ => AddEvent::Added(module.name.clone()),
        };
        let warning = check_added_module(&self.root, &module);

        self.build.push(module);
        self.emit(event);
        if let Some(warning) = warning {
            self.emit(AddEvent::AutorunWarning(warning));
        }
    }

    fn cycle_error(stack: &[String], name: &str) -> ResolveError {
        let start = stack.iter().position(|n| n == name).unwrap_or(0);
        let mut chain: Vec<&str> = stack[start..].iter().map(String::as_str).collect();
        chain.push(name);
        ResolveError::CircularDependency(chain.join(" -> "))
    }

    // Remote sources

    fn add_from_source(
        &mut self,
        url: &str,
        names: &[String],
        options: &AddOptions,
    ) -> Result<(), ResolveError> {
        let fetched = if is_archive_url(url) {
            self.fetcher.fetch_archive(url, options.checksum.as_deref())?
        } else {
            self.fetcher.clone_repo(url)?
        };
        tracing::debug!(
            url,
            manifest = %fetched.manifest_path.display(),
            version = %fetched.version,
            "fetched remote source"
        );

        let (origin, _) = split_commit(url);
        let mut remote = ManifestDocument::from_file(&fetched.manifest_path)?
            .with_origin(origin, fetched.version)
            .with_loaded_index(self.index.clone());
        let provides = remote.get_provides()?;

        let selected: Vec<Module> = if names.is_empty() {
            self.emit(AddEvent::ModulesFound {
                url: url.to_string(),
                names: provides.iter().map(|m| m.name.clone()).collect(),
            });
            if provides.is_empty() {
                return Err(ResolveError::NoModulesAvailable(url.to_string()));
            }
            if !options.non_interactive {
                let question = format!("Do you want to add all {} of them? [y/N] ", provides.len());
                if !self.confirm.confirm(&question) {
                    return Err(ResolveError::Declined);
                }
            }
            provides
        } else {
            let missing: Vec<String> = names
                .iter()
                .filter(|name| !provides.iter().any(|m| &m.name == *name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(ResolveError::MissingModules(missing));
            }
            names
                .iter()
                .filter_map(|name| provides.iter().find(|m| &m.name == name).cloned())
                .collect()
        };

        let mut stack = Vec::new();
        for module in selected {
            self.add_with_dependencies(module, &mut remote, &mut stack)?;
        }
        Ok(())
    }

    /// Look a dependency up in the remote manifest, falling back to the catalog
    ///
    /// A catalog alias is replaced by its target.
    fn provided_dependency(
        &mut self,
        name: &str,
        remote: &mut ManifestDocument,
        dependent: &str,
    ) -> Result<Module, ResolveError> {
        let found = match remote.get_module_for_build(name) {
            Err(ManifestError::Index(IndexError::UnresolvedAlias { name: alias, target })) => {
                self.emit(AddEvent::AliasSubstituted {
                    alias,
                    target: target.clone(),
                });
                remote.get_module_for_build(&target)?
            }
            other => other?,
        };
        let module = found.ok_or_else(|| ResolveError::NotFound(name.to_string()))?;
        Ok(module.added_by(AddedBy::Module(dependent.to_string())))
    }

    fn add_with_dependencies(
        &mut self,
        module: Module,
        remote: &mut ManifestDocument,
        stack: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        if self.is_in_build(&module.name) {
            self.emit(AddEvent::AlreadyAdded(module.name.clone()));
            return Ok(());
        }
        if stack.contains(&module.name) {
            return Err(Self::cycle_error(stack, &module.name));
        }

        stack.push(module.name.clone());
        for dependency in &module.dependencies {
            if self.is_in_build(dependency) {
                self.emit(AddEvent::AlreadyAdded(dependency.clone()));
                continue;
            }
            let dependency = self.provided_dependency(dependency, remote, &module.name)?;
            self.add_with_dependencies(dependency, remote, stack)?;
        }
        stack.pop();

        self.append(module);
        Ok(())
    }

    // Catalog and local references

    /// Map a reference to the name it is stored under
    fn translate(&mut self, reference: &str) -> Result<String, ResolveError> {
        let index = self.index;
        if !index.exists(reference) {
            return Err(ResolveError::NotFound(reference.to_string()));
        }

        let entry = match index.get(reference) {
            Some(entry) => entry,
            None => return Ok(local_module_name(&self.root, reference)?),
        };

        match &entry.alias {
            Some(target) => {
                self.emit(AddEvent::AliasSubstituted {
                    alias: reference.to_string(),
                    target: target.clone(),
                });
                Ok(target.clone())
            }
            None => Ok(reference.to_string()),
        }
    }

    fn add_references(
        &mut self,
        references: &[String],
        options: &AddOptions,
    ) -> Result<(), ResolveError> {
        let index = self.index;
        let unknown: Vec<String> = references
            .iter()
            .filter(|reference| !index.exists(reference))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ResolveError::MissingModules(unknown));
        }

        let mut translated = Vec::with_capacity(references.len());
        for reference in references {
            let name = self.translate(reference)?;
            translated.push((reference.clone(), name));
        }
        let attribution = AttributionMap::build(&translated, &options.added_by);

        let missing: Vec<String> = translated
            .iter()
            .map(|(_, name)| name)
            .filter(|name| !is_local_reference(name) && !self.index.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ResolveError::MissingModules(missing));
        }

        // Explicit requests take over modules previously pulled in as dependencies
        for module in self.build.iter_mut() {
            if attribution.is_user(&module.name) {
                module.added_by = Some(AddedBy::User);
            }
        }

        let mut queued: Vec<String> = Vec::new();
        for (_, name) in &translated {
            if self.is_in_build(name) || queued.contains(name) {
                if attribution.is_user(name) {
                    self.emit(AddEvent::Skipped(name.clone()));
                }
                continue;
            }
            queued.push(name.clone());
        }

        let mut modules = Vec::with_capacity(queued.len());
        for name in &queued {
            modules.push(self.resolve(name)?);
        }

        // Dependencies of the whole request go in before any requested module
        let mut stack = Vec::new();
        for module in &modules {
            self.add_dependencies(module, &attribution, &mut stack)?;
        }

        for module in modules {
            // Requested modules needed by another member are already in
            if self.is_in_build(&module.name) {
                continue;
            }
            let added_by = attribution.get(&module.name).cloned().unwrap_or(AddedBy::User);
            self.append(module.added_by(added_by));
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Module, ResolveError> {
        self.index.resolve_object(name).map_err(|e| match e {
            IndexError::NotFound(name) => ResolveError::NotFound(name),
            other => other.into(),
        })
    }

    /// Add the missing dependencies of `module`, each after its own
    ///
    /// A dependency that is also part of the current request keeps the
    /// request's attribution. Others are attributed to the module needing them.
    fn add_dependencies(
        &mut self,
        module: &Module,
        batch: &AttributionMap,
        stack: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        stack.push(module.name.clone());
        for dependency in &module.dependencies {
            let dependency = self.translate(dependency)?;
            if self.is_in_build(&dependency) {
                continue;
            }
            let added_by = batch
                .get(&dependency)
                .cloned()
                .unwrap_or_else(|| AddedBy::Module(module.name.clone()));
            self.materialize(&dependency, added_by, batch, stack)?;
        }
        stack.pop();
        Ok(())
    }

    /// Append `name` after its dependencies
    fn materialize(
        &mut self,
        name: &str,
        added_by: AddedBy,
        batch: &AttributionMap,
        stack: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        if self.is_in_build(name) {
            return Ok(());
        }
        if stack.iter().any(|n| n == name) {
            return Err(Self::cycle_error(stack, name));
        }

        let module = self.resolve(name)?;
        self.add_dependencies(&module, batch, stack)?;
        self.append(module.added_by(added_by));
        Ok(())
    }
}
