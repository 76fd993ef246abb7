//! cfpack Library
//!
//! This crate provides the building blocks of the cfpack policy-set manager:
//! - Build manifest loading and saving (cfpack.json)
//! - Module catalog lookup, including aliases and local paths
//! - Dependency-ordered module resolution for `add`
//! - Remote sources: archives and git repositories that provide modules
//! - Add-time advisory checks for autorun tags

pub mod commands;
pub mod index;
pub mod manifest;
pub mod module;
pub mod path;
pub mod pretty;
pub mod resolver;
pub mod url;
pub mod validate;

pub use index::{IndexError, IndexSource, ModuleIndex, DEFAULT_INDEX};
pub use manifest::{ManifestDocument, ManifestError, MANIFEST_FILE};
pub use module::{AddedBy, IndexEntry, Module, USER_MARKER};
pub use path::{local_module_name, LocalKind, PathError};
pub use resolver::{
    AddEvent, AddOptions, AddReport, AttributionMap, Confirm, ModuleResolver, ResolveError,
    StdinConfirm,
};
pub use crate::url::{FetchError, FetchedSource, RemoteFetcher, SourceFetcher};
pub use validate::AutorunWarning;
