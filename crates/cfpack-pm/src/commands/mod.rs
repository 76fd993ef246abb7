//! Project commands
//!
//! Implements the commands behind the CLI: init, add, status, search.

pub mod add;
pub mod init;
pub mod search;
pub mod status;

pub use add::{add_modules, AddError};
pub use init::{init_project, InitError};
pub use search::{search_modules, SearchError, SearchResult};
pub use status::{project_status, BuildEntry, ProjectStatus, StatusError};
