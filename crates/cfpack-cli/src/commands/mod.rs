//! Subcommand implementations

pub mod add;
pub mod init;
pub mod search;
pub mod status;
