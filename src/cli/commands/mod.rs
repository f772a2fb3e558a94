//! CLI command implementations

pub mod action;
pub mod completions;
pub mod config;
pub mod doc;
pub mod incident;
pub mod init;
