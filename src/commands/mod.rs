//! CLI subcommand implementations.

pub mod config;
pub mod ui;
pub mod validate;
