//! CLI, configuration and output rendering
//!
//! This crate provides the `calactions` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use output::format_event_line;
