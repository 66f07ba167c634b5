//! CLI support for clove-nested
//!
//! Provides programmatic access to the `clove-nested` commands so other
//! tools can embed them.

mod check;
mod paths;

pub use check::{CheckOptions, CheckResult, MappingSource, execute_check, load_mapping};
pub use paths::list_nested_paths;

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Query compilation failed
    #[error("Compile error: {0}")]
    Query(#[from] crate::QueryError),

    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No query provided
    #[error("No query provided. Pass it as an argument or pipe it to stdin.")]
    NoQuery,

    /// No mapping provided
    #[error("No mapping provided. Use --mapping or --mapping-file.")]
    NoMapping,
}
