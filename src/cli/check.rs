//! Compile queries against a mapping

use std::{fs, path::PathBuf};

use super::CliError;
use crate::{
    CompileOptions, Query, QueryParser,
    schema::Mapping,
    stream::{Event, JsonStream, TokenStream},
};

/// Where the mapping comes from
#[derive(Debug, Clone)]
pub enum MappingSource {
    /// Mapping JSON given inline
    Inline(String),
    /// Path to a mapping JSON file
    File(PathBuf),
}

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query source to compile
    pub query: Option<String>,
    /// Mapping to compile against
    pub mapping: Option<MappingSource>,
    /// Compiler settings
    pub compile: CompileOptions,
    /// Only validate JSON structure, don't compile
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Structure validation passed
    SyntaxValid,
    /// Query compiled successfully
    Compiled(Query),
}

/// Reads and parses the mapping.
pub fn load_mapping(source: Option<&MappingSource>) -> Result<Mapping, CliError> {
    let text = match source.ok_or(CliError::NoMapping)? {
        MappingSource::Inline(text) => text.clone(),
        MappingSource::File(path) => fs::read_to_string(path)?,
    };
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Mapping::from_json(&json)?)
}

/// Walks every event of `source`, failing on the first structural error.
fn validate_structure(source: &str) -> Result<(), CliError> {
    let mut stream = JsonStream::new(source)?;
    while !stream.check(&Event::Eof) {
        stream.advance()?;
    }
    Ok(())
}

/// Execute a clove-nested check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let query = options.query.as_deref().ok_or(CliError::NoQuery)?;

    if options.syntax_only {
        validate_structure(query)?;
        return Ok(CheckResult::SyntaxValid);
    }

    let mapping = load_mapping(options.mapping.as_ref())?;
    let mut parser = QueryParser::with_options(&mapping, options.compile.clone());
    let compiled = parser.parse(query)?;
    Ok(CheckResult::Compiled(compiled))
}
