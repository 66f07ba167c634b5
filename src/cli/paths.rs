//! List the nested collections of a mapping

use super::{CliError, MappingSource, load_mapping};

/// Nested collection paths of the mapping, sorted
pub fn list_nested_paths(source: Option<&MappingSource>) -> Result<Vec<String>, CliError> {
    let mapping = load_mapping(source)?;
    Ok(mapping
        .nested_paths()
        .into_iter()
        .map(str::to_string)
        .collect())
}
