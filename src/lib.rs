//! Query compiler for nested document search.
//!
//! Compiles a JSON query DSL against a schema, resolving every `nested`
//! clause to the collection it targets and the parent/child filters that
//! join its member documents back to their owners. A `nested` clause's body
//! may appear before its `path`; such bodies are buffered and replayed once
//! the path is known.

pub mod ast;
pub mod binding;
pub mod buffer;
pub mod cli;
pub mod context;
pub mod error;
pub mod lexer;
pub mod nested;
pub mod output;
pub mod parser;
pub mod schema;
pub mod scope;
pub mod stream;
pub mod value;

pub use ast::{NestedQuery, Query, ScoreMode, Token};
pub use binding::{PathBinding, bind};
pub use buffer::{BufferedContent, ContentKind};
pub use context::{CompileOptions, QueryContext, Resolution};
pub use error::QueryError;
pub use lexer::{LexError, Lexer, Position};
pub use nested::NestedClause;
pub use output::{to_json, to_json_string};
pub use parser::{QueryParser, compile};
pub use schema::{BitFilter, Mapping, SchemaNode, SchemaRegistry};
pub use scope::{ScopeFrame, ScopeGuard, ScopeStack};
pub use stream::{Event, JsonStream, TokenStream};
pub use value::Value;
