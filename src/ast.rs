//! # Query source tokens and compiled query tree
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[query]** - The compiled [`Query`] tree handed to the executor
//!
//! ## Quick Start
//!
//! ```text
//! {
//!   "nested": {
//!     "query": { "term": { "comments.author": "kim" } },
//!     "path": "comments"
//!   }
//! }
//! ```
//!
//! compiles to a [`Query::Nested`] whose inner query is the `term` clause,
//! evaluated against `comments` documents and joined back to root documents.
//! The `path` may come before or after the body.
pub mod query;
pub mod tokens;

pub use query::{BoolQuery, Bound, NestedQuery, Query, RangeQuery, ScoreMode};
pub use tokens::Token;
