//! Nested clause resolution.
//!
//! A `nested` clause names a nested collection (`path`) and a body (`query`
//! and/or `filter`) that must be parsed inside that collection's scope. The
//! members of a JSON object are unordered, so the body may arrive first. In
//! that case it is captured by the [deferred buffer](crate::buffer) and
//! replayed once the path is known.
//!
//! ```text
//! {"nested": {"query": {...}, "path": "comments"}}   body buffered, replayed on path
//! {"nested": {"path": "comments", "query": {...}}}   body parsed in place
//! ```
//!
//! [`NestedClause`] holds the state of one clause. Each body branch moves
//! through `Absent -> Found -> Parsed`; a branch parsed in place skips
//! `Found`.

use std::rc::Rc;

use crate::{
    ast::{BoolQuery, NestedQuery, Query, ScoreMode},
    binding::{self, PathBinding},
    buffer::{self, BufferedContent, ContentKind},
    context::{QueryContext, Resolution},
    error::QueryError,
    parser::{self, for_each_field, read_boost, read_string, unknown_field},
    schema::SchemaNode,
    scope::ScopeFrame,
    stream::TokenStream,
};

#[derive(Debug, Clone, Default)]
enum Branch {
    #[default]
    Absent,
    /// Body seen before the path, waiting to be replayed
    Found(BufferedContent),
    Parsed(Rc<Query>),
}

impl Branch {
    fn is_found(&self) -> bool {
        !matches!(self, Branch::Absent)
    }
}

/// Resolution state of one `nested` clause.
#[derive(Debug, Default)]
pub struct NestedClause {
    binding: Option<PathBinding>,
    query: Branch,
    filter: Branch,
    frame: Option<ScopeFrame>,
}

impl NestedClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the clause to `path`.
    ///
    /// Under [`Resolution::Eager`] any body buffered so far is parsed now.
    ///
    /// Declaring the path again rebinds the clause, but bodies that were
    /// already parsed keep the scope of the earlier path; they are not
    /// parsed a second time.
    pub fn on_path(&mut self, ctx: &mut QueryContext<'_>, path: &str) -> Result<(), QueryError> {
        let binding = binding::bind(ctx.registry(), path)?;

        if let Some(previous) = &self.binding {
            tracing::warn!(
                previous = previous.path(),
                path,
                "[nested] path declared more than once, parsed content keeps the earlier scope"
            );
        }
        self.binding = Some(binding);

        if ctx.options().resolution == Resolution::Eager {
            self.resolve_buffered(ctx, ContentKind::Query)?;
            self.resolve_buffered(ctx, ContentKind::Filter)?;
        }
        Ok(())
    }

    /// Handles a `query` body with the cursor on its opening brace.
    pub fn on_query_content(
        &mut self,
        ctx: &mut QueryContext<'_>,
        stream: &mut dyn TokenStream,
    ) -> Result<(), QueryError> {
        self.on_content(ctx, stream, ContentKind::Query)
    }

    /// Handles a `filter` body with the cursor on its opening brace.
    pub fn on_filter_content(
        &mut self,
        ctx: &mut QueryContext<'_>,
        stream: &mut dyn TokenStream,
    ) -> Result<(), QueryError> {
        self.on_content(ctx, stream, ContentKind::Filter)
    }

    /// Resolved inner query.
    ///
    /// Repeated calls return the same shared query without touching the
    /// scope stack.
    pub fn query(&mut self, ctx: &mut QueryContext<'_>) -> Result<Rc<Query>, QueryError> {
        self.resolved(ctx, ContentKind::Query)
    }

    /// Resolved inner filter.
    pub fn filter(&mut self, ctx: &mut QueryContext<'_>) -> Result<Rc<Query>, QueryError> {
        self.resolved(ctx, ContentKind::Filter)
    }

    pub fn path(&self) -> Option<&str> {
        self.binding.as_ref().map(PathBinding::path)
    }

    pub fn nested_descriptor(&self) -> Option<&SchemaNode> {
        self.binding.as_ref().map(PathBinding::descriptor)
    }

    pub fn query_found(&self) -> bool {
        self.query.is_found()
    }

    pub fn filter_found(&self) -> bool {
        self.filter.is_found()
    }

    pub fn query_parsed(&self) -> bool {
        matches!(self.query, Branch::Parsed(_))
    }

    pub fn filter_parsed(&self) -> bool {
        matches!(self.filter, Branch::Parsed(_))
    }

    /// Scope the most recently parsed body was parsed under.
    pub fn frame(&self) -> Option<&ScopeFrame> {
        self.frame.as_ref()
    }

    fn branch(&self, kind: ContentKind) -> &Branch {
        match kind {
            ContentKind::Query => &self.query,
            ContentKind::Filter => &self.filter,
        }
    }

    fn branch_mut(&mut self, kind: ContentKind) -> &mut Branch {
        match kind {
            ContentKind::Query => &mut self.query,
            ContentKind::Filter => &mut self.filter,
        }
    }

    fn on_content(
        &mut self,
        ctx: &mut QueryContext<'_>,
        stream: &mut dyn TokenStream,
        kind: ContentKind,
    ) -> Result<(), QueryError> {
        let branch = match &self.binding {
            Some(binding) => {
                tracing::debug!(path = binding.path(), %kind, "parsing nested content in place");
                let (query, frame) = parse_in_scope(ctx, binding, stream, kind)?;
                self.frame = Some(frame);
                Branch::Parsed(Rc::new(query))
            }
            None => {
                tracing::debug!(%kind, "path not known yet, buffering nested content");
                Branch::Found(buffer::capture(stream, kind)?)
            }
        };
        *self.branch_mut(kind) = branch;
        Ok(())
    }

    /// Replays a buffered body under the current binding. No-op unless the
    /// branch is `Found` and a path is bound.
    fn resolve_buffered(
        &mut self,
        ctx: &mut QueryContext<'_>,
        kind: ContentKind,
    ) -> Result<(), QueryError> {
        let Some(binding) = &self.binding else {
            return Ok(());
        };
        let mut replay = match self.branch(kind) {
            Branch::Found(content) => content.replay(),
            _ => return Ok(()),
        };

        tracing::debug!(path = binding.path(), %kind, "replaying buffered nested content");
        let (query, frame) = parse_in_scope(ctx, binding, &mut replay, kind)?;
        self.frame = Some(frame);
        *self.branch_mut(kind) = Branch::Parsed(Rc::new(query));
        Ok(())
    }

    fn resolved(
        &mut self,
        ctx: &mut QueryContext<'_>,
        kind: ContentKind,
    ) -> Result<Rc<Query>, QueryError> {
        if let Branch::Parsed(query) = self.branch(kind) {
            return Ok(Rc::clone(query));
        }
        if self.binding.is_none() {
            return Err(QueryError::MissingPath);
        }
        if !self.branch(kind).is_found() {
            return Err(QueryError::MissingContent);
        }

        self.resolve_buffered(ctx, kind)?;
        match self.branch(kind) {
            Branch::Parsed(query) => Ok(Rc::clone(query)),
            _ => Err(QueryError::MissingContent),
        }
    }
}

/// Parses one body inside a scope for `binding`.
///
/// The scope is popped when the guard goes out of scope, whether or not the
/// body parsed.
fn parse_in_scope(
    ctx: &mut QueryContext<'_>,
    binding: &PathBinding,
    stream: &mut dyn TokenStream,
    kind: ContentKind,
) -> Result<(Query, ScopeFrame), QueryError> {
    let mut scope = ctx.enter_scope(binding)?;
    let frame = scope.frame().clone();
    let query = parser::parse_content(&mut scope, stream, kind)?;
    Ok((query, frame))
}

/// Parses the body of a `nested` clause.
pub fn parse_nested(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let filter_context = ctx.is_filter_context();
    let mut clause = NestedClause::new();
    let mut score_mode = ScoreMode::default();
    let mut boost = None;
    let mut name = None;

    for_each_field(stream, "nested", |stream, field, position| match field {
        "path" => {
            let path = read_string(stream, "nested", field)?;
            clause.on_path(ctx, &path)
        }
        "query" => clause.on_query_content(ctx, stream),
        "filter" => clause.on_filter_content(ctx, stream),
        "score_mode" => {
            let mode = read_string(stream, "nested", field)?;
            score_mode = ScoreMode::parse(&mode).ok_or_else(|| {
                QueryError::syntax("nested", format!("illegal score_mode [{}]", mode), position)
            })?;
            Ok(())
        }
        "boost" => {
            boost = read_boost(filter_context, stream, "nested", position)?;
            Ok(())
        }
        "_name" => {
            name = Some(read_string(stream, "nested", field)?);
            Ok(())
        }
        _ => Err(unknown_field("nested", field, position)),
    })?;

    let query = match (clause.query_found(), clause.filter_found()) {
        (_, false) => clause.query(ctx)?,
        (false, true) => Rc::new(Query::ConstantScore {
            filter: Box::new(Query::clone(&*clause.filter(ctx)?)),
            boost: None,
        }),
        (true, true) => {
            let must = Query::clone(&*clause.query(ctx)?);
            let filter = Query::clone(&*clause.filter(ctx)?);
            Rc::new(Query::Bool(BoolQuery {
                must: vec![must],
                filter: vec![filter],
                ..BoolQuery::default()
            }))
        }
    };

    let path = clause.path().ok_or(QueryError::MissingPath)?.to_string();
    let frame = clause.frame().ok_or(QueryError::MissingContent)?;

    Ok(Query::Nested(NestedQuery {
        path,
        query,
        score_mode,
        boost,
        name,
        parent_filter: frame.parent_filter.clone(),
        child_filter: frame.child_filter.clone(),
    }))
}
