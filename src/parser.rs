//! Query DSL parser.
//!
//! A query source is a JSON object with exactly one key, the clause name,
//! whose value holds the clause body:
//!
//! ```text
//! {"bool": {"must": [{"term": {"status": "open"}}], "filter": {...}}}
//! ```
//!
//! Every clause parser is entered with the cursor on the clause body and
//! leaves it on the event after the body. Clause parsers receive the
//! [`TokenStream`] explicitly, which lets the nested resolver feed them a
//! replay of buffered content instead of the original stream.

use crate::{
    ast::{BoolQuery, Bound, Query, RangeQuery},
    buffer::ContentKind,
    context::{CompileOptions, QueryContext},
    error::QueryError,
    lexer::Position,
    nested,
    schema::SchemaRegistry,
    stream::{Event, JsonStream, TokenStream},
    value::Value,
};

/// Compiles query sources against one schema registry.
///
/// # Examples
///
/// ```
/// use clove_nested::{Query, QueryParser};
/// use clove_nested::schema::Mapping;
///
/// let mapping = Mapping::from_json(&serde_json::json!({
///     "properties": { "comments": { "type": "nested" } }
/// }))
/// .unwrap();
///
/// let mut parser = QueryParser::new(&mapping);
/// let query = parser
///     .parse(r#"{"nested": {"query": {"match_all": {}}, "path": "comments"}}"#)
///     .unwrap();
/// assert!(matches!(query, Query::Nested(_)));
/// ```
pub struct QueryParser<'r> {
    ctx: QueryContext<'r>,
}

impl<'r> QueryParser<'r> {
    pub fn new(registry: &'r dyn SchemaRegistry) -> Self {
        QueryParser {
            ctx: QueryContext::new(registry),
        }
    }

    pub fn with_options(registry: &'r dyn SchemaRegistry, options: CompileOptions) -> Self {
        QueryParser {
            ctx: QueryContext::with_options(registry, options),
        }
    }

    pub fn context(&self) -> &QueryContext<'r> {
        &self.ctx
    }

    /// Compiles one query source.
    pub fn parse(&mut self, source: &str) -> Result<Query, QueryError> {
        let mut stream = JsonStream::new(source)?;
        let query = parse_inner_query(&mut self.ctx, &mut stream)?;
        if !stream.check(&Event::Eof) {
            return Err(QueryError::malformed(
                format!("unexpected {} after query", stream.current().describe()),
                stream.position(),
            ));
        }
        debug_assert!(self.ctx.scopes().is_empty());
        tracing::debug!(clause = query.name(), "compiled query");
        Ok(query)
    }
}

/// Compiles `source` with default options.
pub fn compile(source: &str, registry: &dyn SchemaRegistry) -> Result<Query, QueryError> {
    QueryParser::new(registry).parse(source)
}

/// Parses one query object in the current scoring context.
///
/// Fails with [`QueryError::ClauseTooDeep`] before descending past
/// [`CompileOptions::max_clause_depth`] clauses.
pub fn parse_inner_query(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    ctx.enter_clause()?;
    let result = parse_clause_object(ctx, stream);
    ctx.leave_clause();
    result
}

fn parse_clause_object(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let start = stream.position();
    stream.expect(&Event::StartObject, "query")?;

    let (name, position) = match stream.current() {
        Event::FieldName(name) => (name.clone(), stream.position()),
        Event::EndObject => {
            return Err(QueryError::syntax(
                "query",
                "query malformed, empty clause found",
                start,
            ));
        }
        other => {
            return Err(QueryError::malformed(
                format!("expected a clause name, got {}", other.describe()),
                stream.position(),
            ));
        }
    };
    stream.advance()?;

    let query = match name.as_str() {
        "match_all" => parse_match_all(ctx, stream)?,
        "term" => parse_term(ctx, stream)?,
        "terms" => parse_terms(ctx, stream)?,
        "range" => parse_range(ctx, stream)?,
        "exists" => parse_exists(stream)?,
        "prefix" => parse_prefix(ctx, stream)?,
        "regexp" => parse_regexp(ctx, stream)?,
        "bool" => parse_bool(ctx, stream)?,
        "constant_score" => parse_constant_score(ctx, stream)?,
        "nested" => nested::parse_nested(ctx, stream)?,
        _ => return Err(QueryError::UnknownQuery { name, position }),
    };

    if !stream.check(&Event::EndObject) {
        return Err(QueryError::syntax(
            "query",
            format!("expected a single clause, found more after [{}]", name),
            stream.position(),
        ));
    }
    stream.advance()?;
    Ok(query)
}

/// Parses one query object in filter (non-scoring) context.
pub fn parse_inner_filter(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    parse_with_context(ctx, stream, true)
}

/// Parses the body of a nested clause's `query` or `filter` field.
///
/// A `query` body keeps the scoring context of the enclosing clause.
pub fn parse_content(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
    kind: ContentKind,
) -> Result<Query, QueryError> {
    match kind {
        ContentKind::Query => parse_inner_query(ctx, stream),
        ContentKind::Filter => parse_inner_filter(ctx, stream),
    }
}

fn parse_with_context(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
    filter_context: bool,
) -> Result<Query, QueryError> {
    let previous = ctx.set_filter_context(filter_context);
    let result = parse_inner_query(ctx, stream);
    ctx.set_filter_context(previous);
    result
}

// ========================================
// Field helpers
// ========================================

/// Walks the members of the object under the cursor.
///
/// `visit` is called with the cursor on each member's value and must consume
/// it. On success the cursor is left after the closing brace.
pub(crate) fn for_each_field(
    stream: &mut dyn TokenStream,
    clause: &'static str,
    mut visit: impl FnMut(&mut dyn TokenStream, &str, Position) -> Result<(), QueryError>,
) -> Result<(), QueryError> {
    stream.expect(&Event::StartObject, clause)?;
    loop {
        let (name, position) = match stream.current() {
            Event::EndObject => break,
            Event::FieldName(name) => (name.clone(), stream.position()),
            other => {
                return Err(QueryError::malformed(
                    format!("expected a field name, got {}", other.describe()),
                    stream.position(),
                ));
            }
        };
        stream.advance()?;
        visit(stream, &name, position)?;
    }
    stream.advance()
}

pub(crate) fn unknown_field(clause: &'static str, field: &str, position: Position) -> QueryError {
    QueryError::syntax(clause, format!("query does not support [{}]", field), position)
}

fn expected(
    stream: &dyn TokenStream,
    clause: &'static str,
    field: &str,
    wanted: &str,
) -> QueryError {
    QueryError::syntax(
        clause,
        format!(
            "[{}] must be {}, got {}",
            field,
            wanted,
            stream.current().describe()
        ),
        stream.position(),
    )
}

pub(crate) fn read_value(
    stream: &mut dyn TokenStream,
    clause: &'static str,
    field: &str,
) -> Result<Value, QueryError> {
    let value = Value::from_event(stream.current())
        .ok_or_else(|| expected(stream, clause, field, "a value"))?;
    stream.advance()?;
    Ok(value)
}

pub(crate) fn read_string(
    stream: &mut dyn TokenStream,
    clause: &'static str,
    field: &str,
) -> Result<String, QueryError> {
    let value = match stream.current() {
        Event::String(s) => s.clone(),
        _ => return Err(expected(stream, clause, field, "a string")),
    };
    stream.advance()?;
    Ok(value)
}

fn read_float(
    stream: &mut dyn TokenStream,
    clause: &'static str,
    field: &str,
) -> Result<f64, QueryError> {
    let value = match stream.current() {
        Event::Integer(n) => *n as f64,
        Event::Float(n) => *n,
        _ => return Err(expected(stream, clause, field, "a number")),
    };
    stream.advance()?;
    Ok(value)
}

fn read_integer(
    stream: &mut dyn TokenStream,
    clause: &'static str,
    field: &str,
) -> Result<i64, QueryError> {
    let value = match stream.current() {
        Event::Integer(n) => *n,
        Event::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| expected(stream, clause, field, "an integer"))?,
        _ => return Err(expected(stream, clause, field, "an integer")),
    };
    stream.advance()?;
    Ok(value)
}

/// Reads a `boost`, which only scoring positions accept.
pub(crate) fn read_boost(
    filter_context: bool,
    stream: &mut dyn TokenStream,
    clause: &'static str,
    position: Position,
) -> Result<Option<f64>, QueryError> {
    if filter_context {
        return Err(QueryError::syntax(
            clause,
            "filter does not support [boost]",
            position,
        ));
    }
    read_float(stream, clause, "boost").map(Some)
}

/// `{"field": value}` or `{"field": {"value": value, "boost": 2.0}}`.
struct SingleField {
    field: String,
    value: Value,
    boost: Option<f64>,
    position: Position,
}

fn parse_single_field(
    stream: &mut dyn TokenStream,
    clause: &'static str,
    filter_context: bool,
) -> Result<SingleField, QueryError> {
    let start = stream.position();
    let mut parsed: Option<SingleField> = None;

    for_each_field(stream, clause, |stream, field, position| {
        if parsed.is_some() {
            return Err(QueryError::syntax(
                clause,
                format!("query does not support multiple fields, found [{}]", field),
                position,
            ));
        }

        let mut boost = None;
        let value = if stream.check(&Event::StartObject) {
            let mut value = None;
            for_each_field(stream, clause, |stream, name, position| match name {
                "value" => {
                    value = Some(read_value(stream, clause, name)?);
                    Ok(())
                }
                "boost" => {
                    boost = read_boost(filter_context, stream, clause, position)?;
                    Ok(())
                }
                _ => Err(unknown_field(clause, name, position)),
            })?;
            value.ok_or_else(|| {
                QueryError::syntax(
                    clause,
                    format!("no value specified for field [{}]", field),
                    position,
                )
            })?
        } else {
            read_value(stream, clause, field)?
        };

        parsed = Some(SingleField {
            field: field.to_string(),
            value,
            boost,
            position,
        });
        Ok(())
    })?;

    parsed.ok_or_else(|| QueryError::syntax(clause, "query requires a field", start))
}

fn string_operand(clause: &'static str, parsed: &SingleField) -> Result<String, QueryError> {
    parsed.value.as_str().map(str::to_string).ok_or_else(|| {
        QueryError::syntax(
            clause,
            format!(
                "value of [{}] must be a string, got {}",
                parsed.field,
                parsed.value.type_name()
            ),
            parsed.position,
        )
    })
}

// ========================================
// Leaf clauses
// ========================================

fn parse_match_all(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let filter_context = ctx.is_filter_context();
    let mut boost = None;
    for_each_field(stream, "match_all", |stream, field, position| match field {
        "boost" => {
            boost = read_boost(filter_context, stream, "match_all", position)?;
            Ok(())
        }
        _ => Err(unknown_field("match_all", field, position)),
    })?;
    Ok(Query::MatchAll { boost })
}

fn parse_term(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let parsed = parse_single_field(stream, "term", ctx.is_filter_context())?;
    if parsed.value == Value::Null {
        return Err(QueryError::syntax(
            "term",
            format!("value of [{}] cannot be null", parsed.field),
            parsed.position,
        ));
    }
    Ok(Query::Term {
        field: parsed.field,
        value: parsed.value,
        boost: parsed.boost,
    })
}

fn parse_terms(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let filter_context = ctx.is_filter_context();
    let start = stream.position();
    let mut terms: Option<(String, Vec<Value>)> = None;
    let mut boost = None;

    for_each_field(stream, "terms", |stream, field, position| {
        if field == "boost" {
            boost = read_boost(filter_context, stream, "terms", position)?;
            return Ok(());
        }
        if terms.is_some() {
            return Err(QueryError::syntax(
                "terms",
                format!("query does not support multiple fields, found [{}]", field),
                position,
            ));
        }
        if !stream.check(&Event::StartArray) {
            return Err(expected(stream, "terms", field, "an array"));
        }
        stream.advance()?;
        let mut values = vec![];
        while !stream.check(&Event::EndArray) {
            values.push(read_value(stream, "terms", field)?);
        }
        stream.advance()?;
        terms = Some((field.to_string(), values));
        Ok(())
    })?;

    let (field, values) =
        terms.ok_or_else(|| QueryError::syntax("terms", "query requires a field", start))?;
    Ok(Query::Terms {
        field,
        values,
        boost,
    })
}

fn parse_range(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let filter_context = ctx.is_filter_context();
    let start = stream.position();
    let mut range: Option<RangeQuery> = None;

    for_each_field(stream, "range", |stream, field, position| {
        if range.is_some() {
            return Err(QueryError::syntax(
                "range",
                format!("query does not support multiple fields, found [{}]", field),
                position,
            ));
        }

        let mut query = RangeQuery {
            field: field.to_string(),
            lower: None,
            upper: None,
            boost: None,
        };
        for_each_field(stream, "range", |stream, name, position| {
            let bound = |stream: &mut dyn TokenStream,
                         inclusive: bool|
             -> Result<Option<Bound>, QueryError> {
                let value = read_value(stream, "range", name)?;
                if value == Value::Null {
                    return Err(QueryError::syntax(
                        "range",
                        format!("[{}] cannot be null", name),
                        position,
                    ));
                }
                Ok(Some(Bound { value, inclusive }))
            };
            match name {
                "gt" => query.lower = bound(stream, false)?,
                "gte" => query.lower = bound(stream, true)?,
                "lt" => query.upper = bound(stream, false)?,
                "lte" => query.upper = bound(stream, true)?,
                "boost" => query.boost = read_boost(filter_context, stream, "range", position)?,
                _ => return Err(unknown_field("range", name, position)),
            }
            Ok(())
        })?;

        range = Some(query);
        Ok(())
    })?;

    range
        .map(Query::Range)
        .ok_or_else(|| QueryError::syntax("range", "query requires a field", start))
}

fn parse_exists(stream: &mut dyn TokenStream) -> Result<Query, QueryError> {
    let start = stream.position();
    let mut field = None;
    for_each_field(stream, "exists", |stream, name, position| match name {
        "field" => {
            field = Some(read_string(stream, "exists", name)?);
            Ok(())
        }
        _ => Err(unknown_field("exists", name, position)),
    })?;

    let field = field.ok_or_else(|| {
        QueryError::syntax("exists", "must be provided with a [field]", start)
    })?;
    Ok(Query::Exists { field })
}

fn parse_prefix(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let parsed = parse_single_field(stream, "prefix", ctx.is_filter_context())?;
    let prefix = string_operand("prefix", &parsed)?;
    Ok(Query::Prefix {
        field: parsed.field,
        prefix,
        boost: parsed.boost,
    })
}

fn parse_regexp(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let parsed = parse_single_field(stream, "regexp", ctx.is_filter_context())?;
    let pattern = string_operand("regexp", &parsed)?;
    if let Err(source) = regex::Regex::new(&pattern) {
        return Err(QueryError::InvalidRegex {
            field: parsed.field,
            source,
        });
    }
    Ok(Query::Regexp {
        field: parsed.field,
        pattern,
        boost: parsed.boost,
    })
}

// ========================================
// Compound clauses
// ========================================

/// `None` keeps the enclosing scoring context.
fn parse_occurrence(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
    filter_context: Option<bool>,
) -> Result<Query, QueryError> {
    match filter_context {
        Some(filter_context) => parse_with_context(ctx, stream, filter_context),
        None => parse_inner_query(ctx, stream),
    }
}

/// One clause object, or an array of them.
fn parse_clauses(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
    filter_context: Option<bool>,
) -> Result<Vec<Query>, QueryError> {
    if !stream.check(&Event::StartArray) {
        return Ok(vec![parse_occurrence(ctx, stream, filter_context)?]);
    }

    stream.advance()?;
    let mut clauses = vec![];
    while !stream.check(&Event::EndArray) {
        clauses.push(parse_occurrence(ctx, stream, filter_context)?);
    }
    stream.advance()?;
    Ok(clauses)
}

fn parse_bool(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let filter_context = ctx.is_filter_context();
    let mut query = BoolQuery::default();

    for_each_field(stream, "bool", |stream, field, position| {
        match field {
            "must" => query.must.extend(parse_clauses(ctx, stream, None)?),
            "should" => query.should.extend(parse_clauses(ctx, stream, None)?),
            "must_not" => query.must_not.extend(parse_clauses(ctx, stream, Some(true))?),
            "filter" => query.filter.extend(parse_clauses(ctx, stream, Some(true))?),
            "minimum_should_match" => {
                query.minimum_should_match = Some(read_integer(stream, "bool", field)?)
            }
            "boost" => query.boost = read_boost(filter_context, stream, "bool", position)?,
            _ => return Err(unknown_field("bool", field, position)),
        }
        Ok(())
    })?;

    Ok(Query::Bool(query))
}

fn parse_constant_score(
    ctx: &mut QueryContext<'_>,
    stream: &mut dyn TokenStream,
) -> Result<Query, QueryError> {
    let filter_context = ctx.is_filter_context();
    let start = stream.position();
    let mut filter = None;
    let mut boost = None;

    for_each_field(stream, "constant_score", |stream, field, position| {
        match field {
            "filter" => filter = Some(parse_inner_filter(ctx, stream)?),
            "boost" => boost = read_boost(filter_context, stream, "constant_score", position)?,
            _ => return Err(unknown_field("constant_score", field, position)),
        }
        Ok(())
    })?;

    let filter = filter.ok_or_else(|| {
        QueryError::syntax("constant_score", "requires a 'filter' element", start)
    })?;
    Ok(Query::ConstantScore {
        filter: Box::new(filter),
        boost,
    })
}
