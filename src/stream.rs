//! Forward-only structural reader over JSON sources.
//!
//! The query compiler never sees raw tokens. It walks a [`TokenStream`], which
//! yields one structural [`Event`] at a time (start of object, field name,
//! scalar, ...). Two implementations exist: [`JsonStream`] reads source text
//! through the [`Lexer`], and [`ReplayStream`](crate::buffer::ReplayStream)
//! walks content captured earlier by the deferred buffer.
//!
//! Both follow the same cursor convention: `current()` is the event under the
//! cursor, and after a value has been consumed the cursor sits on the event
//! that follows it.

use crate::{
    ast::Token,
    error::QueryError,
    lexer::{Lexer, Position},
};

/// Structural event of a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// Member name inside an object; the member's value follows
    FieldName(String),
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    Eof,
}

impl Event {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Event::String(_) | Event::Integer(_) | Event::Float(_) | Event::Boolean(_) | Event::Null
        )
    }

    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Event::StartObject => "start of object".to_string(),
            Event::EndObject => "end of object".to_string(),
            Event::StartArray => "start of array".to_string(),
            Event::EndArray => "end of array".to_string(),
            Event::FieldName(name) => format!("field [{}]", name.escape_debug()),
            Event::String(s) => format!("string {:?}", s),
            Event::Integer(n) => format!("number {}", n),
            Event::Float(n) => format!("number {}", n),
            Event::Boolean(b) => b.to_string(),
            Event::Null => "null".to_string(),
            Event::Eof => "end of input".to_string(),
        }
    }
}

/// An event together with the source position it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedEvent {
    pub event: Event,
    pub position: Position,
}

/// Forward-only reader of structural events.
pub trait TokenStream {
    /// Event under the cursor.
    fn current(&self) -> &Event;

    /// Source position of the event under the cursor.
    fn position(&self) -> Position;

    /// Moves the cursor to the next event.
    fn advance(&mut self) -> Result<(), QueryError>;

    /// Name of the field under the cursor, if the cursor is on a field name.
    fn field_name(&self) -> Option<&str> {
        match self.current() {
            Event::FieldName(name) => Some(name),
            _ => None,
        }
    }

    /// Whether the current event has the same kind as `event`.
    fn check(&self, event: &Event) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(event)
    }

    /// Consumes an event of the same kind as `expected`, or fails with a
    /// syntax error attributed to `clause`.
    fn expect(&mut self, expected: &Event, clause: &'static str) -> Result<(), QueryError> {
        if !self.check(expected) {
            return Err(QueryError::syntax(
                clause,
                format!(
                    "expected {}, got {}",
                    expected.describe(),
                    self.current().describe()
                ),
                self.position(),
            ));
        }
        self.advance()
    }

    /// Consumes the value under the cursor, including any children.
    fn skip_value(&mut self) -> Result<(), QueryError> {
        let mut depth = 0usize;
        loop {
            match self.current() {
                Event::StartObject | Event::StartArray => depth += 1,
                Event::EndObject | Event::EndArray if depth > 0 => depth -= 1,
                Event::FieldName(_) if depth > 0 => {}
                event if event.is_scalar() => {}
                event => {
                    return Err(QueryError::malformed(
                        format!("expected a value, got {}", event.describe()),
                        self.position(),
                    ));
                }
            }
            self.advance()?;
            if depth == 0 {
                return Ok(());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Before the single top-level value
    Start,
    /// Just after `{`: a field name or `}` follows
    ObjectFirst,
    /// Just after a field name: `:` and a value follow
    FieldValue,
    /// Just after `[`: a value or `]` follows
    ArrayFirst,
    /// After a complete value: `,`, a closing delimiter, or end of input
    AfterValue,
    Done,
}

/// [`TokenStream`] over JSON source text.
///
/// Validates the structure as it goes (member separators, balanced
/// containers, a single top-level value) and reports violations as
/// [`QueryError::MalformedContent`].
pub struct JsonStream {
    lexer: Lexer,
    stack: Vec<Container>,
    state: State,
    current: Event,
    position: Position,
}

impl JsonStream {
    /// Creates a stream positioned on the first event of `input`.
    pub fn new(input: &str) -> Result<Self, QueryError> {
        let mut stream = JsonStream {
            lexer: Lexer::new(input),
            stack: Vec::new(),
            state: State::Start,
            current: Event::Eof,
            position: Position::new(1, 1),
        };
        stream.advance()?;
        Ok(stream)
    }

    fn next_token(&mut self) -> Result<(Token, Position), QueryError> {
        Ok(self.lexer.next_token()?)
    }

    fn unexpected(token: &Token, wanted: &str, position: Position) -> QueryError {
        QueryError::malformed(
            format!("expected {}, got {}", wanted, token.describe()),
            position,
        )
    }

    /// Turns a token that starts a value into the matching event.
    fn begin_value(&mut self, token: Token, position: Position) -> Result<Event, QueryError> {
        let event = match token {
            Token::LBrace => {
                self.stack.push(Container::Object);
                self.state = State::ObjectFirst;
                return Ok(Event::StartObject);
            }
            Token::LBracket => {
                self.stack.push(Container::Array);
                self.state = State::ArrayFirst;
                return Ok(Event::StartArray);
            }
            Token::String(s) => Event::String(s),
            Token::Integer(n) => Event::Integer(n),
            Token::Float(n) => Event::Float(n),
            Token::Boolean(b) => Event::Boolean(b),
            Token::Null => Event::Null,
            other => return Err(Self::unexpected(&other, "a value", position)),
        };
        self.state = State::AfterValue;
        Ok(event)
    }

    fn close(&mut self, container: Container) -> Event {
        self.stack.pop();
        self.state = State::AfterValue;
        match container {
            Container::Object => Event::EndObject,
            Container::Array => Event::EndArray,
        }
    }

    fn field_name(&mut self, token: Token, position: Position) -> Result<Event, QueryError> {
        match token {
            Token::String(name) => {
                self.state = State::FieldValue;
                Ok(Event::FieldName(name))
            }
            other => Err(Self::unexpected(&other, "a field name", position)),
        }
    }

    fn read_event(&mut self) -> Result<(Event, Position), QueryError> {
        let (token, position) = self.next_token()?;

        let event = match self.state {
            State::Start => self.begin_value(token, position)?,
            State::ObjectFirst => match token {
                Token::RBrace => self.close(Container::Object),
                token => self.field_name(token, position)?,
            },
            State::FieldValue => {
                if token != Token::Colon {
                    return Err(Self::unexpected(&token, "':'", position));
                }
                let (token, position) = self.next_token()?;
                let event = self.begin_value(token, position)?;
                return Ok((event, position));
            }
            State::ArrayFirst => match token {
                Token::RBracket => self.close(Container::Array),
                token => self.begin_value(token, position)?,
            },
            State::AfterValue => match (self.stack.last().copied(), token) {
                (None, Token::Eof) => {
                    self.state = State::Done;
                    Event::Eof
                }
                (None, token) => return Err(Self::unexpected(&token, "end of input", position)),
                (Some(Container::Object), Token::RBrace) => self.close(Container::Object),
                (Some(Container::Array), Token::RBracket) => self.close(Container::Array),
                (Some(Container::Object), Token::Comma) => {
                    let (token, position) = self.next_token()?;
                    let event = self.field_name(token, position)?;
                    return Ok((event, position));
                }
                (Some(Container::Array), Token::Comma) => {
                    let (token, position) = self.next_token()?;
                    let event = self.begin_value(token, position)?;
                    return Ok((event, position));
                }
                (Some(Container::Object), token) => {
                    return Err(Self::unexpected(&token, "',' or '}'", position));
                }
                (Some(Container::Array), token) => {
                    return Err(Self::unexpected(&token, "',' or ']'", position));
                }
            },
            State::Done => Event::Eof,
        };

        Ok((event, position))
    }
}

impl TokenStream for JsonStream {
    fn current(&self) -> &Event {
        &self.current
    }

    fn position(&self) -> Position {
        self.position
    }

    fn advance(&mut self) -> Result<(), QueryError> {
        let (event, position) = self.read_event()?;
        self.current = event;
        self.position = position;
        Ok(())
    }
}
