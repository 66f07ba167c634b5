//! Deferred content buffer.
//!
//! When a nested clause's body arrives before its `path`, the body cannot be
//! parsed yet and the stream cannot be rewound. [`capture`] copies the body
//! into an owned [`BufferedContent`]; once the path is known,
//! [`BufferedContent::replay`] yields a fresh [`ReplayStream`] that the query
//! parser reads exactly as it would have read the original.

use std::{fmt, rc::Rc};

use crate::{
    error::QueryError,
    lexer::Position,
    stream::{Event, SpannedEvent, TokenStream},
};

/// Which body of a nested clause was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Query,
    Filter,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Query => write!(f, "query"),
            ContentKind::Filter => write!(f, "filter"),
        }
    }
}

/// Verbatim capture of one sub-document.
///
/// The captured events end with a trailing [`Event::Eof`], so a replay behaves
/// like a stream over a standalone document.
#[derive(Debug, Clone)]
pub struct BufferedContent {
    kind: ContentKind,
    events: Rc<[SpannedEvent]>,
}

impl BufferedContent {
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Captured events, including the trailing end-of-input marker.
    pub fn events(&self) -> &[SpannedEvent] {
        &self.events
    }

    /// Fresh stream positioned on the first captured event.
    pub fn replay(&self) -> ReplayStream {
        ReplayStream {
            events: Rc::clone(&self.events),
            index: 0,
        }
    }
}

/// Copies the object under the cursor into a [`BufferedContent`].
///
/// On success the stream is left on the event following the object.
pub fn capture(
    stream: &mut dyn TokenStream,
    kind: ContentKind,
) -> Result<BufferedContent, QueryError> {
    if !stream.check(&Event::StartObject) {
        return Err(QueryError::malformed(
            format!(
                "[nested] expected an object for [{}], got {}",
                kind,
                stream.current().describe()
            ),
            stream.position(),
        ));
    }

    let mut events = Vec::new();
    let mut depth = 0usize;

    loop {
        match stream.current() {
            Event::StartObject | Event::StartArray => depth += 1,
            Event::EndObject | Event::EndArray => depth -= 1,
            Event::Eof => {
                return Err(QueryError::malformed(
                    format!("[nested] unexpected end of input inside [{}]", kind),
                    stream.position(),
                ));
            }
            _ => {}
        }
        events.push(SpannedEvent {
            event: stream.current().clone(),
            position: stream.position(),
        });
        stream.advance()?;

        if depth == 0 {
            break;
        }
    }

    events.push(SpannedEvent {
        event: Event::Eof,
        position: stream.position(),
    });

    tracing::debug!(%kind, events = events.len(), "captured nested content");

    Ok(BufferedContent {
        kind,
        events: events.into(),
    })
}

static END: Event = Event::Eof;

/// [`TokenStream`] over captured events.
#[derive(Debug, Clone)]
pub struct ReplayStream {
    events: Rc<[SpannedEvent]>,
    index: usize,
}

impl TokenStream for ReplayStream {
    fn current(&self) -> &Event {
        self.events
            .get(self.index)
            .map(|e| &e.event)
            .unwrap_or(&END)
    }

    fn position(&self) -> Position {
        self.events
            .get(self.index)
            .or_else(|| self.events.last())
            .map(|e| e.position)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Result<(), QueryError> {
        if self.index + 1 < self.events.len() {
            self.index += 1;
        }
        Ok(())
    }
}
