//! Records and export payloads
//!
//! A [`Record`] is one source row rendered as a JSON object. An
//! [`ExportPayload`] is the raw blob the source store hands back for a table,
//! either already in memory or behind a reader that must be drained first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// One source row as a JSON object
///
/// Records are heterogeneous across tables. The engine only ever mutates a
/// record to attach its identity field and the table-origin tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the value of a field, if present
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Returns true if the record has a field with this name
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the record and returns it as a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Converts a JSON object into a record, handing back any other value
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Reader behind a streamed export payload
pub type PayloadReader = Pin<Box<dyn AsyncRead + Send>>;

/// Raw exported payload for one table
///
/// Produced once per table per migration attempt and consumed immediately by
/// the decoder.
pub enum ExportPayload {
    /// Payload already materialized as text
    Inline(String),

    /// Large-object handle that has to be read to completion before parsing
    Stream(PayloadReader),
}

impl ExportPayload {
    /// Wraps any async reader as a streamed payload
    pub fn from_reader(reader: impl AsyncRead + Send + 'static) -> Self {
        Self::Stream(Box::pin(reader))
    }
}

impl From<String> for ExportPayload {
    fn from(text: String) -> Self {
        Self::Inline(text)
    }
}

impl From<&str> for ExportPayload {
    fn from(text: &str) -> Self {
        Self::Inline(text.to_string())
    }
}

impl fmt::Debug for ExportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(text) => f
                .debug_struct("Inline")
                .field("len", &text.len())
                .finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
