//! Payload decoding
//!
//! Turns the raw payload exported for a table into records. The top-level
//! value must be a JSON array whose elements are all objects.

use crate::domain::{ExportPayload, MigrationError, Record};
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// A payload that is not a JSON array of objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    /// Table the payload was exported for
    pub table: String,
    /// Parser message or the offending element
    pub message: String,
}

impl DecodeError {
    fn new(table: &str, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

impl From<DecodeError> for MigrationError {
    fn from(err: DecodeError) -> Self {
        MigrationError::Decode {
            table: err.table,
            message: err.message,
        }
    }
}

/// Decodes an exported payload into records
///
/// Streamed payloads are read to completion first. Records keep the order
/// they have in the payload.
///
/// # Errors
///
/// Returns [`DecodeError`] if the stream cannot be read, the text is not JSON,
/// the top-level value is not an array, or an element is not an object.
pub async fn decode(table: &str, payload: ExportPayload) -> Result<Vec<Record>, DecodeError> {
    let text = match payload {
        ExportPayload::Inline(text) => text,
        ExportPayload::Stream(mut reader) => {
            let mut text = String::new();
            reader
                .read_to_string(&mut text)
                .await
                .map_err(|e| DecodeError::new(table, format!("failed to read payload: {e}")))?;
            text
        }
    };

    decode_str(table, &text)
}

/// Decodes a payload that is already in memory
pub fn decode_str(table: &str, text: &str) -> Result<Vec<Record>, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::new(table, e.to_string()))?;

    let Value::Array(elements) = value else {
        return Err(DecodeError::new(
            table,
            format!("expected a JSON array, found {}", kind_of(&value)),
        ));
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            Record::try_from(element).map_err(|other| {
                DecodeError::new(
                    table,
                    format!("element {index} is {}, expected an object", kind_of(&other)),
                )
            })
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
