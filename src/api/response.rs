//! Responses returned by the request layer

use crate::domain::MigrationError;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Response payload
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// JSON document
    Json(Value),
    /// Snapshot file to hand to the caller as a download
    File(PathBuf),
}

/// Status code plus body, independent of any transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
    /// Error behind a non-2xx response
    pub failure: Option<MigrationError>,
}

impl ApiResponse {
    /// 200 with a JSON body
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Json(body),
            failure: None,
        }
    }

    /// 200 with a file attachment
    pub fn file(path: PathBuf) -> Self {
        Self {
            status: 200,
            body: ResponseBody::File(path),
            failure: None,
        }
    }

    /// `{"error": ...}` with the status code of `error`
    pub fn error(error: &MigrationError) -> Self {
        Self {
            status: error.status_code(),
            body: ResponseBody::Json(json!({ "error": error.to_string() })),
            failure: Some(error.clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// JSON body, if any
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::File(_) => None,
        }
    }

    /// Attached file, if any
    pub fn file_path(&self) -> Option<&PathBuf> {
        match &self.body {
            ResponseBody::File(path) => Some(path),
            ResponseBody::Json(_) => None,
        }
    }
}
