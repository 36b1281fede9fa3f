//! Domain error types
//!
//! This module defines the error hierarchy for Ferry. Adapter failures are
//! reported as [`FerryError`]; the migration engine classifies them into
//! [`MigrationError`], which decides the per-table outcome and the status code
//! returned to the caller. No third-party error types leak through.

use thiserror::Error;

/// Main Ferry error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cosmos DB-related errors
    #[error("Cosmos DB error: {0}")]
    CosmosDb(#[from] CosmosDbError),

    /// Database-related errors (generic)
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Migration engine errors
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Cosmos DB-specific errors
///
/// Errors that occur when interacting with Azure Cosmos DB.
#[derive(Debug, Error)]
pub enum CosmosDbError {
    /// Failed to connect to Cosmos DB
    #[error("Failed to connect to Cosmos DB: {0}")]
    ConnectionFailed(String),

    /// Failed to create database
    #[error("Failed to create database: {0}")]
    DatabaseCreationFailed(String),

    /// Failed to create container
    #[error("Failed to create container: {0}")]
    ContainerCreationFailed(String),

    /// Failed to insert document
    #[error("Failed to insert document: {0}")]
    InsertFailed(String),

    /// Failed to update document
    #[error("Failed to update document: {0}")]
    UpdateFailed(String),

    /// Failed to query documents
    #[error("Failed to query documents: {0}")]
    QueryFailed(String),

    /// Failed to deserialize response
    #[error("Failed to deserialize response: {0}")]
    DeserializationFailed(String),
}

/// Migration engine errors
///
/// Each variant maps onto one error kind of the migration taxonomy. For a
/// single-table request the variant decides the status code; in a batch every
/// variant except [`MigrationError::Connection`] is recorded in the table's
/// outcome instead of being returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MigrationError {
    /// Missing or invalid request input
    #[error("{0}")]
    Validation(String),

    /// The source holds no exportable snapshot for the table
    #[error("No data found for table {table}")]
    NoData { table: String },

    /// The exported payload is not a JSON array of objects
    #[error("Error parsing JSON for table {table}: {message}")]
    Decode { table: String, message: String },

    /// A target store write failed; `written` records were already committed
    #[error("Write failed for table {table} after {written} record(s): {message}")]
    Write {
        table: String,
        written: usize,
        message: String,
    },

    /// The export procedure or the export log query failed
    #[error("Export failed for table {table}: {message}")]
    Source { table: String, message: String },

    /// The table did not finish within the per-table timeout
    #[error("Migration of table {table} timed out after {seconds}s")]
    Timeout { table: String, seconds: u64 },

    /// The run was interrupted before the table finished
    #[error("Migration of table {table} was cancelled")]
    Cancelled { table: String },

    /// Either store is unreachable; fatal for the whole invocation
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// Writing a snapshot file failed
    #[error("Snapshot export failed: {0}")]
    Snapshot(String),

    /// The table task aborted unexpectedly
    #[error("Migration of table {table} aborted: {message}")]
    Internal { table: String, message: String },
}

impl MigrationError {
    /// Status code reported to the caller of a single-table request
    pub fn status_code(&self) -> u16 {
        match self {
            MigrationError::Validation(_) => 400,
            MigrationError::NoData { .. } => 404,
            _ => 500,
        }
    }

    /// Returns true for the errors that must abort a whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, MigrationError::Connection(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for FerryError {
    fn from(err: std::io::Error) -> Self {
        FerryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FerryError {
    fn from(err: serde_json::Error) -> Self {
        FerryError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for FerryError {
    fn from(err: toml::de::Error) -> Self {
        FerryError::Configuration(format!("TOML parse error: {err}"))
    }
}
