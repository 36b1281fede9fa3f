//! Store abstraction traits
//!
//! The migration engine talks to the relational source and the document
//! target only through these traits.

use crate::domain::{ExportPayload, Record, Result, TableName};
use async_trait::async_trait;
use std::sync::Arc;

/// Result of a bulk insert operation
#[derive(Debug, Clone, Default)]
pub struct BulkInsertResult {
    /// Number of documents committed
    pub success_count: usize,

    /// Number of documents that were rejected
    pub failure_count: usize,

    /// Details of rejected documents
    pub failures: Vec<BulkInsertFailure>,
}

impl BulkInsertResult {
    /// Result for a call that committed every document
    pub fn all_inserted(count: usize) -> Self {
        Self {
            success_count: count,
            ..Self::default()
        }
    }
}

/// Details of a rejected document
#[derive(Debug, Clone)]
pub struct BulkInsertFailure {
    /// Identity of the rejected document
    pub document_id: String,

    /// Error message
    pub error: String,

    /// Whether the failure was due to throttling
    pub is_throttled: bool,
}

/// Relational source of table snapshots
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Short name used in logs (e.g. "postgresql")
    fn name(&self) -> &'static str;

    /// Test the source connection
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Runs the export for `table` and returns the most recent payload
    ///
    /// Returns `Ok(None)` when the export log holds nothing for the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the export procedure or the log query fails.
    async fn fetch_export(&self, table: &TableName) -> Result<Option<ExportPayload>>;

    /// Releases pooled connections
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Document-oriented target store
///
/// Documents live in named collections and are keyed by their identity.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Short name used in logs (e.g. "cosmosdb")
    fn name(&self) -> &'static str;

    /// Test the target connection
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Returns true if `collection` holds a document with identity `id`
    async fn exists(&self, collection: &str, id: &str) -> Result<bool>;

    /// Inserts documents in order, stopping at the first rejected one
    ///
    /// `documents` pairs each identity with its document. Documents before
    /// the rejected one stay committed and are counted in `success_count`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call failed without a per-document verdict.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<(String, Record)>,
    ) -> Result<BulkInsertResult>;

    /// Inserts the document, or merges its fields into the existing one
    ///
    /// Top-level fields of `document` overwrite stored ones; stored fields
    /// absent from `document` are kept.
    async fn upsert(&self, collection: &str, id: &str, document: Record) -> Result<()>;

    /// Releases pooled connections
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Handles acquired for one invocation
#[derive(Clone)]
pub struct StoreHandles {
    /// Source store
    pub source: Arc<dyn SourceStore>,
    /// Target store
    pub target: Arc<dyn TargetStore>,
}

impl StoreHandles {
    /// Releases both stores
    ///
    /// Release failures are logged; they never change a migration result.
    pub async fn release(self) {
        if let Err(e) = self.source.release().await {
            tracing::warn!(store = self.source.name(), error = %e, "Failed to release source store");
        }
        if let Err(e) = self.target.release().await {
            tracing::warn!(store = self.target.name(), error = %e, "Failed to release target store");
        }
        tracing::debug!("Store handles released");
    }
}

/// Supplies store handles to the orchestrator
///
/// `acquire` is called once per invocation; the orchestrator releases the
/// handles when the invocation ends.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Connects to both stores
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be reached.
    async fn acquire(&self) -> Result<StoreHandles>;
}
