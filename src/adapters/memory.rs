//! In-process stores
//!
//! [`MemoryTarget`] backs `database_target = "memory"`, which is useful for
//! dry runs against a real source. [`MemorySource`] serves payloads registered
//! up front and is meant for embedding the engine.

use crate::adapters::database::{BulkInsertFailure, BulkInsertResult, SourceStore, TargetStore};
use crate::domain::{ExportPayload, FerryError, Record, Result, TableName};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

type Collection = BTreeMap<String, Record>;

/// Document target held in memory
#[derive(Debug, Default)]
pub struct MemoryTarget {
    collections: RwLock<HashMap<String, Collection>>,
    rejected_ids: HashSet<String>,
}

impl MemoryTarget {
    /// Creates an empty target
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses writes of the listed identities, as a constraint violation would
    pub fn with_rejected_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rejected_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Returns a copy of one document
    pub async fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Identities stored in a collection, sorted
    pub async fn ids(&self, collection: &str) -> Vec<String> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Stores a document directly, bypassing the write checks
    pub async fn seed(&self, collection: &str, id: impl Into<String>, document: Record) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.into(), document);
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id)))
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<(String, Record)>,
    ) -> Result<BulkInsertResult> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let mut result = BulkInsertResult::default();

        for (id, document) in documents {
            let error = if self.rejected_ids.contains(&id) {
                Some("document rejected by target".to_string())
            } else if docs.contains_key(&id) {
                Some("document with this id already exists".to_string())
            } else {
                None
            };

            if let Some(error) = error {
                result.failure_count += 1;
                result.failures.push(BulkInsertFailure {
                    document_id: id,
                    error,
                    is_throttled: false,
                });
                break;
            }

            docs.insert(id, document);
            result.success_count += 1;
        }

        Ok(result)
    }

    async fn upsert(&self, collection: &str, id: &str, document: Record) -> Result<()> {
        if self.rejected_ids.contains(id) {
            return Err(FerryError::Database(format!(
                "document {id} rejected by target"
            )));
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) => {
                for (field, value) in document.as_map() {
                    existing.insert(field.clone(), value.clone());
                }
            }
            None => {
                docs.insert(id.to_string(), document);
            }
        }
        Ok(())
    }
}

/// Source serving payloads registered ahead of time
#[derive(Debug, Default)]
pub struct MemorySource {
    payloads: HashMap<String, std::result::Result<String, String>>,
}

impl MemorySource {
    /// Creates a source with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the payload exported for `table`
    pub fn with_payload(mut self, table: &str, payload: impl Into<String>) -> Self {
        self.payloads.insert(table.to_string(), Ok(payload.into()));
        self
    }

    /// Makes the export of `table` fail with `message`
    pub fn with_failure(mut self, table: &str, message: impl Into<String>) -> Self {
        self.payloads.insert(table.to_string(), Err(message.into()));
        self
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_export(&self, table: &TableName) -> Result<Option<ExportPayload>> {
        match self.payloads.get(table.as_str()) {
            Some(Ok(text)) => Ok(Some(ExportPayload::Inline(text.clone()))),
            Some(Err(message)) => Err(FerryError::Database(message.clone())),
            None => Ok(None),
        }
    }
}
