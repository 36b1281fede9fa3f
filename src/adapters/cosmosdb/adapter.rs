//! Cosmos DB adapter implementing the target store trait

use super::bulk::{write_with_retry, WriteKind};
use super::client::{is_throttled, CosmosDbClient};
use crate::adapters::database::traits::{BulkInsertFailure, BulkInsertResult, TargetStore};
use crate::domain::{Record, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Cosmos DB target store
pub struct CosmosDbAdapter {
    client: Arc<CosmosDbClient>,
}

impl CosmosDbAdapter {
    /// Create a new Cosmos DB adapter
    pub fn new(client: CosmosDbClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<CosmosDbClient> {
        &self.client
    }
}

#[async_trait]
impl TargetStore for CosmosDbAdapter {
    fn name(&self) -> &'static str {
        "cosmosdb"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self.client.read_document(collection, id).await?.is_some())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<(String, Record)>,
    ) -> Result<BulkInsertResult> {
        let container = self.client.container(collection).await?;
        let mut result = BulkInsertResult::default();

        for (id, document) in documents {
            let document = document.into_value();
            match write_with_retry(
                &container,
                &id,
                &document,
                WriteKind::Create,
                self.client.max_retries(),
            )
            .await
            {
                Ok(()) => result.success_count += 1,
                Err(e) => {
                    let error = e.to_string();
                    tracing::warn!(collection = %collection, id = %id, error = %error, "Insert rejected");
                    result.failure_count += 1;
                    result.failures.push(BulkInsertFailure {
                        document_id: id,
                        is_throttled: is_throttled(&error),
                        error,
                    });
                    break;
                }
            }
        }

        tracing::debug!(
            collection = %collection,
            inserted = result.success_count,
            failed = result.failure_count,
            "Cosmos DB insert batch finished"
        );

        Ok(result)
    }

    async fn upsert(&self, collection: &str, id: &str, document: Record) -> Result<()> {
        // upsert_item replaces whole documents; merge with the stored one first
        let merged = match self.client.read_document(collection, id).await? {
            Some(Value::Object(mut stored)) => {
                for (field, value) in document.as_map() {
                    stored.insert(field.clone(), value.clone());
                }
                Value::Object(stored)
            }
            _ => document.into_value(),
        };

        let container = self.client.container(collection).await?;
        write_with_retry(
            &container,
            id,
            &merged,
            WriteKind::Upsert,
            self.client.max_retries(),
        )
        .await
    }
}
