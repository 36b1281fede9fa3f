//! PostgreSQL adapter implementing the target store trait
//!
//! Documents of every collection share one JSONB table keyed by
//! `(collection, id)`.

use crate::adapters::database::traits::{BulkInsertFailure, BulkInsertResult, TargetStore};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::domain::{FerryError, Record, Result};
use async_trait::async_trait;
use std::sync::Arc;

const SCHEMA_SQL: &str = include_str!("../../../migrations/001_documents.sql");

/// PostgreSQL document target
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    table: String,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter writing to the configured documents table
    pub fn new(client: PostgreSQLClient) -> Self {
        let table = client.config().documents_table.clone();
        Self {
            client: Arc::new(client),
            table,
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    /// Creates the documents table and its index if they don't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.client.get_connection().await?;

        client
            .batch_execute(&schema_sql(&self.table))
            .await
            .map_err(|e| FerryError::Database(format!("Failed to execute migration: {e}")))?;

        tracing::info!(table = %self.table, "PostgreSQL document schema initialized");
        Ok(())
    }
}

fn schema_sql(table: &str) -> String {
    SCHEMA_SQL.replace("{documents_table}", table)
}

#[async_trait]
impl TargetStore for PostgreSQLAdapter {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE collection = $1 AND id = $2)",
            self.table
        );

        let rows = self.client.query(&query, &[&collection, &id]).await?;

        Ok(rows.first().map(|row| row.get::<_, bool>(0)).unwrap_or(false))
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<(String, Record)>,
    ) -> Result<BulkInsertResult> {
        let client = self.client.get_connection().await?;
        let insert_query = format!(
            "INSERT INTO {} (collection, id, document) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO NOTHING",
            self.table
        );
        let statement = client
            .prepare(&insert_query)
            .await
            .map_err(|e| FerryError::Database(format!("Failed to prepare insert: {e}")))?;

        let mut result = BulkInsertResult::default();

        for (id, document) in documents {
            let document = document.into_value();
            let rejection = match client.execute(&statement, &[&collection, &id, &document]).await {
                Ok(1) => None,
                Ok(_) => Some("document already exists".to_string()),
                Err(e) => Some(format!("Database insert failed: {e}")),
            };

            match rejection {
                None => result.success_count += 1,
                Some(error) => {
                    tracing::warn!(collection = %collection, id = %id, error = %error, "Insert rejected");
                    result.failure_count += 1;
                    result.failures.push(BulkInsertFailure {
                        document_id: id,
                        error,
                        is_throttled: false,
                    });
                    break;
                }
            }
        }

        tracing::debug!(
            collection = %collection,
            inserted = result.success_count,
            failed = result.failure_count,
            "PostgreSQL insert batch finished"
        );

        Ok(result)
    }

    async fn upsert(&self, collection: &str, id: &str, document: Record) -> Result<()> {
        let upsert_query = format!(
            "INSERT INTO {table} (collection, id, document) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO UPDATE SET \
             document = {table}.document || EXCLUDED.document, updated_at = NOW()",
            table = self.table
        );
        let document = document.into_value();

        self.client
            .execute(&upsert_query, &[&collection, &id, &document])
            .await
            .map(|_| ())
    }

    async fn release(&self) -> Result<()> {
        self.client.close();
        Ok(())
    }
}
