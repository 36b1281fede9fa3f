//! PostgreSQL export source
//!
//! Runs the export procedure for a table and reads back the newest payload
//! it logged.

use crate::adapters::database::traits::SourceStore;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::SourceConfig;
use crate::domain::{ExportPayload, FerryError, Result, TableName};
use async_trait::async_trait;

/// Relational source backed by an export procedure and its log table
pub struct PostgreSQLSource {
    client: PostgreSQLClient,
    call_sql: String,
    latest_sql: String,
}

impl PostgreSQLSource {
    /// Create a source from the client and the `[source]` section
    pub fn new(client: PostgreSQLClient, source: &SourceConfig) -> Self {
        Self {
            client,
            call_sql: call_statement(&source.export_procedure),
            latest_sql: latest_export_query(&source.export_log_table),
        }
    }
}

fn call_statement(procedure: &str) -> String {
    format!("CALL {procedure}($1)")
}

fn latest_export_query(log_table: &str) -> String {
    format!(
        "SELECT json_data::text FROM {log_table} WHERE table_name = $1 \
         ORDER BY export_date DESC LIMIT 1"
    )
}

#[async_trait]
impl SourceStore for PostgreSQLSource {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn fetch_export(&self, table: &TableName) -> Result<Option<ExportPayload>> {
        let client = self.client.get_connection().await?;
        let name = table.as_str();

        tracing::debug!(table = %table, "Running export procedure");
        client.execute(&self.call_sql, &[&name]).await.map_err(|e| {
            FerryError::Database(format!("Export procedure failed for table {table}: {e}"))
        })?;

        let row = client
            .query_opt(&self.latest_sql, &[&name])
            .await
            .map_err(|e| FerryError::Database(format!("Failed to read export log for table {table}: {e}")))?;

        let payload = row
            .and_then(|row| row.get::<_, Option<String>>(0))
            .map(ExportPayload::Inline);

        Ok(payload)
    }

    async fn release(&self) -> Result<()> {
        self.client.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_use_configured_names() {
        assert_eq!(
            call_statement("erp.export_table_to_json"),
            "CALL erp.export_table_to_json($1)"
        );

        let query = latest_export_query("json_export_log");
        assert!(query.starts_with("SELECT json_data::text FROM json_export_log"));
        assert!(query.contains("ORDER BY export_date DESC LIMIT 1"));
    }
}
