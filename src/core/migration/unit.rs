//! Migration of a single table
//!
//! fetch → decode → resolve identities → reconcile, producing exactly one
//! outcome. Failures at any step are classified into the outcome; nothing is
//! retried.

use super::outcome::TableMigrationOutcome;
use crate::adapters::database::SourceStore;
use crate::core::decode;
use crate::core::identity::{IdentifiedRecord, IdentityResolver};
use crate::core::reconcile::{ReconciliationPolicy, RecordReconciler, TableProgress};
use crate::domain::{MigrationError, Record, TableName};
use std::sync::Arc;
use std::time::Instant;

/// Records prepared for a snapshot file, with the table's outcome
#[derive(Debug)]
pub struct TableExport {
    pub outcome: TableMigrationOutcome,
    pub records: Vec<Record>,
}

/// Runs one table through the pipeline
#[derive(Clone)]
pub struct TableMigrationUnit {
    source: Arc<dyn SourceStore>,
    resolver: Arc<IdentityResolver>,
    reconciler: Arc<RecordReconciler>,
    policy: ReconciliationPolicy,
}

impl TableMigrationUnit {
    pub fn new(
        source: Arc<dyn SourceStore>,
        resolver: Arc<IdentityResolver>,
        reconciler: Arc<RecordReconciler>,
        policy: ReconciliationPolicy,
    ) -> Self {
        Self {
            source,
            resolver,
            reconciler,
            policy,
        }
    }

    /// Migrates `table` into the target store
    pub async fn migrate(&self, table: &TableName) -> TableMigrationOutcome {
        self.migrate_tracked(table, &TableProgress::new()).await
    }

    /// Migrates `table`, recording decoded and committed counts in `progress`
    pub async fn migrate_tracked(
        &self,
        table: &TableName,
        progress: &TableProgress,
    ) -> TableMigrationOutcome {
        let start = Instant::now();
        tracing::info!(table = %table, policy = %self.policy, "Starting migration for table: {}", table);

        let identified = match self.fetch_and_identify(table, progress).await {
            Ok(records) => records,
            Err(e) => return self.failed(table, e, 0, start),
        };
        let exported = identified.len();

        match self
            .reconciler
            .reconcile_tracked(table, identified, self.policy, progress)
            .await
        {
            Ok(counts) => {
                tracing::info!(
                    table = %table,
                    exported_records = exported,
                    inserted_records = counts.written,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Table migrated"
                );
                TableMigrationOutcome::success(table, exported, counts.written, start.elapsed())
            }
            Err(e) => self.failed(table, e.into(), exported, start),
        }
    }

    /// Prepares `table`'s records for a snapshot file without touching the target
    ///
    /// Records carry the identity field and table tag they would be written with.
    pub async fn export(&self, table: &TableName) -> TableExport {
        self.export_tracked(table, &TableProgress::new()).await
    }

    /// Same as [`TableMigrationUnit::export`], recording the decoded count in
    /// `progress`
    pub async fn export_tracked(&self, table: &TableName, progress: &TableProgress) -> TableExport {
        let start = Instant::now();
        tracing::info!(table = %table, "Starting export for table: {}", table);

        match self.fetch_and_identify(table, progress).await {
            Ok(identified) => {
                let records: Vec<Record> = self
                    .reconciler
                    .prepare(table, identified, self.policy)
                    .into_iter()
                    .map(|(_, record)| record)
                    .collect();
                let count = records.len();
                TableExport {
                    outcome: TableMigrationOutcome::success(table, count, count, start.elapsed()),
                    records,
                }
            }
            Err(e) => TableExport {
                outcome: self.failed(table, e, 0, start),
                records: Vec::new(),
            },
        }
    }

    async fn fetch_and_identify(
        &self,
        table: &TableName,
        progress: &TableProgress,
    ) -> Result<Vec<IdentifiedRecord>, MigrationError> {
        let payload = self
            .source
            .fetch_export(table)
            .await
            .map_err(|e| MigrationError::Source {
                table: table.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| MigrationError::NoData {
                table: table.to_string(),
            })?;

        let records = decode::decode(table.as_str(), payload).await?;
        tracing::debug!(table = %table, records = records.len(), "Payload decoded");
        progress.set_exported(records.len());

        Ok(self.resolver.identify(records, table))
    }

    fn failed(
        &self,
        table: &TableName,
        error: MigrationError,
        exported: usize,
        start: Instant,
    ) -> TableMigrationOutcome {
        match &error {
            MigrationError::NoData { .. } => {
                tracing::info!(table = %table, "No data found for table {}", table);
            }
            MigrationError::Decode { message, .. } => {
                tracing::warn!(table = %table, error = %message, "Error decoding JSON for table {}", table);
            }
            other => {
                tracing::error!(table = %table, error = %other, "Error during migration for table {}", table);
            }
        }
        TableMigrationOutcome::failed(table, error, exported, start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemorySource, MemoryTarget};
    use crate::core::identity::{FallbackStrategy, IdentityRule};
    use crate::core::migration::outcome::OutcomeStatus;
    use crate::core::reconcile::ReconcileSettings;
    use serde_json::json;

    fn unit(source: MemorySource, target: Arc<MemoryTarget>, policy: ReconciliationPolicy) -> TableMigrationUnit {
        let resolver = IdentityResolver::new(
            vec![IdentityRule::any_table("cliente_id")],
            FallbackStrategy::ContentHash,
        );
        TableMigrationUnit::new(
            Arc::new(source),
            Arc::new(resolver),
            Arc::new(RecordReconciler::new(target, ReconcileSettings::default())),
            policy,
        )
    }

    fn table(name: &str) -> TableName {
        TableName::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_migrate_success() {
        let target = Arc::new(MemoryTarget::new());
        let source = MemorySource::new().with_payload("tb_clients", r#"[{"cliente_id":"5","nome":"Ana"}]"#);

        let outcome = unit(source, target.clone(), ReconciliationPolicy::InsertIfAbsent)
            .migrate(&table("tb_clients"))
            .await;

        assert_eq!(outcome.status(), OutcomeStatus::Success);
        assert_eq!(outcome.exported_records(), 1);
        assert_eq!(outcome.inserted_records(), 1);
        let doc = target.get("oracle_energy", "tb_clients_5").await.unwrap();
        assert_eq!(doc.get("nome"), Some(&json!("Ana")));
    }

    #[tokio::test]
    async fn test_migrate_no_data() {
        let outcome = unit(MemorySource::new(), Arc::new(MemoryTarget::new()), ReconciliationPolicy::Upsert)
            .migrate(&table("tb_empty"))
            .await;
        assert_eq!(outcome.status(), OutcomeStatus::NoData);
        assert_eq!(outcome.failure().map(MigrationError::status_code), Some(404));
    }

    #[tokio::test]
    async fn test_migrate_decode_error() {
        let source = MemorySource::new().with_payload("tb_bad", "{not valid json");
        let outcome = unit(source, Arc::new(MemoryTarget::new()), ReconciliationPolicy::Upsert)
            .migrate(&table("tb_bad"))
            .await;
        assert_eq!(outcome.status(), OutcomeStatus::DecodeError);
        assert_eq!(outcome.exported_records(), 0);
    }

    #[tokio::test]
    async fn test_migrate_source_failure_is_write_error() {
        let source = MemorySource::new().with_failure("tb_x", "procedure raised");
        let outcome = unit(source, Arc::new(MemoryTarget::new()), ReconciliationPolicy::Upsert)
            .migrate(&table("tb_x"))
            .await;
        assert_eq!(outcome.status(), OutcomeStatus::WriteError);
        assert!(outcome.error().unwrap().contains("procedure raised"));
    }

    #[tokio::test]
    async fn test_export_prepares_documents_without_writing() {
        let target = Arc::new(MemoryTarget::new());
        let source = MemorySource::new().with_payload("tb_clients", r#"[{"cliente_id":"5"}]"#);

        let export = unit(source, target.clone(), ReconciliationPolicy::Upsert)
            .export(&table("tb_clients"))
            .await;

        assert!(export.outcome.is_success());
        assert_eq!(export.records.len(), 1);
        assert_eq!(export.records[0].get("_id"), Some(&json!("5")));
        assert_eq!(target.count("tb_clients").await, 0);
    }
}
