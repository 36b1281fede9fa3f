//! Record reconciliation against the target store
//!
//! Two policies are supported:
//!
//! - **insert_if_absent**: every table shares one collection, documents are
//!   keyed by `<table>_<identity>`, and documents that already exist are left
//!   untouched.
//! - **upsert**: each table has its own collection, documents are keyed by the
//!   bare identity, and existing documents have their fields overwritten.
//!
//! Both are idempotent: running the same payload twice leaves the target in
//! the same state as running it once.

use crate::adapters::database::TargetStore;
use crate::config::FerryConfig;
use crate::core::identity::IdentifiedRecord;
use crate::domain::{FerryError, MigrationError, Record, Result, TableName};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// How records are written to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconciliationPolicy {
    /// Skip records whose namespaced identity already exists
    #[default]
    InsertIfAbsent,
    /// Write every record, merging into existing documents
    Upsert,
}

impl FromStr for ReconciliationPolicy {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert_if_absent" => Ok(Self::InsertIfAbsent),
            "upsert" => Ok(Self::Upsert),
            other => Err(FerryError::Configuration(format!(
                "Unknown reconciliation policy '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ReconciliationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsertIfAbsent => f.write_str("insert_if_absent"),
            Self::Upsert => f.write_str("upsert"),
        }
    }
}

/// Reconciler settings taken from the `[migration]` section
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub shared_collection: String,
    pub collection_prefix: String,
    pub identity_field: String,
    pub table_field: String,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl ReconcileSettings {
    pub fn from_config(config: &FerryConfig) -> Self {
        Self {
            shared_collection: config.migration.shared_collection.clone(),
            collection_prefix: config.migration.collection_prefix.clone(),
            identity_field: config.migration.identity_field.clone(),
            table_field: config.migration.table_field.clone(),
            batch_size: config.migration.batch_size.max(1),
            dry_run: config.application.dry_run,
        }
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            shared_collection: "oracle_energy".to_string(),
            collection_prefix: String::new(),
            identity_field: "_id".to_string(),
            table_field: "table_name".to_string(),
            batch_size: 1000,
            dry_run: false,
        }
    }
}

/// Counts for one reconciled table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileCounts {
    /// Records handed to the reconciler
    pub total: usize,
    /// Records inserted or upserted
    pub written: usize,
    /// Records left alone because their document already existed
    pub skipped: usize,
}

/// Live counters of a table that is being migrated
///
/// Updated while the table runs, so the counts survive a timeout or a panic
/// that discards the table's own result.
#[derive(Debug, Default)]
pub struct TableProgress {
    exported: AtomicUsize,
    written: AtomicUsize,
}

impl TableProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records decoded from the payload
    pub fn exported(&self) -> usize {
        self.exported.load(Ordering::SeqCst)
    }

    /// Records committed to the target so far
    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }

    pub fn set_exported(&self, count: usize) {
        self.exported.store(count, Ordering::SeqCst);
    }

    fn add_written(&self, count: usize) {
        self.written.fetch_add(count, Ordering::SeqCst);
    }
}

/// A write that aborted a table's reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("write failed after {written} record(s): {message}")]
pub struct WriteError {
    pub table: String,
    /// Records committed before the failure
    pub written: usize,
    pub message: String,
}

impl From<WriteError> for MigrationError {
    fn from(err: WriteError) -> Self {
        MigrationError::Write {
            table: err.table,
            written: err.written,
            message: err.message,
        }
    }
}

/// Applies a reconciliation policy to identified records
pub struct RecordReconciler {
    target: Arc<dyn TargetStore>,
    settings: ReconcileSettings,
}

impl RecordReconciler {
    pub fn new(target: Arc<dyn TargetStore>, settings: ReconcileSettings) -> Self {
        Self { target, settings }
    }

    /// Collection that receives `table`'s documents under `policy`
    pub fn collection_for(&self, table: &TableName, policy: ReconciliationPolicy) -> String {
        match policy {
            ReconciliationPolicy::InsertIfAbsent => self.settings.shared_collection.clone(),
            ReconciliationPolicy::Upsert => {
                table.to_collection_name(&self.settings.collection_prefix)
            }
        }
    }

    /// Attaches the identity field and the table tag to every record
    ///
    /// Returns `(identity, document)` pairs in input order, with the identity
    /// namespaced or bare depending on `policy`.
    pub fn prepare(
        &self,
        table: &TableName,
        records: Vec<IdentifiedRecord>,
        policy: ReconciliationPolicy,
    ) -> Vec<(String, Record)> {
        records
            .into_iter()
            .map(|IdentifiedRecord { identity, mut record }| {
                let id = match policy {
                    ReconciliationPolicy::InsertIfAbsent => identity.namespaced(table),
                    ReconciliationPolicy::Upsert => identity.bare().to_string(),
                };
                record.insert(self.settings.identity_field.as_str(), Value::String(id.clone()));
                record.insert(
                    self.settings.table_field.as_str(),
                    Value::String(table.as_str().to_string()),
                );
                (id, record)
            })
            .collect()
    }

    /// Writes `records` to the target under `policy`
    ///
    /// Records are processed in order. The first failed write aborts the
    /// table; everything written before it stays committed.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] carrying the number of records already written.
    pub async fn reconcile(
        &self,
        table: &TableName,
        records: Vec<IdentifiedRecord>,
        policy: ReconciliationPolicy,
    ) -> std::result::Result<ReconcileCounts, WriteError> {
        self.reconcile_tracked(table, records, policy, &TableProgress::new())
            .await
    }

    /// Same as [`RecordReconciler::reconcile`], adding every committed write
    /// to `progress` as it happens
    pub async fn reconcile_tracked(
        &self,
        table: &TableName,
        records: Vec<IdentifiedRecord>,
        policy: ReconciliationPolicy,
        progress: &TableProgress,
    ) -> std::result::Result<ReconcileCounts, WriteError> {
        let collection = self.collection_for(table, policy);
        let documents = self.prepare(table, records, policy);

        tracing::debug!(
            table = %table,
            collection = %collection,
            policy = %policy,
            records = documents.len(),
            dry_run = self.settings.dry_run,
            "Reconciling records"
        );

        let counts = match policy {
            ReconciliationPolicy::InsertIfAbsent => {
                self.insert_if_absent(table, &collection, documents, progress)
                    .await?
            }
            ReconciliationPolicy::Upsert => {
                self.upsert_all(table, &collection, documents, progress)
                    .await?
            }
        };

        if counts.written > 0 {
            tracing::info!(
                table = %table,
                collection = %collection,
                written = counts.written,
                skipped = counts.skipped,
                "Inserted {} records into collection {} for table {}",
                counts.written,
                collection,
                table
            );
        } else {
            tracing::info!(table = %table, "No new records to insert for table {}", table);
        }

        Ok(counts)
    }

    async fn insert_if_absent(
        &self,
        table: &TableName,
        collection: &str,
        documents: Vec<(String, Record)>,
        progress: &TableProgress,
    ) -> std::result::Result<ReconcileCounts, WriteError> {
        let mut counts = ReconcileCounts {
            total: documents.len(),
            ..ReconcileCounts::default()
        };

        let mut seen = HashSet::new();
        let mut staged = Vec::new();
        for (id, document) in documents {
            if !seen.insert(id.clone()) {
                tracing::debug!(table = %table, id = %id, "Identity repeated in payload, skipping");
                counts.skipped += 1;
                continue;
            }

            let exists = self
                .target
                .exists(collection, &id)
                .await
                .map_err(|e| self.write_error(table, 0, format!("existence check for {id} failed: {e}")))?;

            if exists {
                counts.skipped += 1;
            } else {
                staged.push((id, document));
            }
        }

        let mut remaining = staged.into_iter();
        loop {
            let chunk: Vec<_> = remaining.by_ref().take(self.settings.batch_size).collect();
            if chunk.is_empty() {
                break;
            }

            if self.settings.dry_run {
                counts.written += chunk.len();
                progress.add_written(chunk.len());
                continue;
            }

            let result = self
                .target
                .insert_many(collection, chunk)
                .await
                .map_err(|e| self.write_error(table, counts.written, e.to_string()))?;

            counts.written += result.success_count;
            progress.add_written(result.success_count);

            if result.failure_count > 0 || !result.failures.is_empty() {
                let message = result
                    .failures
                    .first()
                    .map(|f| {
                        if f.is_throttled {
                            format!("insert of {} throttled: {}", f.document_id, f.error)
                        } else {
                            format!("insert of {} rejected: {}", f.document_id, f.error)
                        }
                    })
                    .unwrap_or_else(|| "insert rejected by target".to_string());
                return Err(self.write_error(table, counts.written, message));
            }
        }

        Ok(counts)
    }

    async fn upsert_all(
        &self,
        table: &TableName,
        collection: &str,
        documents: Vec<(String, Record)>,
        progress: &TableProgress,
    ) -> std::result::Result<ReconcileCounts, WriteError> {
        let mut counts = ReconcileCounts {
            total: documents.len(),
            ..ReconcileCounts::default()
        };

        for (id, document) in documents {
            if !self.settings.dry_run {
                self.target
                    .upsert(collection, &id, document)
                    .await
                    .map_err(|e| {
                        self.write_error(table, counts.written, format!("upsert of {id} failed: {e}"))
                    })?;
            }
            counts.written += 1;
            progress.add_written(1);
        }

        Ok(counts)
    }

    fn write_error(&self, table: &TableName, written: usize, message: String) -> WriteError {
        WriteError {
            table: table.as_str().to_string(),
            written,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTarget;
    use crate::core::identity::{FallbackStrategy, IdentityResolver, IdentityRule};
    use serde_json::json;

    fn table(name: &str) -> TableName {
        TableName::new(name).unwrap()
    }

    fn identified(table: &TableName, rows: serde_json::Value) -> Vec<IdentifiedRecord> {
        let resolver = IdentityResolver::new(
            vec![IdentityRule::any_table("id")],
            FallbackStrategy::ContentHash,
        );
        let records = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|row| Record::try_from(row.clone()).unwrap())
            .collect();
        resolver.identify(records, table)
    }

    fn reconciler(target: Arc<MemoryTarget>, settings: ReconcileSettings) -> RecordReconciler {
        RecordReconciler::new(target, settings)
    }

    #[tokio::test]
    async fn test_insert_if_absent_skips_existing() {
        let target = Arc::new(MemoryTarget::new());
        let t = table("T");
        target
            .seed("oracle_energy", "T_1", Record::try_from(json!({"id": 1, "old": true})).unwrap())
            .await;

        let counts = reconciler(target.clone(), ReconcileSettings::default())
            .reconcile(
                &t,
                identified(&t, json!([{"id": 1}, {"id": 2}])),
                ReconciliationPolicy::InsertIfAbsent,
            )
            .await
            .unwrap();

        assert_eq!(counts, ReconcileCounts { total: 2, written: 1, skipped: 1 });
        assert_eq!(target.ids("oracle_energy").await, vec!["T_1", "T_2"]);
        let untouched = target.get("oracle_energy", "T_1").await.unwrap();
        assert_eq!(untouched.get("old"), Some(&json!(true)));
        let inserted = target.get("oracle_energy", "T_2").await.unwrap();
        assert_eq!(inserted.get("_id"), Some(&json!("T_2")));
        assert_eq!(inserted.get("table_name"), Some(&json!("T")));
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_idempotent() {
        let target = Arc::new(MemoryTarget::new());
        let t = table("tb_app_energia");
        let reconciler = reconciler(target.clone(), ReconcileSettings::default());
        let rows = json!([{"id": "E1"}, {"id": "E2"}, {"note": "no key"}]);

        let first = reconciler
            .reconcile(&t, identified(&t, rows.clone()), ReconciliationPolicy::InsertIfAbsent)
            .await
            .unwrap();
        let second = reconciler
            .reconcile(&t, identified(&t, rows), ReconciliationPolicy::InsertIfAbsent)
            .await
            .unwrap();

        assert_eq!(first.written, 3);
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(target.count("oracle_energy").await, 3);
    }

    #[tokio::test]
    async fn test_repeated_identity_in_payload_staged_once() {
        let target = Arc::new(MemoryTarget::new());
        let t = table("tb_app_clientes");
        let counts = reconciler(target.clone(), ReconcileSettings::default())
            .reconcile(
                &t,
                identified(&t, json!([{"id": 5, "v": 1}, {"id": 5, "v": 2}])),
                ReconciliationPolicy::InsertIfAbsent,
            )
            .await
            .unwrap();

        assert_eq!(counts, ReconcileCounts { total: 2, written: 1, skipped: 1 });
        let stored = target.get("oracle_energy", "tb_app_clientes_5").await.unwrap();
        assert_eq!(stored.get("v"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_insert_chunks_by_batch_size() {
        let target = Arc::new(MemoryTarget::new().with_rejected_ids(["T_4"]));
        let t = table("T");
        let settings = ReconcileSettings {
            batch_size: 2,
            ..ReconcileSettings::default()
        };

        let err = reconciler(target.clone(), settings)
            .reconcile(
                &t,
                identified(&t, json!([{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}])),
                ReconciliationPolicy::InsertIfAbsent,
            )
            .await
            .unwrap_err();

        assert_eq!(err.written, 3);
        assert!(err.message.contains("T_4"));
        assert_eq!(target.ids("oracle_energy").await, vec!["T_1", "T_2", "T_3"]);
    }

    #[tokio::test]
    async fn test_upsert_merges_into_per_table_collection() {
        let target = Arc::new(MemoryTarget::new());
        let t = table("T");
        let settings = ReconcileSettings {
            collection_prefix: "erp_".to_string(),
            ..ReconcileSettings::default()
        };
        target
            .seed("erp_T", "1", Record::try_from(json!({"id": 1, "x": 1, "extra": "kept"})).unwrap())
            .await;

        let counts = reconciler(target.clone(), settings)
            .reconcile(&t, identified(&t, json!([{"id": 1, "x": 2}])), ReconciliationPolicy::Upsert)
            .await
            .unwrap();

        assert_eq!(counts.written, 1);
        let stored = target.get("erp_T", "1").await.unwrap();
        assert_eq!(stored.get("x"), Some(&json!(2)));
        assert_eq!(stored.get("extra"), Some(&json!("kept")));
        assert_eq!(stored.get("_id"), Some(&json!("1")));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let target = Arc::new(MemoryTarget::new());
        let t = table("tb_app_transacao");
        let reconciler = reconciler(target.clone(), ReconcileSettings::default());
        let rows = json!([{"id": "X1", "valor": 10}, {"id": "X2", "valor": 20}]);

        reconciler
            .reconcile(&t, identified(&t, rows.clone()), ReconciliationPolicy::Upsert)
            .await
            .unwrap();
        let after_first = target.get("tb_app_transacao", "X1").await;
        reconciler
            .reconcile(&t, identified(&t, rows), ReconciliationPolicy::Upsert)
            .await
            .unwrap();

        assert_eq!(target.count("tb_app_transacao").await, 2);
        assert_eq!(target.get("tb_app_transacao", "X1").await, after_first);
    }

    #[tokio::test]
    async fn test_upsert_failure_reports_written_count() {
        let target = Arc::new(MemoryTarget::new().with_rejected_ids(["2"]));
        let t = table("T");
        let err = reconciler(target, ReconcileSettings::default())
            .reconcile(
                &t,
                identified(&t, json!([{"id": 1}, {"id": 2}, {"id": 3}])),
                ReconciliationPolicy::Upsert,
            )
            .await
            .unwrap_err();

        assert_eq!(err.written, 1);
        assert_eq!(
            err.to_string(),
            "write failed after 1 record(s): upsert of 2 failed: Database error: document 2 rejected by target"
        );
        let migration: MigrationError = err.into();
        assert!(matches!(migration, MigrationError::Write { written: 1, .. }));
    }

    #[tokio::test]
    async fn test_progress_tracks_committed_writes() {
        let target = Arc::new(MemoryTarget::new().with_rejected_ids(["T_3"]));
        let t = table("T");
        let progress = TableProgress::new();

        let err = reconciler(
            target,
            ReconcileSettings {
                batch_size: 1,
                ..ReconcileSettings::default()
            },
        )
        .reconcile_tracked(
            &t,
            identified(&t, json!([{"id": 1}, {"id": 2}, {"id": 3}])),
            ReconciliationPolicy::InsertIfAbsent,
            &progress,
        )
        .await
        .unwrap_err();

        assert_eq!(err.written, 2);
        assert_eq!(progress.written(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() {
        let target = Arc::new(MemoryTarget::new());
        let t = table("T");
        let settings = ReconcileSettings {
            dry_run: true,
            ..ReconcileSettings::default()
        };

        let counts = reconciler(target.clone(), settings)
            .reconcile(&t, identified(&t, json!([{"id": 1}, {"id": 2}])), ReconciliationPolicy::InsertIfAbsent)
            .await
            .unwrap();

        assert_eq!(counts.written, 2);
        assert_eq!(target.count("oracle_energy").await, 0);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "insert_if_absent".parse::<ReconciliationPolicy>().unwrap(),
            ReconciliationPolicy::InsertIfAbsent
        );
        assert_eq!(
            "upsert".parse::<ReconciliationPolicy>().unwrap(),
            ReconciliationPolicy::Upsert
        );
        assert!("replace".parse::<ReconciliationPolicy>().is_err());
        assert_eq!(ReconciliationPolicy::Upsert.to_string(), "upsert");
    }
}
