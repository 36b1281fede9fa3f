//! Batch orchestration
//!
//! The orchestrator acquires store handles once per invocation, runs one
//! [`TableMigrationUnit`] per table, and releases the handles when every
//! table has an outcome. A failure inside one table never stops the others.

use super::outcome::{BatchReport, TableMigrationOutcome};
use super::unit::{TableExport, TableMigrationUnit};
use crate::adapters::database::{StoreHandles, StoreProvider};
use crate::config::FerryConfig;
use crate::core::identity::IdentityResolver;
use crate::core::reconcile::{
    ReconcileSettings, ReconciliationPolicy, RecordReconciler, TableProgress,
};
use crate::core::snapshot::SnapshotWriter;
use crate::domain::{MigrationError, Record, Result, TableName};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Tables run by `run_all`, in order
    pub tables: Vec<TableName>,
    pub policy: ReconciliationPolicy,
    /// Tables migrated at the same time
    pub max_concurrency: usize,
    /// Upper bound for one table
    pub table_timeout: Duration,
    /// Directory for snapshot files
    pub export_dir: PathBuf,
    pub reconcile: ReconcileSettings,
}

impl OrchestratorSettings {
    pub fn from_config(config: &FerryConfig) -> Result<Self> {
        Ok(Self {
            tables: config.tables(),
            policy: config.migration.policy.parse()?,
            max_concurrency: config.migration.max_concurrency.max(1),
            table_timeout: Duration::from_secs(config.migration.table_timeout_seconds),
            export_dir: PathBuf::from(&config.migration.export_dir),
            reconcile: ReconcileSettings::from_config(config),
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            policy: ReconciliationPolicy::default(),
            max_concurrency: 1,
            table_timeout: Duration::from_secs(300),
            export_dir: PathBuf::from("exports"),
            reconcile: ReconcileSettings::default(),
        }
    }
}

/// A snapshot file together with the outcomes that produced it
#[derive(Debug)]
pub struct SnapshotExport {
    pub path: PathBuf,
    pub report: BatchReport,
}

/// Runs table migrations over handles from a [`StoreProvider`]
pub struct MigrationOrchestrator {
    provider: Arc<dyn StoreProvider>,
    resolver: Arc<IdentityResolver>,
    settings: OrchestratorSettings,
    snapshots: SnapshotWriter,
    shutdown: Option<watch::Receiver<bool>>,
}

impl MigrationOrchestrator {
    pub fn new(
        provider: Arc<dyn StoreProvider>,
        resolver: IdentityResolver,
        settings: OrchestratorSettings,
    ) -> Self {
        let snapshots = SnapshotWriter::new(settings.export_dir.clone());
        Self {
            provider,
            resolver: Arc::new(resolver),
            settings,
            snapshots,
            shutdown: None,
        }
    }

    /// Builds an orchestrator from configuration
    pub fn from_config(provider: Arc<dyn StoreProvider>, config: &FerryConfig) -> Result<Self> {
        Ok(Self::new(
            provider,
            IdentityResolver::from_config(config)?,
            OrchestratorSettings::from_config(config)?,
        ))
    }

    /// Stops starting new tables once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Configured table list
    pub fn tables(&self) -> &[TableName] {
        &self.settings.tables
    }

    /// Migrates a single table
    ///
    /// # Errors
    ///
    /// Returns the table's classified error when it did not succeed, or
    /// [`MigrationError::Connection`] if the stores cannot be acquired.
    pub async fn run_one(
        &self,
        table: &TableName,
    ) -> std::result::Result<TableMigrationOutcome, MigrationError> {
        let outcome = self
            .scoped(|handles| {
                let unit = self.unit(&handles);
                let table = table.clone();
                async move { vec![self.run_guarded(unit, table, Mode::Migrate).await.0] }
            })
            .await?
            .remove(0);

        match outcome.failure() {
            Some(error) => Err(error.clone()),
            None => Ok(outcome),
        }
    }

    /// Migrates every configured table
    ///
    /// # Errors
    ///
    /// Only store acquisition fails the whole batch; every other failure is
    /// recorded in the table's outcome.
    pub async fn run_all(&self) -> std::result::Result<BatchReport, MigrationError> {
        let start = Instant::now();
        let results = self
            .scoped(|handles| self.run_tables(handles, Mode::Migrate))
            .await?
            .into_iter()
            .map(|(outcome, _)| outcome)
            .collect();

        let report = BatchReport::new(results, start.elapsed());
        report.log_summary();
        Ok(report)
    }

    /// Writes one table's records to a snapshot file instead of the target
    pub async fn export_one(
        &self,
        table: &TableName,
    ) -> std::result::Result<(TableMigrationOutcome, PathBuf), MigrationError> {
        let (outcome, records) = self
            .scoped(|handles| {
                let unit = self.unit(&handles);
                let table = table.clone();
                async move { vec![self.run_guarded(unit, table, Mode::Export).await] }
            })
            .await?
            .remove(0);

        if let Some(error) = outcome.failure() {
            return Err(error.clone());
        }

        let path = self.snapshots.write_table(table, &records).await?;
        Ok((outcome, path))
    }

    /// Writes every configured table into one combined snapshot file
    pub async fn export_all(&self) -> std::result::Result<SnapshotExport, MigrationError> {
        let start = Instant::now();
        let runs = self
            .scoped(|handles| self.run_tables(handles, Mode::Export))
            .await?;

        let mut results = Vec::with_capacity(runs.len());
        let mut tables = Vec::new();
        for (outcome, records) in runs {
            if outcome.is_success() {
                if let Ok(table) = TableName::new(outcome.table_name()) {
                    tables.push((table, records));
                }
            }
            results.push(outcome);
        }

        let path = self.snapshots.write_all(&tables).await?;
        let report = BatchReport::new(results, start.elapsed());
        report.log_summary();
        Ok(SnapshotExport { path, report })
    }

    /// Acquires handles, runs `work`, and releases the handles
    async fn scoped<F, Fut, T>(&self, work: F) -> std::result::Result<T, MigrationError>
    where
        F: FnOnce(StoreHandles) -> Fut,
        Fut: Future<Output = T>,
    {
        let handles = self.provider.acquire().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to acquire store handles");
            MigrationError::Connection(e.to_string())
        })?;

        tracing::debug!(
            source = handles.source.name(),
            target = handles.target.name(),
            "Store handles acquired"
        );

        let result = work(handles.clone()).await;
        handles.release().await;
        Ok(result)
    }

    fn unit(&self, handles: &StoreHandles) -> TableMigrationUnit {
        let reconciler = RecordReconciler::new(handles.target.clone(), self.settings.reconcile.clone());
        TableMigrationUnit::new(
            handles.source.clone(),
            self.resolver.clone(),
            Arc::new(reconciler),
            self.settings.policy,
        )
    }

    async fn run_tables(
        &self,
        handles: StoreHandles,
        mode: Mode,
    ) -> Vec<(TableMigrationOutcome, Vec<Record>)> {
        let unit = self.unit(&handles);

        tracing::info!(
            tables = self.settings.tables.len(),
            max_concurrency = self.settings.max_concurrency,
            policy = %self.settings.policy,
            "Starting migration of all tables"
        );

        // buffered keeps results in input order
        stream::iter(self.settings.tables.iter().cloned())
            .map(|table| self.run_guarded(unit.clone(), table, mode))
            .buffered(self.settings.max_concurrency)
            .collect()
            .await
    }

    /// Runs one table on its own task, converting timeouts, panics and
    /// cancellation into outcomes
    async fn run_guarded(
        &self,
        unit: TableMigrationUnit,
        table: TableName,
        mode: Mode,
    ) -> (TableMigrationOutcome, Vec<Record>) {
        let start = Instant::now();

        if self.is_shutting_down() {
            tracing::warn!(table = %table, "Shutdown requested, table not started");
            let error = MigrationError::Cancelled {
                table: table.to_string(),
            };
            return (TableMigrationOutcome::failed(&table, error, 0, start.elapsed()), Vec::new());
        }

        let timeout = self.settings.table_timeout;
        let progress = Arc::new(TableProgress::new());
        let task_table = table.clone();
        let task_progress = progress.clone();
        let task = tokio::spawn(async move {
            tokio::time::timeout(timeout, async move {
                match mode {
                    Mode::Migrate => (
                        unit.migrate_tracked(&task_table, &task_progress).await,
                        Vec::new(),
                    ),
                    Mode::Export => {
                        let TableExport { outcome, records } =
                            unit.export_tracked(&task_table, &task_progress).await;
                        (outcome, records)
                    }
                }
            })
            .await
        });

        let error = match task.await {
            Ok(Ok(run)) => return run,
            Ok(Err(_elapsed)) => {
                tracing::error!(table = %table, timeout_secs = timeout.as_secs(), "Table migration timed out");
                MigrationError::Timeout {
                    table: table.to_string(),
                    seconds: timeout.as_secs(),
                }
            }
            Err(join_error) => {
                tracing::error!(table = %table, error = %join_error, "Table migration task aborted");
                MigrationError::Internal {
                    table: table.to_string(),
                    message: join_error.to_string(),
                }
            }
        };

        // Writes committed before the cut stay committed; report them
        let outcome = TableMigrationOutcome::failed_with_counts(
            &table,
            error,
            progress.exported(),
            progress.written(),
            start.elapsed(),
        );
        (outcome, Vec::new())
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Migrate,
    Export,
}
