//! Transport-agnostic request layer
//!
//! [`MigrationApi`] turns `migrate` and `migrate_all` requests into
//! orchestrator calls and maps the results onto status codes and JSON bodies.
//! Any front end (the CLI, an HTTP server) only has to move the
//! [`ApiResponse`] onto its wire.

pub mod response;

pub use response::{ApiResponse, ResponseBody};

use crate::adapters::database::StoreProvider;
use crate::config::FerryConfig;
use crate::core::migration::MigrationOrchestrator;
use crate::domain::{FerryError, MigrationError, Result, TableName};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// What a request does with the migrated records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Write records to the target store
    #[default]
    Reconcile,
    /// Write records to snapshot files and return the file
    Export,
}

impl FromStr for RunMode {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reconcile" => Ok(Self::Reconcile),
            "export" => Ok(Self::Export),
            other => Err(FerryError::Configuration(format!(
                "Invalid run mode '{other}'. Must be one of: reconcile, export"
            ))),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconcile => write!(f, "reconcile"),
            Self::Export => write!(f, "export"),
        }
    }
}

/// Body of a `migrate` request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrateRequest {
    #[serde(default)]
    pub table_name: Option<String>,
}

impl MigrateRequest {
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table_name: Some(table.into()),
        }
    }

    /// Parses a JSON request body
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Validation`] if the body is not a JSON object.
    pub fn from_json(body: &str) -> std::result::Result<Self, MigrationError> {
        serde_json::from_str(body)
            .map_err(|e| MigrationError::Validation(format!("Invalid request body: {e}")))
    }

    /// The requested table, validated
    fn table(&self) -> std::result::Result<TableName, MigrationError> {
        let name = self
            .table_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| MigrationError::Validation("Table name is required".to_string()))?;

        TableName::new(name).map_err(MigrationError::Validation)
    }
}

/// Request handlers over one orchestrator
pub struct MigrationApi {
    orchestrator: MigrationOrchestrator,
    mode: RunMode,
}

impl MigrationApi {
    pub fn new(orchestrator: MigrationOrchestrator, mode: RunMode) -> Self {
        Self { orchestrator, mode }
    }

    /// Builds the orchestrator and default run mode from configuration
    pub fn from_config(provider: Arc<dyn StoreProvider>, config: &FerryConfig) -> Result<Self> {
        Ok(Self::new(
            MigrationOrchestrator::from_config(provider, config)?,
            config.migration.mode.parse()?,
        ))
    }

    /// Replaces the default run mode
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Stops starting new tables once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.orchestrator = self.orchestrator.with_shutdown(shutdown);
        self
    }

    /// Default run mode
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn orchestrator(&self) -> &MigrationOrchestrator {
        &self.orchestrator
    }

    /// Migrates the requested table in the default run mode
    pub async fn migrate(&self, request: &MigrateRequest) -> ApiResponse {
        self.migrate_with_mode(request, self.mode).await
    }

    /// Migrates the requested table
    ///
    /// 200 with counts (or the snapshot file in export mode), 400 without a
    /// valid table name, 404 when the source has no data, 500 otherwise.
    pub async fn migrate_with_mode(&self, request: &MigrateRequest, mode: RunMode) -> ApiResponse {
        let table = match request.table() {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected migrate request");
                return ApiResponse::error(&e);
            }
        };

        tracing::info!(table = %table, mode = %mode, "Starting migration for table");

        match mode {
            RunMode::Reconcile => match self.orchestrator.run_one(&table).await {
                Ok(outcome) => ApiResponse::ok(json!({
                    "message": format!("Migration of table {table} completed."),
                    "exported_records": outcome.exported_records(),
                    "inserted_records": outcome.inserted_records(),
                })),
                Err(e) => ApiResponse::error(&e),
            },
            RunMode::Export => match self.orchestrator.export_one(&table).await {
                Ok((_, path)) => ApiResponse::file(path),
                Err(e) => ApiResponse::error(&e),
            },
        }
    }

    /// Migrates every configured table in the default run mode
    pub async fn migrate_all(&self) -> ApiResponse {
        self.migrate_all_with_mode(self.mode).await
    }

    /// Migrates every configured table
    ///
    /// Per-table failures are part of the 200 report; only a store
    /// connection failure turns into a 500.
    pub async fn migrate_all_with_mode(&self, mode: RunMode) -> ApiResponse {
        match mode {
            RunMode::Reconcile => match self.orchestrator.run_all().await {
                Ok(report) => match serde_json::to_value(&report) {
                    Ok(body) => ApiResponse::ok(body),
                    Err(e) => ApiResponse::error(&MigrationError::Snapshot(format!(
                        "Failed to serialize report: {e}"
                    ))),
                },
                Err(e) => ApiResponse::error(&e),
            },
            RunMode::Export => match self.orchestrator.export_all().await {
                Ok(export) => ApiResponse::file(export.path),
                Err(e) => ApiResponse::error(&e),
            },
        }
    }
}
