//! Table migration engine
//!
//! - [`unit`] - one table: fetch, decode, resolve identities, reconcile
//! - [`orchestrator`] - runs units over the configured tables
//! - [`outcome`] - per-table outcomes and the batch report

pub mod orchestrator;
pub mod outcome;
pub mod unit;

pub use orchestrator::{MigrationOrchestrator, OrchestratorSettings, SnapshotExport};
pub use outcome::{BatchReport, OutcomeStatus, TableMigrationOutcome};
pub use unit::{TableExport, TableMigrationUnit};
