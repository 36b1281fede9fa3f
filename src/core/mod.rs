//! Core migration logic for Ferry.
//!
//! # Modules
//!
//! - [`decode`] - Exported payload to records
//! - [`identity`] - Record identity rules and fallback generation
//! - [`reconcile`] - Insert-if-absent and upsert policies against the target
//! - [`migration`] - Per-table units and the batch orchestrator
//! - [`snapshot`] - Snapshot files for export mode
//!
//! # Migration Workflow
//!
//! 1. **Acquire**: Connect to the source and target stores once per invocation
//! 2. **Fetch**: Run the export procedure and read the latest payload
//! 3. **Decode**: Parse the payload into records
//! 4. **Resolve**: Assign each record its identity
//! 5. **Reconcile**: Write records under the configured policy
//! 6. **Report**: Collect one outcome per table
//! 7. **Release**: Close the store handles
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry::adapters::database::ConfiguredStoreProvider;
//! use ferry::config::load_config;
//! use ferry::core::migration::MigrationOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ferry.toml")?;
//! let provider = Arc::new(ConfiguredStoreProvider::new(config.clone()));
//! let orchestrator = MigrationOrchestrator::from_config(provider, &config)?;
//!
//! let report = orchestrator.run_all().await?;
//! for outcome in &report.results {
//!     println!("{}: {:?}", outcome.table_name(), outcome.status());
//! }
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod identity;
pub mod migration;
pub mod reconcile;
pub mod snapshot;
