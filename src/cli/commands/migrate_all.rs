//! Migrate-all command implementation

use super::{exit_code, print_response};
use crate::adapters::database::ConfiguredStoreProvider;
use crate::api::{ApiResponse, MigrationApi, RunMode};
use crate::config::load_config;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the migrate-all command
#[derive(Args, Debug, Default)]
pub struct MigrateAllArgs {
    /// Write all tables to one snapshot file instead of the target store
    #[arg(long)]
    pub export: bool,

    /// Check existing documents without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Migrate only these tables (comma-separated), in the given order
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,
}

impl MigrateAllArgs {
    /// Execute the migrate-all command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if !self.tables.is_empty() {
            tracing::info!(tables = ?self.tables, "Overriding table list from CLI");
            config.migration.tables = self.tables.clone();
            if let Err(e) = config.validate() {
                eprintln!("❌ {e}");
                return Ok(2);
            }
        }

        if config.migration.tables.is_empty() {
            eprintln!("❌ No tables configured. Set migration.tables or pass --tables");
            return Ok(2);
        }

        let provider = Arc::new(ConfiguredStoreProvider::new(config.clone()));
        let api = MigrationApi::from_config(provider, &config)?;
        let mode = if self.export { RunMode::Export } else { api.mode() };
        let api = api.with_mode(mode).with_shutdown(shutdown_signal);

        let response = api.migrate_all().await;
        print_response(&response);

        Ok(batch_exit_code(&response))
    }
}

/// 1 when the report lists failed tables, otherwise the response's own code
fn batch_exit_code(response: &ApiResponse) -> i32 {
    let failed_tables = response
        .json()
        .and_then(|body| body.get("failed_tables"))
        .and_then(|n| n.as_u64())
        .unwrap_or(0);

    if response.is_success() && failed_tables > 0 {
        println!("⚠️  Migration completed with {failed_tables} failed table(s)");
        1
    } else {
        exit_code(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MigrationError;
    use serde_json::json;

    #[test]
    fn test_batch_exit_code() {
        assert_eq!(batch_exit_code(&ApiResponse::ok(json!({ "failed_tables": 0 }))), 0);
        assert_eq!(batch_exit_code(&ApiResponse::ok(json!({ "failed_tables": 2 }))), 1);
        assert_eq!(
            batch_exit_code(&ApiResponse::error(&MigrationError::Connection(
                "refused".to_string()
            ))),
            4
        );
    }
}
