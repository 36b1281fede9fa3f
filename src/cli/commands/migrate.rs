//! Migrate command implementation
//!
//! Migrates a single table, as the `migrate` request does.

use super::{exit_code, exit_code_for, print_response};
use crate::adapters::database::ConfiguredStoreProvider;
use crate::api::{MigrateRequest, MigrationApi, RunMode};
use crate::config::load_config;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the migrate command
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Table to migrate
    #[arg(short, long, conflicts_with = "body")]
    pub table_name: Option<String>,

    /// Raw JSON request body, e.g. '{"table_name": "tb_app_clientes"}'
    #[arg(long)]
    pub body: Option<String>,

    /// Write the table to a snapshot file instead of the target store
    #[arg(long)]
    pub export: bool,

    /// Check existing documents without writing
    #[arg(long)]
    pub dry_run: bool,
}

impl MigrateArgs {
    /// The request described by the arguments
    pub fn request(&self) -> Result<MigrateRequest, crate::domain::MigrationError> {
        match &self.body {
            Some(body) => MigrateRequest::from_json(body),
            None => Ok(MigrateRequest {
                table_name: self.table_name.clone(),
            }),
        }
    }

    /// Run mode, with `--export` taking precedence over the configured one
    pub fn mode(&self, configured: RunMode) -> RunMode {
        if self.export {
            RunMode::Export
        } else {
            configured
        }
    }

    /// Execute the migrate command
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

        let request = match self.request() {
            Ok(request) => request,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let provider = Arc::new(ConfiguredStoreProvider::new(config.clone()));
        let api = MigrationApi::from_config(provider, &config)?;
        let mode = self.mode(api.mode());
        let api = api.with_mode(mode).with_shutdown(shutdown_signal);

        let response = api.migrate(&request).await;
        print_response(&response);

        Ok(exit_code(&response))
    }
}
