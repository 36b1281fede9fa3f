//! Check command implementation
//!
//! Connects to the configured source and target and reports whether both
//! answer.

use crate::adapters::database::{ConfiguredStoreProvider, StoreProvider};
use crate::config::load_config;
use clap::Args;

/// Arguments for the check command
#[derive(Args, Debug, Default)]
pub struct CheckArgs {}

impl CheckArgs {
    /// Execute the check command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Checking store connections");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let provider = ConfiguredStoreProvider::new(config);
        match provider.acquire().await {
            Ok(handles) => {
                println!("✅ Source reachable: {}", handles.source.name());
                println!("✅ Target reachable: {}", handles.target.name());
                handles.release().await;
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Store connection check failed");
                println!("❌ Store connection failed");
                println!("   Error: {e}");
                Ok(4)
            }
        }
    }
}
