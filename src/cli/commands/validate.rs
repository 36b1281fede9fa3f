//! Validate config command implementation
//!
//! Loads and validates the configuration file, then prints a summary.

use crate::config::load_config;
use crate::config::schema::{DatabaseTarget, FerryConfig, SourceKind};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        match load_config(config_path) {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!();
                for line in summary(&config) {
                    println!("{line}");
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}

fn summary(config: &FerryConfig) -> Vec<String> {
    let mut lines = vec![
        "Configuration Summary:".to_string(),
        format!("  Environment: {:?}", config.environment),
        format!("  Log Level: {}", config.application.log_level),
        format!("  Dry Run: {}", config.application.dry_run),
    ];

    match config.source.kind {
        SourceKind::PostgreSQL => {
            lines.push("  Source: PostgreSQL".to_string());
            lines.push(format!("  Export Procedure: {}", config.source.export_procedure));
            lines.push(format!("  Export Log Table: {}", config.source.export_log_table));
        }
        SourceKind::SnapshotDir => {
            lines.push("  Source: snapshot directory".to_string());
            lines.push(format!(
                "  Snapshot Dir: {}",
                config.source.snapshot_dir.as_deref().unwrap_or("")
            ));
        }
    }

    match config.database_target {
        DatabaseTarget::CosmosDB => {
            if let Some(ref cosmos_config) = config.cosmosdb {
                lines.push("  Database Target: CosmosDB".to_string());
                lines.push(format!("  Cosmos DB Endpoint: {}", cosmos_config.endpoint));
                lines.push(format!("  Cosmos DB Database: {}", cosmos_config.database_name));
            }
        }
        DatabaseTarget::PostgreSQL => {
            if let Some(ref pg_config) = config.postgresql {
                lines.push("  Database Target: PostgreSQL".to_string());
                lines.push(format!("  Documents Table: {}", pg_config.documents_table));
                lines.push(format!("  Max Connections: {}", pg_config.max_connections));
            }
        }
        DatabaseTarget::Memory => lines.push("  Database Target: memory".to_string()),
    }

    let migration = &config.migration;
    lines.push(format!("  Mode: {}", migration.mode));
    lines.push(format!("  Policy: {}", migration.policy));
    lines.push(format!("  Shared Collection: {}", migration.shared_collection));
    lines.push(format!("  Max Concurrency: {}", migration.max_concurrency));
    lines.push(format!("  Tables: {:?}", migration.tables));
    lines.push(format!("  Identity Rules: {}", config.identity.rules.len()));
    lines
}
