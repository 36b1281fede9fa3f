//! Store provider factory
//!
//! Builds source and target stores from configuration each time handles are
//! acquired.

use crate::adapters::cosmosdb::{CosmosDbAdapter, CosmosDbClient};
use crate::adapters::database::traits::{
    SourceStore, StoreHandles, StoreProvider, TargetStore,
};
use crate::adapters::memory::MemoryTarget;
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient, PostgreSQLSource};
use crate::adapters::snapshot_dir::SnapshotDirSource;
use crate::config::schema::{DatabaseTarget, FerryConfig, SourceKind};
use crate::domain::{FerryError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Create the source store selected by `source.kind`
///
/// # Errors
///
/// Returns an error if the source client cannot be created.
pub async fn create_source_store(config: &FerryConfig) -> Result<Arc<dyn SourceStore>> {
    match config.source.kind {
        SourceKind::PostgreSQL => {
            let pg_config = config.source.postgresql.as_ref().ok_or_else(|| {
                FerryError::Configuration("source.postgresql configuration is missing".to_string())
            })?;

            tracing::info!("Creating PostgreSQL source");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgreSQLSource::new(client, &config.source)))
        }
        SourceKind::SnapshotDir => {
            let dir = config.source.snapshot_dir.as_ref().ok_or_else(|| {
                FerryError::Configuration("source.snapshot_dir is missing".to_string())
            })?;

            tracing::info!(dir = %dir, "Creating snapshot directory source");
            Ok(Arc::new(SnapshotDirSource::new(dir)))
        }
    }
}

/// Create the target store selected by `database_target`
///
/// A memory target starts out empty on every call; [`ConfiguredStoreProvider`]
/// keeps one alive across acquisitions instead.
///
/// # Errors
///
/// Returns an error if the target client cannot be created or prepared.
pub async fn create_target_store(config: &FerryConfig) -> Result<Arc<dyn TargetStore>> {
    match config.database_target {
        DatabaseTarget::CosmosDB => {
            let cosmos_config = config.cosmosdb.as_ref().ok_or_else(|| {
                FerryError::Configuration("cosmosdb configuration is missing".to_string())
            })?;

            tracing::info!("Creating CosmosDB client");
            let client = CosmosDbClient::new(cosmos_config.clone()).await?;
            client.ensure_database_exists().await?;
            Ok(Arc::new(CosmosDbAdapter::new(client)))
        }
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                FerryError::Configuration("postgresql configuration is missing".to_string())
            })?;

            tracing::info!("Creating PostgreSQL client");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            let adapter = PostgreSQLAdapter::new(client);
            adapter.ensure_schema().await?;
            Ok(Arc::new(adapter))
        }
        DatabaseTarget::Memory => Ok(Arc::new(MemoryTarget::new())),
    }
}

/// Provider building stores from a [`FerryConfig`]
///
/// Each acquisition opens fresh connections and tests both stores. An
/// in-memory target is kept for the provider's lifetime.
pub struct ConfiguredStoreProvider {
    config: FerryConfig,
    memory: Arc<MemoryTarget>,
}

impl ConfiguredStoreProvider {
    pub fn new(config: FerryConfig) -> Self {
        Self {
            config,
            memory: Arc::new(MemoryTarget::new()),
        }
    }

    /// The in-memory target used when `database_target = "memory"`
    pub fn memory_target(&self) -> &Arc<MemoryTarget> {
        &self.memory
    }
}

#[async_trait]
impl StoreProvider for ConfiguredStoreProvider {
    async fn acquire(&self) -> Result<StoreHandles> {
        let source = create_source_store(&self.config).await?;

        let target = match self.config.database_target {
            DatabaseTarget::Memory => self.memory.clone() as Arc<dyn TargetStore>,
            _ => match create_target_store(&self.config).await {
                Ok(target) => target,
                Err(e) => {
                    if let Err(release_err) = source.release().await {
                        tracing::warn!(
                            store = source.name(),
                            error = %release_err,
                            "Failed to release source store"
                        );
                    }
                    return Err(e);
                }
            },
        };

        let handles = StoreHandles { source, target };

        let checks = async {
            handles.source.test_connection().await?;
            handles.target.test_connection().await
        };
        if let Err(e) = checks.await {
            handles.release().await;
            return Err(FerryError::Connection(e.to_string()));
        }

        Ok(handles)
    }
}

/// Provider handing out the same pre-built stores on every acquisition
pub struct StaticStoreProvider {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
}

impl StaticStoreProvider {
    pub fn new(source: Arc<dyn SourceStore>, target: Arc<dyn TargetStore>) -> Self {
        Self { source, target }
    }
}

#[async_trait]
impl StoreProvider for StaticStoreProvider {
    async fn acquire(&self) -> Result<StoreHandles> {
        Ok(StoreHandles {
            source: self.source.clone(),
            target: self.target.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::TempDir;

    fn memory_config(snapshot_dir: &str) -> FerryConfig {
        parse_config(&format!(
            r#"
database_target = "memory"

[source]
kind = "snapshot_dir"
snapshot_dir = "{snapshot_dir}"

[migration]
tables = ["tb_app_clientes"]
"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_target_survives_acquisitions() {
        let dir = TempDir::new().unwrap();
        let provider = ConfiguredStoreProvider::new(memory_config(&dir.path().display().to_string()));

        let first = provider.acquire().await.unwrap();
        first
            .target
            .upsert("oracle_energy", "a", crate::domain::Record::new())
            .await
            .unwrap();
        first.release().await;

        let second = provider.acquire().await.unwrap();
        assert!(second.target.exists("oracle_energy", "a").await.unwrap());
        assert_eq!(second.source.name(), "snapshot_dir");
        assert_eq!(provider.memory_target().count("oracle_energy").await, 1);
    }

    #[tokio::test]
    async fn test_unreachable_source_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing").display().to_string();
        let provider = ConfiguredStoreProvider::new(memory_config(&missing));

        let err = provider.acquire().await.err().unwrap();
        assert!(matches!(err, FerryError::Connection(_)));
    }

    #[tokio::test]
    async fn test_unreachable_target_releases_source() {
        let dir = TempDir::new().unwrap();
        let config = parse_config(&format!(
            r#"
database_target = "postgresql"

[source]
kind = "snapshot_dir"
snapshot_dir = "{}"

[postgresql]
connection_string = "postgresql://ferry:pw@127.0.0.1:1/docs"
connection_timeout_seconds = 1
ssl_mode = "disable"
"#,
            dir.path().display()
        ))
        .unwrap();

        let provider = ConfiguredStoreProvider::new(config);
        assert!(provider.acquire().await.is_err());
    }
}
