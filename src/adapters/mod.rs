//! External system integrations for Ferry.
//!
//! - [`database`] - Store traits and the configuration-driven provider
//! - [`postgresql`] - Export source and JSONB document target
//! - [`cosmosdb`] - Azure Cosmos DB document target
//! - [`snapshot_dir`] - Source replaying exported JSON files
//! - [`memory`] - In-process stores for dry runs and tests
//!
//! # Design Pattern
//!
//! Adapters isolate external systems behind [`database::SourceStore`] and
//! [`database::TargetStore`], so the migration engine can be tested with the
//! in-memory implementations.
//!
//! ```rust,no_run
//! use ferry::adapters::cosmosdb::CosmosDbClient;
//! use ferry::config::{CosmosDbConfig, SecretValue};
//! use secrecy::Secret;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CosmosDbConfig {
//!     endpoint: "https://account.documents.azure.com:443/".to_string(),
//!     key: Secret::new(SecretValue::from("key".to_string())),
//!     database_name: "erp".to_string(),
//!     max_retries: 3,
//! };
//!
//! let client = CosmosDbClient::new(config).await?;
//! client.ensure_database_exists().await?;
//! # Ok(())
//! # }
//! ```

pub mod cosmosdb;
pub mod database;
pub mod memory;
pub mod postgresql;
pub mod snapshot_dir;
