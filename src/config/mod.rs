//! Configuration management for Ferry.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Ferry uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FERRY_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ferry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ferry.toml")?;
//!
//! println!("Policy: {}", config.migration.policy);
//! for table in config.tables() {
//!     println!("Table: {table}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`SourceConfig`] - Relational source (export procedure, export log) or snapshot directory
//! - [`CosmosDbConfig`] / [`PostgreSQLConfig`] - Document target connection
//! - [`MigrationConfig`] - Tables, policy, collections, batching, concurrency
//! - [`IdentityConfig`] - Ordered identity field rules and the fallback strategy
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! database_target = "cosmosdb"
//!
//! [source]
//! kind = "postgresql"
//!
//! [source.postgresql]
//! connection_string = "${FERRY_SOURCE_URL}"
//!
//! [cosmosdb]
//! endpoint = "https://your-account.documents.azure.com:443/"
//! key = "${FERRY_COSMOS_KEY}"
//! database_name = "ferry"
//!
//! [migration]
//! tables = ["tb_app_fornecedor", "tb_app_clientes"]
//! policy = "insert_if_absent"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CosmosDbConfig, DatabaseTarget, Environment, FerryConfig, IdentityConfig,
    LoggingConfig, MigrationConfig, PostgreSQLConfig, SourceConfig, SourceKind,
};
pub use secret::{secret_string, SecretString, SecretValue};
