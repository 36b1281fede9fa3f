//! Azure Cosmos DB integration
//!
//! Stores migrated records as documents in Cosmos DB containers.

pub mod adapter;
pub mod bulk;
pub mod client;

pub use adapter::CosmosDbAdapter;
pub use client::CosmosDbClient;
