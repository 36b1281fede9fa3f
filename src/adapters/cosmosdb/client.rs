//! Cosmos DB client implementation
//!
//! Collections map onto containers of one database. Containers are created
//! on first use with `/id` as partition key, so a document's identity is also
//! its partition key value.

use crate::config::CosmosDbConfig;
use crate::domain::{CosmosDbError, FerryError, Result};
use azure_core::credentials::Secret;
use azure_data_cosmos::clients::{ContainerClient, DatabaseClient};
use azure_data_cosmos::models::{ContainerProperties, IndexingPolicy, PartitionKeyDefinition};
use azure_data_cosmos::{CosmosClient, CosmosClientOptions, PartitionKey};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Partition key path of every container created by Ferry
pub const PARTITION_KEY_PATH: &str = "/id";

/// Cosmos DB client for Ferry
pub struct CosmosDbClient {
    client: CosmosClient,
    database: DatabaseClient,
    config: CosmosDbConfig,
    /// Containers known to exist
    ready: Mutex<HashSet<String>>,
}

impl CosmosDbClient {
    /// Create a new Cosmos DB client
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub async fn new(config: CosmosDbConfig) -> Result<Self> {
        use secrecy::ExposeSecret;

        // Azure has its own secret wrapper
        let key_str: String = config.key.expose_secret().clone().into();
        let key = Secret::new(key_str);
        let options = Some(CosmosClientOptions::default());

        let client = CosmosClient::with_key(&config.endpoint, key, options).map_err(|e| {
            FerryError::CosmosDb(CosmosDbError::ConnectionFailed(format!(
                "Failed to create Cosmos client: {e}"
            )))
        })?;

        let database = client.database_client(&config.database_name);

        Ok(Self {
            client,
            database,
            config,
            ready: Mutex::new(HashSet::new()),
        })
    }

    /// Test the connection to Cosmos DB
    ///
    /// Attempts to read the database to verify connectivity.
    pub async fn test_connection(&self) -> Result<()> {
        self.database.read(None).await.map_err(|e| {
            FerryError::CosmosDb(CosmosDbError::ConnectionFailed(format!(
                "Connection test failed: {e}"
            )))
        })?;

        Ok(())
    }

    /// Ensure the database exists, creating it if necessary
    pub async fn ensure_database_exists(&self) -> Result<()> {
        match self.database.read(None).await {
            Ok(_) => {
                tracing::debug!(database = %self.config.database_name, "Database already exists");
                Ok(())
            }
            Err(_) => {
                tracing::info!(database = %self.config.database_name, "Creating database");

                self.client
                    .create_database(&self.config.database_name, None)
                    .await
                    .map_err(|e| {
                        FerryError::CosmosDb(CosmosDbError::DatabaseCreationFailed(format!(
                            "Failed to create database: {e}"
                        )))
                    })?;

                tracing::info!(database = %self.config.database_name, "Database created successfully");
                Ok(())
            }
        }
    }

    /// Returns a client for `collection`, creating the container on first use
    pub async fn container(&self, collection: &str) -> Result<ContainerClient> {
        let container = self.database.container_client(collection);

        let mut ready = self.ready.lock().await;
        if ready.contains(collection) {
            return Ok(container);
        }

        if container.read(None).await.is_err() {
            tracing::info!(container = %collection, "Creating container");

            let properties = ContainerProperties {
                id: Cow::Owned(collection.to_string()),
                partition_key: PartitionKeyDefinition {
                    paths: vec![PARTITION_KEY_PATH.to_string()],
                    kind: azure_data_cosmos::models::PartitionKeyKind::Hash,
                    version: None,
                },
                indexing_policy: Some(IndexingPolicy::default()),
                ..Default::default()
            };

            self.database
                .create_container(properties, None)
                .await
                .map_err(|e| {
                    FerryError::CosmosDb(CosmosDbError::ContainerCreationFailed(format!(
                        "Failed to create container {collection}: {e}"
                    )))
                })?;

            tracing::info!(container = %collection, "Container created successfully");
        }

        ready.insert(collection.to_string());
        Ok(container)
    }

    /// Reads one document, returning `None` when it does not exist
    pub async fn read_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let container = self.container(collection).await?;

        match container
            .read_item::<Value>(PartitionKey::from(id.to_string()), id, None)
            .await
        {
            Ok(response) => {
                let document = response.into_body().map_err(|e| {
                    FerryError::CosmosDb(CosmosDbError::DeserializationFailed(format!(
                        "Failed to deserialize document {id}: {e}"
                    )))
                })?;
                Ok(Some(document))
            }
            Err(e) if is_not_found(&e.to_string()) => Ok(None),
            Err(e) => Err(FerryError::CosmosDb(CosmosDbError::QueryFailed(format!(
                "Failed to read document {id}: {e}"
            )))),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.config.database_name
    }

    pub fn max_retries(&self) -> usize {
        self.config.max_retries
    }
}

/// Cosmos reports missing items only through the error text
pub(crate) fn is_not_found(message: &str) -> bool {
    message.contains("404") || message.contains("NotFound")
}

/// True for rate-limited (429) responses
pub(crate) fn is_throttled(message: &str) -> bool {
    message.contains("429")
        || message.contains("TooManyRequests")
        || message.contains("Request rate is large")
}
