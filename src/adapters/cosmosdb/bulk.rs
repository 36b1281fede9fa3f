//! Document writes with throttling retries

use super::client::is_throttled;
use crate::domain::{CosmosDbError, FerryError, Result};
use azure_data_cosmos::clients::ContainerClient;
use azure_data_cosmos::PartitionKey;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

/// Which write to issue
#[derive(Debug, Clone, Copy)]
pub enum WriteKind {
    /// Fails if the document exists
    Create,
    /// Replaces the document if it exists
    Upsert,
}

/// Writes a document with exponential backoff on throttling
///
/// The delay starts at one second, doubles per retry and is capped at 30s.
pub async fn write_with_retry(
    container: &ContainerClient,
    id: &str,
    document: &Value,
    kind: WriteKind,
    max_retries: usize,
) -> Result<()> {
    let mut retry_count = 0;
    let mut delay_ms = 1000;

    loop {
        let partition_key = PartitionKey::from(id.to_string());
        let response = match kind {
            WriteKind::Create => container
                .create_item(partition_key, document.clone(), None)
                .await
                .map(|_| ()),
            WriteKind::Upsert => container
                .upsert_item(partition_key, document.clone(), None)
                .await
                .map(|_| ()),
        };

        let e = match response {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let message = e.to_string();
        if is_throttled(&message) && retry_count < max_retries {
            tracing::warn!(
                id = %id,
                retry_count = retry_count,
                delay_ms = delay_ms,
                "Throttled by Cosmos DB, retrying after delay"
            );

            sleep(Duration::from_millis(delay_ms)).await;

            retry_count += 1;
            delay_ms = (delay_ms * 2).min(30_000);
            continue;
        }

        let detail = format!("document {id} after {retry_count} retries: {message}");
        return Err(FerryError::CosmosDb(match kind {
            WriteKind::Create => CosmosDbError::InsertFailed(detail),
            WriteKind::Upsert => CosmosDbError::UpdateFailed(detail),
        }));
    }
}
