//! Snapshot directory source
//!
//! Replays exports saved as `<dir>/<table>.json`, for example files written
//! by an earlier export run and renamed. Files are streamed to the decoder.

use crate::adapters::database::traits::SourceStore;
use crate::domain::{ExportPayload, FerryError, Result, TableName};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Source reading one JSON file per table
pub struct SnapshotDirSource {
    dir: PathBuf,
}

impl SnapshotDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot for `table`
    pub fn path_for(&self, table: &TableName) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }
}

#[async_trait]
impl SourceStore for SnapshotDirSource {
    fn name(&self) -> &'static str {
        "snapshot_dir"
    }

    async fn test_connection(&self) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.dir).await.map_err(|e| {
            FerryError::Connection(format!(
                "Snapshot directory {} is not accessible: {e}",
                self.dir.display()
            ))
        })?;

        if !metadata.is_dir() {
            return Err(FerryError::Connection(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }

        Ok(())
    }

    async fn fetch_export(&self, table: &TableName) -> Result<Option<ExportPayload>> {
        let path = self.path_for(table);

        match tokio::fs::File::open(&path).await {
            Ok(file) => {
                tracing::debug!(table = %table, path = %path.display(), "Replaying snapshot");
                Ok(Some(ExportPayload::from_reader(file)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FerryError::Io(format!(
                "Failed to open snapshot {}: {e}",
                path.display()
            ))),
        }
    }
}
