//! Snapshot files
//!
//! In export mode the identified records are written to JSON files instead of
//! the target store: `<table>_<timestamp>.json` for one table, or
//! `all_tables_<timestamp>.json` holding an object keyed by table name.

use crate::domain::{MigrationError, Record, TableName};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::{Path, PathBuf};

/// Writes snapshot files below a fixed directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Creates a writer; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes one table's records
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Snapshot`] if the directory or file cannot be
    /// written.
    pub async fn write_table(
        &self,
        table: &TableName,
        records: &[Record],
    ) -> Result<PathBuf, MigrationError> {
        let path = self.dir.join(format!("{}_{}.json", table, timestamp()));
        self.write_json(&path, &records).await?;
        Ok(path)
    }

    /// Writes the records of several tables into one file, in the given order
    pub async fn write_all(
        &self,
        tables: &[(TableName, Vec<Record>)],
    ) -> Result<PathBuf, MigrationError> {
        let path = self.dir.join(format!("all_tables_{}.json", timestamp()));
        self.write_json(&path, &TablesByName(tables)).await?;
        Ok(path)
    }

    async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), MigrationError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MigrationError::Snapshot(format!(
                "failed to create {}: {e}",
                self.dir.display()
            ))
        })?;

        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| MigrationError::Snapshot(format!("failed to serialize snapshot: {e}")))?;

        tokio::fs::write(path, bytes).await.map_err(|e| {
            MigrationError::Snapshot(format!("failed to write {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "Snapshot written");
        Ok(())
    }
}

/// Serializes table/record pairs as a JSON object without reordering keys
struct TablesByName<'a>(&'a [(TableName, Vec<Record>)]);

impl Serialize for TablesByName<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (table, records) in self.0 {
            map.serialize_entry(table.as_str(), records)?;
        }
        map.end()
    }
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}
