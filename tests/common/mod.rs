//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;

/// A snapshot directory plus a config file pointing at it
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("snapshots")).unwrap();
        Self { dir }
    }

    pub fn snapshots(&self) -> std::path::PathBuf {
        self.dir.path().join("snapshots")
    }

    pub fn exports(&self) -> std::path::PathBuf {
        self.dir.path().join("exports")
    }

    /// Writes `<snapshots>/<table>.json`
    pub fn snapshot(&self, table: &str, payload: &str) {
        std::fs::write(self.snapshots().join(format!("{table}.json")), payload).unwrap();
    }

    /// Config text for the memory target reading from the snapshot directory
    pub fn config(&self, tables: &[&str], migration_extra: &str) -> String {
        memory_config(&self.snapshots(), &self.exports(), tables, migration_extra)
    }
}

pub fn memory_config(
    snapshots: &Path,
    exports: &Path,
    tables: &[&str],
    migration_extra: &str,
) -> String {
    let tables = tables
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
database_target = "memory"

[source]
kind = "snapshot_dir"
snapshot_dir = "{}"

[migration]
tables = [{tables}]
export_dir = "{}"
{migration_extra}
"#,
        snapshots.display(),
        exports.display()
    )
}
