//! Per-table outcomes and batch reports

use crate::domain::{MigrationError, TableName};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status of one table's migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// Every record was reconciled
    Success,
    /// The source held no payload for the table
    NoData,
    /// The payload was not a JSON array of objects
    DecodeError,
    /// Fetching or writing failed
    WriteError,
}

impl OutcomeStatus {
    fn for_error(error: &MigrationError) -> Self {
        match error {
            MigrationError::NoData { .. } => Self::NoData,
            MigrationError::Decode { .. } => Self::DecodeError,
            _ => Self::WriteError,
        }
    }
}

/// Result of migrating one table
///
/// Created once per table per run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMigrationOutcome {
    table_name: String,
    status: OutcomeStatus,
    exported_records: usize,
    inserted_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration_ms: u64,
    #[serde(skip)]
    failure: Option<MigrationError>,
}

impl TableMigrationOutcome {
    /// Outcome of a table whose records were all reconciled
    pub fn success(
        table: &TableName,
        exported_records: usize,
        inserted_records: usize,
        duration: Duration,
    ) -> Self {
        Self {
            table_name: table.as_str().to_string(),
            status: OutcomeStatus::Success,
            exported_records,
            inserted_records,
            error: None,
            duration_ms: duration_ms(duration),
            failure: None,
        }
    }

    /// Outcome of a failed table
    ///
    /// `exported_records` and `inserted_records` report what happened before
    /// the failure; a write failure carries its own committed count.
    pub fn failed(
        table: &TableName,
        error: MigrationError,
        exported_records: usize,
        duration: Duration,
    ) -> Self {
        let inserted_records = match &error {
            MigrationError::Write { written, .. } => *written,
            _ => 0,
        };
        Self::failed_with_counts(table, error, exported_records, inserted_records, duration)
    }

    /// Outcome of a table that was cut short with records already committed
    pub fn failed_with_counts(
        table: &TableName,
        error: MigrationError,
        exported_records: usize,
        inserted_records: usize,
        duration: Duration,
    ) -> Self {
        Self {
            table_name: table.as_str().to_string(),
            status: OutcomeStatus::for_error(&error),
            exported_records,
            inserted_records,
            error: Some(error.to_string()),
            duration_ms: duration_ms(duration),
            failure: Some(error),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    /// Records decoded from the payload
    pub fn exported_records(&self) -> usize {
        self.exported_records
    }

    /// Records written or updated in the target
    pub fn inserted_records(&self) -> usize {
        self.inserted_records
    }

    /// Error message for failed tables
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// The classified error behind a failed outcome
    pub fn failure(&self) -> Option<&MigrationError> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Outcomes of a `migrate-all` run, in configured table order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub message: String,
    pub results: Vec<TableMigrationOutcome>,
    pub total_exported: usize,
    pub total_inserted: usize,
    pub failed_tables: usize,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Builds a report from outcomes already in table order
    pub fn new(results: Vec<TableMigrationOutcome>, duration: Duration) -> Self {
        let total_exported = results.iter().map(|o| o.exported_records).sum();
        let total_inserted = results.iter().map(|o| o.inserted_records).sum();
        let failed_tables = results
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::DecodeError | OutcomeStatus::WriteError))
            .count();

        Self {
            message: "Migration of all tables completed.".to_string(),
            results,
            total_exported,
            total_inserted,
            failed_tables,
            duration_ms: duration_ms(duration),
        }
    }

    /// Outcome for one table
    pub fn outcome(&self, table: &str) -> Option<&TableMigrationOutcome> {
        self.results.iter().find(|o| o.table_name == table)
    }

    /// True when no table failed; tables without data do not count as failures
    pub fn is_successful(&self) -> bool {
        self.failed_tables == 0
    }

    /// Log the report
    pub fn log_summary(&self) {
        tracing::info!(
            tables = self.results.len(),
            total_exported = self.total_exported,
            total_inserted = self.total_inserted,
            failed_tables = self.failed_tables,
            duration_ms = self.duration_ms,
            "Migration of all tables completed"
        );

        for outcome in self.results.iter().filter(|o| !o.is_success()) {
            tracing::warn!(
                table = %outcome.table_name,
                status = ?outcome.status,
                error = outcome.error.as_deref().unwrap_or(""),
                "Table did not migrate"
            );
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(name: &str) -> TableName {
        TableName::new(name).unwrap()
    }

    #[test]
    fn test_success_outcome_serialization() {
        let outcome = TableMigrationOutcome::success(&table("tb_clients"), 1, 1, Duration::ZERO);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({
                "table_name": "tb_clients",
                "status": "Success",
                "exported_records": 1,
                "inserted_records": 1,
                "duration_ms": 0
            })
        );
    }

    #[test]
    fn test_failed_outcome_status_mapping() {
        let t = table("tb_x");
        let no_data = TableMigrationOutcome::failed(
            &t,
            MigrationError::NoData { table: "tb_x".into() },
            0,
            Duration::ZERO,
        );
        assert_eq!(no_data.status(), OutcomeStatus::NoData);

        let decode = TableMigrationOutcome::failed(
            &t,
            MigrationError::Decode {
                table: "tb_x".into(),
                message: "EOF".into(),
            },
            0,
            Duration::ZERO,
        );
        assert_eq!(decode.status(), OutcomeStatus::DecodeError);
        assert_eq!(decode.error(), Some("Error parsing JSON for table tb_x: EOF"));

        let timeout = TableMigrationOutcome::failed(
            &t,
            MigrationError::Timeout {
                table: "tb_x".into(),
                seconds: 5,
            },
            0,
            Duration::ZERO,
        );
        assert_eq!(timeout.status(), OutcomeStatus::WriteError);
    }

    #[test]
    fn test_write_failure_keeps_committed_count() {
        let outcome = TableMigrationOutcome::failed(
            &table("tb_x"),
            MigrationError::Write {
                table: "tb_x".into(),
                written: 4,
                message: "conflict".into(),
            },
            10,
            Duration::ZERO,
        );
        assert_eq!(outcome.exported_records(), 10);
        assert_eq!(outcome.inserted_records(), 4);
        assert!(matches!(outcome.failure(), Some(MigrationError::Write { .. })));
    }

    #[test]
    fn test_batch_report_totals() {
        let report = BatchReport::new(
            vec![
                TableMigrationOutcome::success(&table("a"), 3, 2, Duration::ZERO),
                TableMigrationOutcome::failed(
                    &table("b"),
                    MigrationError::NoData { table: "b".into() },
                    0,
                    Duration::ZERO,
                ),
                TableMigrationOutcome::failed(
                    &table("c"),
                    MigrationError::Decode {
                        table: "c".into(),
                        message: "bad".into(),
                    },
                    0,
                    Duration::ZERO,
                ),
            ],
            Duration::from_millis(1500),
        );

        assert_eq!(report.total_exported, 3);
        assert_eq!(report.total_inserted, 2);
        assert_eq!(report.failed_tables, 1);
        assert_eq!(report.duration_ms, 1500);
        assert!(!report.is_successful());
        assert_eq!(report.outcome("b").map(|o| o.status()), Some(OutcomeStatus::NoData));
    }
}
