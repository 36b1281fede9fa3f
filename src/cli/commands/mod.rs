//! CLI command implementations
//!
//! Exit codes: 0 success, 1 some tables failed, 2 invalid request or
//! configuration, 3 no data, 4 store connection failure, 5 fatal.

pub mod check;
pub mod init;
pub mod migrate;
pub mod migrate_all;
pub mod validate;

use crate::api::ApiResponse;
use crate::domain::MigrationError;

/// Exit code for a failed request
pub(crate) fn exit_code_for(error: &MigrationError) -> i32 {
    match error {
        MigrationError::Validation(_) => 2,
        MigrationError::NoData { .. } => 3,
        MigrationError::Connection(_) => 4,
        MigrationError::Snapshot(_) => 5,
        _ => 1,
    }
}

/// Exit code for a response; successful responses map to 0
pub(crate) fn exit_code(response: &ApiResponse) -> i32 {
    match &response.failure {
        Some(error) => exit_code_for(error),
        None if response.is_success() => 0,
        None => 5,
    }
}

/// Prints a response body to stdout
pub(crate) fn print_response(response: &ApiResponse) {
    if let Some(path) = response.file_path() {
        println!("📦 Snapshot written: {}", path.display());
    } else if let Some(body) = response.json() {
        match serde_json::to_string_pretty(body) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{body}"),
        }
    }
}
