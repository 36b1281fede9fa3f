//! Domain models and types for Ferry.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`TableName`])
//! - **Data model** ([`Record`], [`ExportPayload`])
//! - **Error types** ([`FerryError`], [`CosmosDbError`], [`MigrationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! Adapters return [`Result<T, FerryError>`]. The migration engine turns
//! adapter failures into a [`MigrationError`] that names the table it belongs
//! to:
//!
//! ```rust
//! use ferry::domain::{MigrationError, Result};
//!
//! fn example() -> Result<()> {
//!     Err(MigrationError::NoData { table: "tb_app_clientes".to_string() }.into())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{CosmosDbError, FerryError, MigrationError};
pub use ids::TableName;
pub use record::{ExportPayload, PayloadReader, Record};
pub use result::Result;
