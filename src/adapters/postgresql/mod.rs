//! PostgreSQL integration
//!
//! PostgreSQL serves both ends of a migration: as the relational source
//! running the export procedure and as a JSONB document target.

pub mod adapter;
pub mod client;
pub mod source;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use source::PostgreSQLSource;
