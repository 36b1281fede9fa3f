//! Logging
//!
//! Console output plus an optional JSON log file with rotation.
//!
//! # Example
//!
//! ```no_run
//! use ferry::config::LoggingConfig;
//! use ferry::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "tb_app_clientes", "Starting migration for table");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};
