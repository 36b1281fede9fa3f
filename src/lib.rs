// Ferry - Relational snapshot to document store migration
// Copyright (c) 2025 Ferry Contributors
// Licensed under the MIT License

//! # Ferry - relational snapshots into document stores
//!
//! Ferry asks a relational database to export a table as JSON, reads the
//! newest export back, and writes every row as a document into a
//! document-oriented store.
//!
//! ## Overview
//!
//! For each table Ferry:
//! - **Fetches** the latest JSON export from the source
//! - **Decodes** it into records (a JSON array of objects)
//! - **Identifies** each record by a natural key or a content hash
//! - **Reconciles** the records with the target (insert-if-absent or upsert)
//!
//! Every table produces exactly one outcome; a failing table never stops the
//! others.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`api`] - Transport-agnostic `migrate` / `migrate_all` requests
//! - [`core`] - Decoding, identity, reconciliation and orchestration
//! - [`adapters`] - PostgreSQL, Cosmos DB, snapshot directory and memory stores
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferry::adapters::database::ConfiguredStoreProvider;
//! use ferry::api::{MigrateRequest, MigrationApi};
//! use ferry::config::load_config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("ferry.toml")?;
//!     let provider = Arc::new(ConfiguredStoreProvider::new(config.clone()));
//!     let api = MigrationApi::from_config(provider, &config)?;
//!
//!     let response = api.migrate(&MigrateRequest::for_table("tb_app_clientes")).await;
//!     println!("{} {:?}", response.status, response.json());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Adapters report [`domain::FerryError`]; the engine classifies failures
//! into [`domain::MigrationError`], which also decides the status code of a
//! single-table request.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
