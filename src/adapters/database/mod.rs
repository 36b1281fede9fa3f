//! Store abstraction layer
//!
//! Trait-based access to the relational source and the document target,
//! plus the providers that build them.

pub mod factory;
pub mod traits;

pub use factory::{
    create_source_store, create_target_store, ConfiguredStoreProvider, StaticStoreProvider,
};
pub use traits::{
    BulkInsertFailure, BulkInsertResult, SourceStore, StoreHandles, StoreProvider, TargetStore,
};
