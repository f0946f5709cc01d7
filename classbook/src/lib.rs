//! Main classbook crate: schema-validated data services for a school-management store.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! `classbook-core` and gives access to the storage backends.
//!
//! # Features
//!
//! - **Schema validation** - Every payload is checked against the entity's declared fields,
//!   types, and constraints
//! - **Query translation** - Dates become day-long windows, lists become membership tests,
//!   string ids become `ObjectId`s
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Stringified results** - Documents come back with string `id`s and without sensitive fields
//!
//! # Quick Start
//!
//! ```ignore
//! use classbook::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = DataService::new(InMemoryStore::builder().build().await.unwrap());
//!
//!     let class = json!({ "name": "3A", "grade": 3, "creation": "2023-09-01T08:00:00Z" });
//!     let id = service
//!         .create_one(EntityKind::Class, class.as_object().unwrap())
//!         .await
//!         .unwrap();
//!
//!     // Query strings use the same decoding as the HTTP layer
//!     let classes = service
//!         .read_encoded(EntityKind::Class, "grade=3", ReadOptions::new().multi())
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(classes[0].get_str("id").unwrap(), id);
//!
//!     service.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use classbook_core::{
    backend, config, decode, error, query, reference, registry, schema, service, translate,
    validate, value,
};

pub use classbook_core::{
    config::ServiceConfig,
    error::{QueryError, StoreError, StoreResult},
    schema::EntityKind,
    service::{DataService, ReadOptions},
    value::RawQuery,
};

// Re-export BSON and JSON types for convenience
pub use bson;
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use classbook_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use classbook_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
