//! In-memory document storage backend for classbook.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Document-store semantics** - `ObjectId` primary keys, list membership, half-open date ranges
//! - **Single and multi operations** - Updates and deletes on the first or on every match
//!
//! # Quick Start
//!
//! ```ignore
//! use classbook::{DataService, EntityKind, ReadOptions, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = DataService::new(InMemoryStore::builder().build().await?);
//!
//!     let class = json!({ "name": "A", "grade": 1, "creation": "2023-09-01T08:00:00Z" });
//!     let id = service.create_one(EntityKind::Class, class.as_object().unwrap()).await?;
//!
//!     let search = json!({ "id": id }).as_object().cloned().unwrap();
//!     let classes = service.read(EntityKind::Class, &search, ReadOptions::new()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
