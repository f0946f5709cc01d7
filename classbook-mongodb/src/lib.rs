//! MongoDB backend implementation for classbook.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters are translated into MongoDB query documents and updates are sent as `$set`
//! documents, so every search and write runs inside MongoDB's query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! classbook = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use classbook::{DataService, backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "school")
//!         .build()
//!         .await?;
//!     let service = DataService::new(store);
//!
//!     Ok(())
//! }
//! ```

pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
