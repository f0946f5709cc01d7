//! The query-translation core of the classbook school-management store.
//!
//! Every request payload flows through the same layers before it reaches a document
//! store:
//!
//! - **Schemas** ([`schema`], [`registry`]) - The fields each entity kind accepts, with their
//!   types and constraints
//! - **Validation** ([`validate`]) - Coercion of raw JSON payloads into typed
//!   [`value::ValidatedQuery`]s
//! - **Translation** ([`translate`]) - Rewriting validated queries into store filters and
//!   `$set` updates
//! - **References** ([`reference`]) - Conversion between string ids and store-native `ObjectId`s
//! - **Query AST** ([`query`]) - Store-agnostic filter expressions and the visitor
//!   backends implement
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage
//!   backends
//! - **Data services** ([`service`]) - The validate, translate, execute, stringify
//!   pipeline
//! - **Configuration** ([`config`]) - Collection names, list matching, and validation bounds
//! - **Error handling** ([`error`]) - Error types with their HTTP status mapping
//!
//! # Example
//!
//! ```ignore
//! use classbook_core::{schema::EntityKind, translate::translate_search, validate::validate};
//! use serde_json::json;
//!
//! let search = json!({ "grade": 5, "type": ["lab"] });
//! let validated = validate(EntityKind::Class.schema(), search.as_object().unwrap())?;
//! let filter = translate_search(&validated, false)?;
//! ```

pub mod backend;
pub mod config;
pub mod decode;
pub mod error;
pub mod query;
pub mod reference;
pub mod registry;
pub mod schema;
pub mod service;
pub mod translate;
pub mod validate;
pub mod value;
