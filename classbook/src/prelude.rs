//! Convenient re-exports of commonly used types from classbook.
//!
//! ```ignore
//! use classbook::prelude::*;
//! ```

pub use classbook_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    config::{CollectionNames, ServiceConfig},
    decode::decode_query,
    error::{QueryError, QueryResult, StoreError, StoreResult},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor},
    reference::{hide_fields, stringify},
    registry::SchemaRegistry,
    schema::{Constraint, EntityKind, FieldDecl, FieldType, Schema},
    service::{DataService, ReadOptions},
    translate::{Mode, Translation, Update, translate, translate_search, translate_write},
    validate::{validate, validate_document},
    value::{FieldValue, RawQuery, ValidatedQuery},
};
