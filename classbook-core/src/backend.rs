//! Storage backend abstraction.
//!
//! The [`StoreBackend`] trait is the data-access collaborator the services hand
//! translated queries to. Backends receive store-agnostic [`Expr`] filters and
//! [`Update`]s and return raw BSON documents whose ids are still store-native;
//! stringification happens above this layer.
//!
//! # Examples
//!
//! ```ignore
//! use classbook_core::{backend::StoreBackend, query::{Filter, Query}};
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let ids = backend.insert_documents(vec![doc! { "name": "A", "grade": 1 }], "classes").await?;
//! let found = backend
//!     .find_documents(Query::builder().filter(Filter::eq("grade", 1)).build(), "classes")
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{
    error::StoreResult,
    query::{Expr, Query},
    translate::Update,
};

/// Counts reported by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matching the filter.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks.
///
/// # Error Handling
///
/// Operations return [`StoreResult<T>`](crate::error::StoreResult). Backend failures are
/// reported as [`StoreError::Backend`](crate::error::StoreError::Backend); an empty result
/// is not an error at this level.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection and returns their assigned primary keys.
    ///
    /// Documents that already carry an `_id` keep it. The collection is created if
    /// it doesn't exist.
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> StoreResult<Vec<ObjectId>>;

    /// Returns the documents matching `query`, in store order.
    async fn find_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>>;

    /// Applies `update` to the first document matching `filter`, or to all of them when `multi`.
    async fn update_documents(
        &self,
        filter: &Expr,
        update: &Update,
        multi: bool,
        collection: &str,
    ) -> StoreResult<UpdateOutcome>;

    /// Deletes the first document matching `filter`, or all of them when `multi`,
    /// and returns how many were removed.
    async fn delete_documents(
        &self,
        filter: &Expr,
        multi: bool,
        collection: &str,
    ) -> StoreResult<u64>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends holding connections override it.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> StoreResult<Vec<ObjectId>> {
        (*self).insert_documents(documents, collection).await
    }

    async fn find_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        (*self).find_documents(query, collection).await
    }

    async fn update_documents(
        &self,
        filter: &Expr,
        update: &Update,
        multi: bool,
        collection: &str,
    ) -> StoreResult<UpdateOutcome> {
        (*self).update_documents(filter, update, multi, collection).await
    }

    async fn delete_documents(
        &self,
        filter: &Expr,
        multi: bool,
        collection: &str,
    ) -> StoreResult<u64> {
        (*self).delete_documents(filter, multi, collection).await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
