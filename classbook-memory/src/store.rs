//! In-memory storage implementation.
//!
//! Collections are vectors of BSON documents kept in insertion order behind an
//! async-aware read-write lock.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use classbook_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::StoreResult,
    query::{Expr, Query},
    reference::PRIMARY_KEY,
    translate::Update,
};

use crate::evaluator::DocumentEvaluator;

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// Documents keep the store-native shape a real document store would give them:
/// each carries an `ObjectId` under `_id`, assigned on insert when missing.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing). For larger datasets,
/// use a persistent backend like MongoDB.
///
/// # Example
///
/// ```ignore
/// use classbook_memory::InMemoryStore;
/// use classbook_core::{backend::StoreBackend, query::{Filter, Query}};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let ids = store.insert_documents(vec![doc! { "name": "A", "grade": 1 }], "classes").await?;
///
/// let query = Query::builder().filter(Filter::eq("_id", ids[0])).build();
/// assert_eq!(store.find_documents(query, "classes").await?.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents, in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Number of documents held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Positions of the documents matching `filter`, stopping after the first one unless `multi`.
    fn matching(documents: &[Document], filter: &Expr, multi: bool) -> StoreResult<Vec<usize>> {
        let limit = if multi { usize::MAX } else { 1 };
        let mut positions = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if positions.len() == limit {
                break;
            }
            if DocumentEvaluator::matches(document, Some(filter))? {
                positions.push(position);
            }
        }

        Ok(positions)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> StoreResult<Vec<ObjectId>> {
        let mut store = self.store.write().await;
        let collection_docs = store.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());

        for mut document in documents {
            let id = match document.get_object_id(PRIMARY_KEY) {
                Ok(id) => id,
                Err(_) => {
                    let id = ObjectId::new();
                    document.insert(PRIMARY_KEY, id);
                    id
                }
            };

            collection_docs.push(document);
            ids.push(id);
        }

        trace!(collection, count = ids.len(), "Inserted documents in memory");

        Ok(ids)
    }

    async fn find_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(collection_docs) = store.get(collection) else {
            return Ok(vec![]);
        };

        let limit = query.limit.unwrap_or(usize::MAX);
        let mut found = Vec::new();

        for document in collection_docs {
            if found.len() == limit {
                break;
            }
            if DocumentEvaluator::matches(document, query.filter.as_ref())? {
                found.push(document.clone());
            }
        }

        Ok(found)
    }

    async fn update_documents(
        &self,
        filter: &Expr,
        update: &Update,
        multi: bool,
        collection: &str,
    ) -> StoreResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let Some(collection_docs) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        let positions = Self::matching(collection_docs, filter, multi)?;
        let mut outcome = UpdateOutcome {
            matched: positions.len() as u64,
            modified: 0,
        };

        for position in positions {
            let document = &mut collection_docs[position];
            let mut changed = false;

            for (field, value) in update.fields() {
                if document.get(field) != Some(value) {
                    document.insert(field.clone(), value.clone());
                    changed = true;
                }
            }

            if changed {
                outcome.modified += 1;
            }
        }

        Ok(outcome)
    }

    async fn delete_documents(
        &self,
        filter: &Expr,
        multi: bool,
        collection: &str,
    ) -> StoreResult<u64> {
        let mut store = self.store.write().await;
        let Some(collection_docs) = store.get_mut(collection) else {
            return Ok(0);
        };

        let positions = Self::matching(collection_docs, filter, multi)?;

        // Back to front so earlier positions stay valid.
        for position in positions.iter().rev() {
            collection_docs.remove(*position);
        }

        Ok(positions.len() as u64)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`].
    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
