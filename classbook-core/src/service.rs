//! Data services: the request-facing entry points of the store.
//!
//! A [`DataService`] runs every request through the same pipeline:
//!
//! 1. validate the raw payload against the entity's schema
//! 2. translate it into a store query or update
//! 3. execute it on the [`StoreBackend`]
//! 4. stringify ids (and hide sensitive fields) on the way back
//!
//! Validation and translation failures are reported before the backend is touched.
//!
//! # Example
//!
//! ```ignore
//! use classbook_core::{service::{DataService, ReadOptions}, schema::EntityKind};
//! use classbook_memory::InMemoryStore;
//! use serde_json::json;
//!
//! let service = DataService::new(InMemoryStore::new());
//! let search = json!({ "grade": 5 }).as_object().cloned().unwrap();
//!
//! let classes = service.read(EntityKind::Class, &search, ReadOptions::new().multi()).await?;
//! ```

use bson::Document;
use tracing::{debug, info, warn};

use crate::{
    backend::{StoreBackend, UpdateOutcome},
    config::ServiceConfig,
    decode::decode_query,
    error::{QueryError, StoreError, StoreResult},
    query::{Expr, Query},
    reference::{ID_FIELD, hide_fields, stringify},
    schema::EntityKind,
    translate::{Update, creation_document, translate_search, translate_write},
    validate::{validate, validate_document},
    value::RawQuery,
};

/// Options for [`DataService::read`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Include sensitive fields (passwords, phone numbers) in the results.
    pub sensitive: bool,
    /// Return every match instead of the first one.
    pub multi: bool,
    /// Overrides [`ServiceConfig::strict_lists`] for this read.
    pub strict: Option<bool>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// Validating, translating front end to a storage backend.
#[derive(Debug)]
pub struct DataService<B: StoreBackend> {
    backend: B,
    config: ServiceConfig,
}

impl<B: StoreBackend> DataService<B> {
    /// Creates a service with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ServiceConfig::default())
    }

    pub fn with_config(backend: B, config: ServiceConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The collection holding documents of `kind`.
    pub fn collection_name(&self, kind: EntityKind) -> &str {
        self.config.collections.get(kind)
    }

    /// Reads the documents matching `search`.
    ///
    /// Returns only the first match unless [`ReadOptions::multi`] is set. Ids are
    /// returned as strings under `id`; sensitive fields are removed unless requested.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Query`] if `search` fails validation or translation
    /// - [`StoreError::NotFound`] if nothing matches
    pub async fn read(
        &self,
        kind: EntityKind,
        search: &RawQuery,
        options: ReadOptions,
    ) -> StoreResult<Vec<Document>> {
        let collection = self.collection_name(kind);
        let strict = options.strict.unwrap_or(self.config.strict_lists);
        let filter = self.search_filter(kind, search, strict)?;

        let mut query = Query::builder().filter(filter);
        if !options.multi {
            query = query.limit(1);
        }

        debug!(collection = %collection, multi = options.multi, strict, "Reading documents");

        let hidden = match options.sensitive {
            true => Vec::new(),
            false => kind.schema().sensitive_fields().collect(),
        };

        let documents = self
            .backend
            .find_documents(query.build(), collection)
            .await?
            .into_iter()
            .map(|document| hide_fields(stringify(document), hidden.iter().copied()))
            .collect::<Vec<_>>();

        if documents.is_empty() {
            return Err(StoreError::NotFound(collection.to_string()));
        }

        Ok(documents)
    }

    /// Like [`read`](Self::read), taking the encoded query-string form of the search.
    pub async fn read_encoded(
        &self,
        kind: EntityKind,
        search: &str,
        options: ReadOptions,
    ) -> StoreResult<Vec<Document>> {
        self.read(kind, &decode_query(search), options).await
    }

    /// Sets the fields in `changes` on the documents matching `search`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Query`] if either payload fails validation or translation, or
    ///   if `changes` tries to set the primary key
    /// - [`StoreError::InvalidDocument`] if `changes` sets nothing
    /// - [`StoreError::NotFound`] if nothing matches
    /// - [`StoreError::AlreadyUpToDate`] if the matches already held the values
    pub async fn update(
        &self,
        kind: EntityKind,
        search: &RawQuery,
        changes: &RawQuery,
        multi: bool,
    ) -> StoreResult<UpdateOutcome> {
        let collection = self.collection_name(kind);
        let filter = self.search_filter(kind, search, self.config.strict_lists)?;
        let update = self.write_update(kind, changes)?;

        if update.is_empty() {
            return Err(StoreError::InvalidDocument("the update sets no fields".to_string()));
        }

        debug!(collection = %collection, multi, "Updating documents");

        let outcome = self
            .backend
            .update_documents(&filter, &update, multi, collection)
            .await?;

        if outcome.matched == 0 {
            return Err(StoreError::NotFound(collection.to_string()));
        }
        if outcome.modified == 0 {
            return Err(StoreError::AlreadyUpToDate(collection.to_string()));
        }

        info!(collection = %collection, count = outcome.modified, "Documents updated");

        Ok(outcome)
    }

    /// Like [`update`](Self::update), taking the encoded query-string form of the search.
    pub async fn update_encoded(
        &self,
        kind: EntityKind,
        search: &str,
        changes: &RawQuery,
        multi: bool,
    ) -> StoreResult<UpdateOutcome> {
        self.update(kind, &decode_query(search), changes, multi).await
    }

    /// Creates one document per payload and returns their ids.
    ///
    /// Each payload must be a complete document; defaults fill omitted optional
    /// fields and any `id` is ignored. Nothing is inserted if any payload is invalid.
    pub async fn create(
        &self,
        kind: EntityKind,
        documents: &[RawQuery],
    ) -> StoreResult<Vec<String>> {
        let collection = self.collection_name(kind);

        let prepared = documents
            .iter()
            .map(|raw| {
                validate_document(kind.schema(), raw)
                    .and_then(|validated| creation_document(&validated))
                    .map_err(|err| rejected(kind, err))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        if prepared.is_empty() {
            return Err(StoreError::InvalidDocument("nothing to create".to_string()));
        }

        let ids = self
            .backend
            .insert_documents(prepared, collection)
            .await?;

        info!(collection = %collection, count = ids.len(), "Documents created");

        Ok(ids.into_iter().map(|id| id.to_hex()).collect())
    }

    /// Creates a single document and returns its id.
    pub async fn create_one(&self, kind: EntityKind, document: &RawQuery) -> StoreResult<String> {
        self.create(kind, std::slice::from_ref(document))
            .await?
            .pop()
            .ok_or_else(|| StoreError::Backend("the store returned no id".to_string()))
    }

    /// Deletes the first document matching `search`, or all of them when `multi`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Query`] if `search` fails validation or translation
    /// - [`StoreError::DeletionFailed`] if nothing was deleted
    pub async fn delete(
        &self,
        kind: EntityKind,
        search: &RawQuery,
        multi: bool,
    ) -> StoreResult<u64> {
        let collection = self.collection_name(kind);
        let filter = self.search_filter(kind, search, self.config.strict_lists)?;

        debug!(collection = %collection, multi, "Deleting documents");

        let deleted = self
            .backend
            .delete_documents(&filter, multi, collection)
            .await?;

        if deleted == 0 {
            return Err(StoreError::DeletionFailed(collection.to_string()));
        }

        info!(collection = %collection, count = deleted, "Documents deleted");

        Ok(deleted)
    }

    /// Like [`delete`](Self::delete), taking the encoded query-string form of the search.
    pub async fn delete_encoded(
        &self,
        kind: EntityKind,
        search: &str,
        multi: bool,
    ) -> StoreResult<u64> {
        self.delete(kind, &decode_query(search), multi).await
    }

    /// Shuts down the service and releases backend resources.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }

    fn search_filter(
        &self,
        kind: EntityKind,
        search: &RawQuery,
        strict: bool,
    ) -> StoreResult<Expr> {
        validate(kind.schema(), search)
            .and_then(|validated| translate_search(&validated, strict))
            .map_err(|err| rejected(kind, err))
    }

    fn write_update(&self, kind: EntityKind, changes: &RawQuery) -> StoreResult<Update> {
        validate(kind.schema(), changes)
            .and_then(|validated| match validated.contains(ID_FIELD) {
                true => Err(QueryError::ConstraintViolation {
                    field: ID_FIELD.to_string(),
                    reason: "the primary key cannot be changed".to_string(),
                }),
                false => translate_write(&validated),
            })
            .map_err(|err| rejected(kind, err))
    }
}

fn rejected(kind: EntityKind, err: QueryError) -> StoreError {
    warn!(entity = %kind, error = %err, "Rejected request payload");
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::{doc, oid::ObjectId};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Records what reaches the backend and answers with canned results.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        found: Vec<Document>,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl StoreBackend for RecordingBackend {
        async fn insert_documents(
            &self,
            documents: Vec<Document>,
            collection: &str,
        ) -> StoreResult<Vec<ObjectId>> {
            self.record(format!("insert {collection} {}", documents.len()));
            Ok(documents.iter().map(|_| ObjectId::new()).collect())
        }

        async fn find_documents(
            &self,
            query: Query,
            collection: &str,
        ) -> StoreResult<Vec<Document>> {
            self.record(format!("find {collection} limit={:?}", query.limit));
            Ok(self.found.clone())
        }

        async fn update_documents(
            &self,
            _filter: &Expr,
            _update: &Update,
            multi: bool,
            collection: &str,
        ) -> StoreResult<UpdateOutcome> {
            self.record(format!("update {collection} multi={multi}"));
            Ok(UpdateOutcome { matched: 1, modified: 0 })
        }

        async fn delete_documents(
            &self,
            _filter: &Expr,
            multi: bool,
            collection: &str,
        ) -> StoreResult<u64> {
            self.record(format!("delete {collection} multi={multi}"));
            Ok(0)
        }
    }

    fn raw(value: Value) -> RawQuery {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn invalid_payloads_never_reach_the_backend() {
        let service = DataService::new(RecordingBackend::default());

        let err = service
            .read(EntityKind::Class, &raw(json!({ "unknown_field": 1 })), ReadOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 422);
        assert!(service.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn single_reads_are_limited_to_one_document() {
        let id = ObjectId::new();
        let backend = RecordingBackend {
            found: vec![doc! {
                "_id": id,
                "name": "Ada",
                "password": "hash",
                "phone": "+393715485996",
            }],
            ..Default::default()
        };
        let service = DataService::new(backend);

        let documents = service
            .read(EntityKind::Teacher, &raw(json!({ "name": "Ada" })), ReadOptions::new())
            .await
            .unwrap();

        assert_eq!(service.backend().calls(), vec!["find teachers limit=Some(1)"]);
        assert_eq!(documents, vec![doc! { "id": id.to_hex(), "name": "Ada" }]);
    }

    #[tokio::test]
    async fn sensitive_reads_keep_every_field() {
        let backend = RecordingBackend {
            found: vec![doc! { "name": "Ada", "password": "hash" }],
            ..Default::default()
        };
        let service = DataService::new(backend);

        let documents = service
            .read(EntityKind::Admin, &raw(json!({})), ReadOptions::new().multi().sensitive())
            .await
            .unwrap();

        assert_eq!(documents[0].get_str("password").unwrap(), "hash");
        assert_eq!(service.backend().calls(), vec!["find admins limit=None"]);
    }

    #[tokio::test]
    async fn empty_reads_are_not_found() {
        let service = DataService::new(RecordingBackend::default());

        let err = service
            .read(EntityKind::Score, &raw(json!({})), ReadOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(ref collection) if collection == "scores"));
    }

    #[tokio::test]
    async fn unchanged_updates_are_already_up_to_date() {
        let service = DataService::new(RecordingBackend::default());

        let err = service
            .update(
                EntityKind::Class,
                &raw(json!({ "name": "A" })),
                &raw(json!({ "grade": 2 })),
                true,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyUpToDate(_)));
        assert_eq!(service.backend().calls(), vec!["update classes multi=true"]);
    }

    #[tokio::test]
    async fn updates_cannot_change_the_primary_key() {
        let service = DataService::new(RecordingBackend::default());
        let changes = raw(json!({ "id": ObjectId::new().to_hex(), "grade": 2 }));

        let err = service
            .update(EntityKind::Class, &raw(json!({ "grade": 3 })), &changes, true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Query(QueryError::ConstraintViolation { ref field, .. }) if field == "id"
        ));
        assert!(service.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn empty_updates_are_rejected() {
        let service = DataService::new(RecordingBackend::default());

        let err = service
            .update(EntityKind::Class, &raw(json!({ "name": "A" })), &raw(json!({})), false)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(service.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn failed_deletes_are_reported() {
        let service = DataService::new(RecordingBackend::default());

        let err = service
            .delete_encoded(EntityKind::Class, "name=A", false)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 410);
    }

    #[tokio::test]
    async fn one_invalid_document_blocks_the_whole_creation() {
        let service = DataService::new(RecordingBackend::default());
        let valid = raw(json!({ "name": "A", "grade": 1, "creation": "2023-09-01T08:00:00" }));
        let invalid = raw(json!({ "name": "B", "grade": 40, "creation": "2023-09-01T08:00:00" }));

        let err = service
            .create(EntityKind::Class, &[valid, invalid])
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Query(QueryError::ConstraintViolation { .. })));
        assert!(service.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn configured_collections_are_used() {
        let mut config = ServiceConfig::default();
        config.collections.classes = "Classes".to_string();
        let service = DataService::with_config(RecordingBackend::default(), config);

        let ids = service
            .create_one(
                EntityKind::Class,
                &raw(json!({ "name": "A", "grade": 1, "creation": "2023-09-01T08:00:00" })),
            )
            .await
            .unwrap();

        assert_eq!(ids.len(), 24);
        assert_eq!(service.backend().calls(), vec!["insert Classes 1"]);
    }
}
