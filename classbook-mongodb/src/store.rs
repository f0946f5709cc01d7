//! MongoDB storage implementation.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, info};

use classbook_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{StoreError, StoreResult},
    query::{Expr, Query},
    translate::Update,
};

use crate::query::MongoQueryTranslator;

fn backend_error(err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> StoreResult<Vec<ObjectId>> {
        let result = self
            .get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(backend_error)?;

        let mut inserted = result.inserted_ids.into_iter().collect::<Vec<_>>();
        inserted.sort_by_key(|(index, _)| *index);

        inserted
            .into_iter()
            .map(|(_, id)| match id {
                Bson::ObjectId(id) => Ok(id),
                other => Err(StoreError::Backend(format!("unexpected primary key {other}"))),
            })
            .collect()
    }

    async fn find_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }

        let filter = MongoQueryTranslator::filter(query.filter.as_ref())?;
        debug!(collection, filter = %filter, "Finding documents");

        self.get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn update_documents(
        &self,
        filter: &Expr,
        update: &Update,
        multi: bool,
        collection: &str,
    ) -> StoreResult<UpdateOutcome> {
        let filter = MongoQueryTranslator::filter(Some(filter))?;
        let collection = self.get_collection(collection);

        let result = match multi {
            true => collection.update_many(filter, update.to_document()).await,
            false => collection.update_one(filter, update.to_document()).await,
        }
        .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_documents(
        &self,
        filter: &Expr,
        multi: bool,
        collection: &str,
    ) -> StoreResult<u64> {
        let filter = MongoQueryTranslator::filter(Some(filter))?;
        let collection = self.get_collection(collection);

        let result = match multi {
            true => collection.delete_many(filter).await,
            false => collection.delete_one(filter).await,
        }
        .map_err(backend_error)?;

        Ok(result.deleted_count)
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.client.shutdown().await;
        info!(database = %self.database, "MongoDB client shut down");

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        let client = Client::with_options(options)
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        info!(database = %self.database, "Connected to MongoDB");

        Ok(MongoDbStore::new(client, self.database))
    }
}
