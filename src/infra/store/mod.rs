mod bucket;
mod memory;
mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::warn;

pub use bucket::{GridFsImages, ImageBucket, MemoryImages, StoredImage};
pub use memory::MemoryStore;
pub use mongo::MongoRep;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("error querying value")]
    QueryError(#[from] mongodb::error::Error),
    #[error("could not encode record: {0}")]
    Encode(#[from] bson::ser::Error),
    #[error("could not decode record: {0}")]
    Decode(#[from] bson::de::Error),
    #[error("object storage i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw document access against named collections.
///
/// Documents are keyed by opaque string ids. Every call is an independent
/// round trip; there are no transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError>;

    /// Insert or fully replace.
    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Shallow merge of `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
    ) -> Result<Vec<Document>, StoreError>;

    async fn list(&self, collection: &str, limit: Option<i64>)
        -> Result<Vec<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Typed façade over a [`DocumentStore`], managed as Rocket state.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<dyn DocumentStore>,
}

impl Gateway {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Gateway { inner }
    }

    pub fn in_memory() -> Self {
        Gateway::new(Arc::new(MemoryStore::default()))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<T, StoreError> {
        let doc = self.inner.get(collection, id).await?;
        Ok(bson::from_document(doc)?)
    }

    /// Like [`Gateway::get`] but maps a missing document to `None`.
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.get(collection, id).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let doc = bson::to_document(record)?;
        self.inner.put(collection, id, doc).await
    }

    /// Merges the non-skipped fields of `patch` into the stored document.
    pub async fn update<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        patch: &T,
    ) -> Result<(), StoreError> {
        let fields = bson::to_document(patch)?;
        self.inner.update(collection, id, fields).await
    }

    #[cfg(test)]
    pub async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: impl Into<Bson>,
    ) -> Result<Vec<T>, StoreError> {
        let docs = self.inner.query(collection, field, value.into()).await?;
        Ok(decode_all(collection, docs))
    }

    pub async fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        self.list_limited(collection, None).await
    }

    pub async fn list_limited<T: DeserializeOwned>(
        &self,
        collection: &str,
        limit: Option<i64>,
    ) -> Result<Vec<T>, StoreError> {
        let docs = self.inner.list(collection, limit).await?;
        Ok(decode_all(collection, docs))
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
}

/// Documents that no longer match the record shape are skipped, not fatal.
fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match bson::from_document(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection, error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}
