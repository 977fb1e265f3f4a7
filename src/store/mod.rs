//! Generic document store the repositories are written against.
//!
//! Documents are JSON objects carrying a string `id`. Both backends evaluate
//! [`Filter`]s and apply [`Mutation`]s with the same code, so they only differ
//! in where the bytes live.

mod filter;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

pub use filter::{Filter, Mutation};
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use crate::error::StoreError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of `collection` matching `filter`, in id order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Applies `mutation` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        mutation: &Mutation,
    ) -> Result<UpdateResult, StoreError>;

    /// Stores `document` under its `id`, replacing any document with the same id.
    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }
}

pub(crate) fn document_id(document: &Value) -> Result<&str, StoreError> {
    document
        .get("id")
        .and_then(Value::as_str)
        .ok_or(StoreError::MissingId)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(collection: &str, document: Value) -> Result<T, StoreError> {
    serde_json::from_value(document).map_err(|err| StoreError::malformed(collection, err))
}

pub(crate) fn encode<T: serde::Serialize>(collection: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|err| StoreError::malformed(collection, err))
}
