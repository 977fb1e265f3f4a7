use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{document_id, DocumentStore, Filter, Mutation, UpdateResult};
use crate::error::StoreError;

/// In-process store. Collections are kept ordered by id.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        mutation: &Mutation,
    ) -> Result<UpdateResult, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.values_mut().find(|document| filter.matches(document)))
        else {
            return Ok(UpdateResult::default());
        };

        let modified = mutation.apply(document);
        Ok(UpdateResult {
            matched: 1,
            modified: modified as u64,
        })
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        let id = document_id(&document)?.to_owned();
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id, document);
        Ok(())
    }
}
