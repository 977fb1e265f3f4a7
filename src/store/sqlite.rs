use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use super::{document_id, DocumentStore, Filter, Mutation, UpdateResult};
use crate::error::StoreError;

/// Documents stored as JSON text in a single sqlite table, keyed by
/// `(collection, id)`. Filtering happens after the rows are loaded.
///
/// Writes from this process go one at a time, and each update holds the
/// database write lock from its read to its commit.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl SqliteDocumentStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn decode(collection: &str, body: &str) -> Result<Value, StoreError> {
        serde_json::from_str(body).map_err(|err| StoreError::malformed(collection, err))
    }

    /// Body of `update_one`; the caller owns the transaction.
    async fn update_locked(
        conn: &mut SqliteConnection,
        collection: &str,
        filter: &Filter,
        mutation: &Mutation,
    ) -> Result<UpdateResult, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT id,body FROM documents WHERE collection=? ORDER BY id")
            .bind(collection)
            .fetch_all(&mut *conn)
            .await?;

        for (id, body) in rows {
            let mut document = Self::decode(collection, &body)?;
            if !filter.matches(&document) {
                continue;
            }

            let modified = mutation.apply(&mut document);
            if modified {
                sqlx::query("UPDATE documents SET body=? WHERE collection=? AND id=?")
                    .bind(document.to_string())
                    .bind(collection)
                    .bind(&id)
                    .execute(&mut *conn)
                    .await?;
            }

            return Ok(UpdateResult {
                matched: 1,
                modified: modified as u64,
            });
        }

        Ok(UpdateResult::default())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT body FROM documents WHERE collection=? ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut documents = Vec::new();
        for (body,) in rows {
            let document = Self::decode(collection, &body)?;
            if filter.matches(&document) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        mutation: &Mutation,
    ) -> Result<UpdateResult, StoreError> {
        let _writer = self.writer.lock().await;
        let mut conn = self.pool.acquire().await?;

        // Write lock before the read; a deferred read that later upgrades gets SQLITE_BUSY.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        let result = Self::update_locked(&mut conn, collection, filter, mutation).await;
        let end = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        sqlx::query(end).execute(&mut *conn).await?;
        result
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        let id = document_id(&document)?;
        let _writer = self.writer.lock().await;
        sqlx::query("INSERT OR REPLACE INTO documents (collection,id,body) VALUES (?,?,?)")
            .bind(collection)
            .bind(id)
            .bind(document.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
