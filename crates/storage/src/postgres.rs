use std::collections::BTreeSet;

use ::pgvector::Vector;
use async_trait::async_trait;
use docload_core::config::PostgresConfig;
use docload_core::Chunk;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreErrorKind};
use crate::report::CollectionReport;
use crate::{check_batch, CollectionStore};

/// Collection name used in errors that are not tied to one collection.
const ANY_COLLECTION: &str = "*";

/// Unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

const SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS vector",
    "CREATE TABLE IF NOT EXISTS collections (\
        name TEXT PRIMARY KEY, \
        dimensions INTEGER NOT NULL, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now())",
    "CREATE TABLE IF NOT EXISTS collection_chunks (\
        id UUID PRIMARY KEY, \
        seq BIGSERIAL, \
        collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE, \
        source TEXT NOT NULL, \
        doc_title TEXT NOT NULL, \
        page_label TEXT, \
        chunk_index INTEGER NOT NULL, \
        content TEXT NOT NULL, \
        embedding vector NOT NULL)",
    "CREATE INDEX IF NOT EXISTS collection_chunks_source_idx \
        ON collection_chunks (collection, source)",
];

/// Collections stored in PostgreSQL: a `collections` registry plus one
/// `collection_chunks` row per chunk with a pgvector embedding.
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        info!(host = %config.host, db = %config.database, "connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await
            .map_err(StoreError::db(ANY_COLLECTION, "connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(StoreError::db(ANY_COLLECTION, "ensure_schema"))?;
        }
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::db(ANY_COLLECTION, "ping"))?;
        Ok(())
    }

    async fn insert_rows(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        operation: &'static str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError> {
        for (chunk, embedding) in chunks.iter().zip(vectors) {
            let embedding = Vector::from(embedding);
            sqlx::query(
                "INSERT INTO collection_chunks \
                 (id, collection, source, doc_title, page_label, chunk_index, content, embedding) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::new_v4())
            .bind(collection)
            .bind(&chunk.source)
            .bind(&chunk.doc_title)
            .bind(&chunk.page_label)
            .bind(chunk.chunk_index as i32)
            .bind(&chunk.content)
            .bind(&embedding)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::db(collection, operation))?;
        }
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[async_trait]
impl CollectionStore for PgVectorStore {
    async fn exists(&self, collection: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM collections WHERE name = $1)")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::db(collection, "exists"))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::db(ANY_COLLECTION, "list_collections"))
    }

    async fn list_documents(&self, collection: &str) -> Result<BTreeSet<String>, StoreError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT source FROM collection_chunks WHERE collection = $1")
                .bind(collection)
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::db(collection, "list_documents"))?;
        Ok(names.into_iter().collect())
    }

    async fn create_and_insert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError> {
        const OP: &str = "create_and_insert";
        let dimensions = check_batch(collection, OP, chunks, &vectors)?;
        let mut tx = self.pool.begin().await.map_err(StoreError::db(collection, OP))?;

        sqlx::query("INSERT INTO collections (name, dimensions) VALUES ($1, $2)")
            .bind(collection)
            .bind(dimensions as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::new(collection, OP, StoreErrorKind::CollectionExists)
                } else {
                    StoreError::new(collection, OP, e)
                }
            })?;

        Self::insert_rows(&mut tx, collection, OP, chunks, vectors).await?;
        tx.commit().await.map_err(StoreError::db(collection, OP))?;
        debug!(collection, chunks = chunks.len(), dimensions, "collection created");
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError> {
        const OP: &str = "insert";
        let dimensions = check_batch(collection, OP, chunks, &vectors)?;
        let mut tx = self.pool.begin().await.map_err(StoreError::db(collection, OP))?;

        let expected: Option<i32> =
            sqlx::query_scalar("SELECT dimensions FROM collections WHERE name = $1 FOR SHARE")
                .bind(collection)
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::db(collection, OP))?;
        let expected = expected
            .ok_or_else(|| StoreError::new(collection, OP, StoreErrorKind::CollectionMissing))?
            as usize;
        if expected != dimensions {
            return Err(StoreError::new(
                collection,
                OP,
                StoreErrorKind::DimensionMismatch {
                    expected,
                    actual: dimensions,
                },
            ));
        }

        Self::insert_rows(&mut tx, collection, OP, chunks, vectors).await?;
        tx.commit().await.map_err(StoreError::db(collection, OP))?;
        debug!(collection, chunks = chunks.len(), "chunks appended");
        Ok(())
    }

    async fn delete_documents(&self, collection: &str, doc_names: &[String]) -> Result<u64, StoreError> {
        const OP: &str = "delete_documents";
        if !self.exists(collection).await? {
            return Err(StoreError::new(collection, OP, StoreErrorKind::CollectionMissing));
        }
        let result =
            sqlx::query("DELETE FROM collection_chunks WHERE collection = $1 AND source = ANY($2)")
                .bind(collection)
                .bind(doc_names)
                .execute(&self.pool)
                .await
                .map_err(StoreError::db(collection, OP))?;
        Ok(result.rows_affected())
    }

    async fn drop_collection(&self, collection: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM collections WHERE name = $1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(StoreError::db(collection, "drop_collection"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn analyze(&self, collection: &str) -> Result<CollectionReport, StoreError> {
        if !self.exists(collection).await? {
            return Err(StoreError::new(collection, "analyze", StoreErrorKind::CollectionMissing));
        }
        let rows = sqlx::query(
            "SELECT source, char_length(content) AS len FROM collection_chunks \
             WHERE collection = $1 ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::db(collection, "analyze"))?;

        Ok(CollectionReport::from_rows(
            collection,
            rows.iter().map(|row| {
                let len: i32 = row.get("len");
                (row.get::<String, _>("source"), len as usize)
            }),
        ))
    }
}
