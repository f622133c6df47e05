use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use docload_core::Chunk;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreErrorKind};
use crate::report::CollectionReport;
use crate::{check_batch, CollectionStore};

#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct MemoryCollection {
    dimensions: usize,
    chunks: Vec<StoredChunk>,
}

/// In-process collection store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a collection's chunks in insertion order.
    pub async fn chunks(&self, collection: &str) -> Vec<StoredChunk> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.chunks.clone())
            .unwrap_or_default()
    }
}

fn stored(chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> impl Iterator<Item = StoredChunk> + '_ {
    chunks
        .iter()
        .cloned()
        .zip(vectors)
        .map(|(chunk, embedding)| StoredChunk { chunk, embedding })
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn exists(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn list_documents(&self, collection: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|c| c.chunks.iter().map(|s| s.chunk.source.clone()).collect())
            .unwrap_or_default())
    }

    async fn create_and_insert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError> {
        const OP: &str = "create_and_insert";
        let dimensions = check_batch(collection, OP, chunks, &vectors)?;
        let mut guard = self.collections.write().await;
        if guard.contains_key(collection) {
            return Err(StoreError::new(collection, OP, StoreErrorKind::CollectionExists));
        }
        guard.insert(
            collection.to_string(),
            MemoryCollection {
                dimensions,
                chunks: stored(chunks, vectors).collect(),
            },
        );
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
        let mut guard = self.collections.write().await;
        let entry = guard
            .get_mut(collection)
            .ok_or_else(|| StoreError::new(collection, OP, StoreErrorKind::CollectionMissing))?;
        if entry.dimensions != dimensions {
            return Err(StoreError::new(
                collection,
                OP,
                StoreErrorKind::DimensionMismatch {
                    expected: entry.dimensions,
                    actual: dimensions,
                },
            ));
        }
        entry.chunks.extend(stored(chunks, vectors));
        Ok(())
    }

    async fn delete_documents(&self, collection: &str, doc_names: &[String]) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let entry = guard.get_mut(collection).ok_or_else(|| {
            StoreError::new(collection, "delete_documents", StoreErrorKind::CollectionMissing)
        })?;
        let before = entry.chunks.len();
        entry.chunks.retain(|s| !doc_names.contains(&s.chunk.source));
        Ok((before - entry.chunks.len()) as u64)
    }

    async fn drop_collection(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.collections.write().await.remove(collection).is_some())
    }

    async fn analyze(&self, collection: &str) -> Result<CollectionReport, StoreError> {
        let guard = self.collections.read().await;
        let entry = guard
            .get(collection)
            .ok_or_else(|| StoreError::new(collection, "analyze", StoreErrorKind::CollectionMissing))?;
        Ok(CollectionReport::from_rows(
            collection,
            entry
                .chunks
                .iter()
                .map(|s| (s.chunk.source.clone(), s.chunk.len_chars())),
        ))
    }
}
