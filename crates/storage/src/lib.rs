//! Collection persistence: chunk text, metadata and embedding vectors grouped
//! into named collections.
//!
//! [`CollectionStore`] is the narrow contract the ingest pipeline writes
//! through. [`PgVectorStore`] keeps collections in PostgreSQL with pgvector;
//! [`MemoryStore`] keeps them in process for tests and dry runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod report;

use std::collections::BTreeSet;

use async_trait::async_trait;
use docload_core::Chunk;

pub use error::{StoreError, StoreErrorKind};
pub use memory::MemoryStore;
pub use postgres::PgVectorStore;
pub use report::{CollectionReport, DocumentSummary};

/// Storage backend for collections of embedded chunks.
///
/// Every insert call is atomic: either all of the given chunks are persisted
/// or none are. The store does not serialize a membership check against a
/// later insert; callers must do that per collection name.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn exists(&self, collection: &str) -> Result<bool, StoreError>;

    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Distinct source file names already loaded into `collection`.
    async fn list_documents(&self, collection: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Create `collection` and insert the first chunk set. Fails with
    /// [`StoreErrorKind::CollectionExists`] if the name is taken.
    async fn create_and_insert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError>;

    /// Append chunks to an existing collection.
    async fn insert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError>;

    /// Delete every chunk whose source is one of `doc_names`. Returns the
    /// number of chunks removed.
    async fn delete_documents(&self, collection: &str, doc_names: &[String]) -> Result<u64, StoreError>;

    /// Drop `collection` with all its chunks. Returns false if it did not exist.
    async fn drop_collection(&self, collection: &str) -> Result<bool, StoreError>;

    async fn analyze(&self, collection: &str) -> Result<CollectionReport, StoreError>;
}

/// Shared precondition for inserts: one vector per chunk, all of one width.
pub(crate) fn check_batch(
    collection: &str,
    operation: &'static str,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
) -> Result<usize, StoreError> {
    if chunks.is_empty() {
        return Err(StoreError::new(collection, operation, StoreErrorKind::Empty));
    }
    if chunks.len() != vectors.len() {
        return Err(StoreError::new(
            collection,
            operation,
            StoreErrorKind::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            },
        ));
    }
    let dims = vectors[0].len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(StoreError::new(
            collection,
            operation,
            StoreErrorKind::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            },
        ));
    }
    Ok(dims)
}
