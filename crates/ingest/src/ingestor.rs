//! Collection loading: decides per document whether to create the collection,
//! append to it or skip, then embeds and stores the document's chunks in one
//! store call.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use docload_core::{source_name, Chunk, ChunkStats};
use docload_storage::{CollectionReport, CollectionStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::embedding::{embed_all, Embedder, EmbeddingError};
use crate::pipeline::{DocumentError, DocumentSink, FileReport, FileStatus, Pipeline};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    #[error("collection '{0}' does not exist")]
    CollectionMissing(String),

    #[error("{0}: no text extracted")]
    NoChunks(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What [`Ingestor::ingest_file`] did with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "action")]
pub enum IngestAction {
    /// The collection did not exist; it was created with this document.
    Created { chunks: usize },
    Appended { chunks: usize },
    /// A document with the same file name is already in the collection.
    Skipped,
}

/// Result of loading a batch into a new collection. Statistics cover the
/// chunks actually stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub total_chunks: usize,
    pub mean_len: f64,
    pub stdev_len: f64,
    pub p75_len: f64,
    pub files: Vec<FileReport>,
}

impl IngestReport {
    fn new(collection: &str, stats: ChunkStats, files: Vec<FileReport>) -> Self {
        Self {
            collection: collection.to_string(),
            total_chunks: stats.count,
            mean_len: stats.mean,
            stdev_len: stats.stdev,
            p75_len: stats.p75,
            files,
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collection: {}", self.collection)?;
        for file in &self.files {
            writeln!(f, "  {file}")?;
        }
        writeln!(f, "Total chunks: {}", self.total_chunks)?;
        writeln!(f, "Avg. length: {:.1} (chars)", self.mean_len)?;
        writeln!(f, "Std dev: {:.1} (chars)", self.stdev_len)?;
        write!(f, "75-perc: {:.1} (chars)", self.p75_len)
    }
}

pub struct Ingestor {
    store: Arc<dyn CollectionStore>,
    embedder: Arc<dyn Embedder>,
    pipeline: Pipeline,
    batch_size: usize,
    cancel: CancellationToken,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        embedder: Arc<dyn Embedder>,
        pipeline: Pipeline,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            pipeline,
            batch_size: batch_size.max(1),
            cancel: CancellationToken::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Stop batch operations between documents once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Per-collection lock serializing membership checks with inserts.
    async fn collection_lock(&self, collection: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .clone()
    }

    /// Embed and store the chunks of one document in a single store call.
    /// `create` selects between creating the collection and appending to it.
    async fn store_chunks(
        &self,
        collection: &str,
        source: &str,
        chunks: &[Chunk],
        create: bool,
    ) -> Result<usize, IngestError> {
        if chunks.is_empty() {
            return Err(IngestError::NoChunks(source.to_string()));
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embed_all(self.embedder.as_ref(), &texts, self.batch_size).await?;
        if create {
            self.store.create_and_insert(collection, chunks, vectors).await?;
        } else {
            self.store.insert(collection, chunks, vectors).await?;
        }
        Ok(chunks.len())
    }

    /// Add one file: create the collection if needed, append if the file is
    /// new to it, skip if a file with the same name is already loaded.
    pub async fn ingest_file(&self, collection: &str, path: &Path) -> Result<IngestAction, IngestError> {
        let lock = self.collection_lock(collection).await;
        let _guard = lock.lock().await;

        let path_str = path.to_string_lossy();
        let source = source_name(&path_str);
        let exists = self.store.exists(collection).await?;
        if exists && self.store.list_documents(collection).await?.contains(source) {
            info!(collection, source, "document already loaded, skipping");
            return Ok(IngestAction::Skipped);
        }

        let chunks = self.pipeline.process(path).await?;
        let chunks = self.store_chunks(collection, source, &chunks, !exists).await?;
        let action = if exists {
            IngestAction::Appended { chunks }
        } else {
            IngestAction::Created { chunks }
        };
        info!(collection, source, ?action, "document ingested");
        Ok(action)
    }

    /// Load `paths` into a collection that must not exist yet. Failing files
    /// are reported and skipped; the collection is created by the first file
    /// that succeeds.
    pub async fn ingest_new_collection(
        &self,
        collection: &str,
        paths: &[PathBuf],
    ) -> Result<IngestReport, IngestError> {
        let lock = self.collection_lock(collection).await;
        let _guard = lock.lock().await;

        if self.store.exists(collection).await? {
            return Err(IngestError::CollectionExists(collection.to_string()));
        }
        let chunking = self.pipeline.splitter();
        info!(
            collection,
            chunk_size = chunking.chunk_size(),
            chunk_overlap = chunking.chunk_overlap(),
            files = paths.len(),
            "loading new collection"
        );

        let mut sink = CollectionSink::new(self, collection, true, BTreeSet::new());
        let files = self.pipeline.run_batch(paths, &self.cancel, &mut sink).await;

        let report = IngestReport::new(collection, ChunkStats::from_lengths(&sink.lengths), files);
        info!(
            collection,
            total_chunks = report.total_chunks,
            mean_len = report.mean_len,
            stdev_len = report.stdev_len,
            p75_len = report.p75_len,
            "collection loaded"
        );
        Ok(report)
    }

    /// Append `paths` to an existing collection, skipping (`KO`) files whose
    /// name is already loaded.
    pub async fn ingest_into_existing(
        &self,
        collection: &str,
        paths: &[PathBuf],
    ) -> Result<Vec<FileReport>, IngestError> {
        let lock = self.collection_lock(collection).await;
        let _guard = lock.lock().await;

        if !self.store.exists(collection).await? {
            return Err(IngestError::CollectionMissing(collection.to_string()));
        }
        let loaded = self.store.list_documents(collection).await?;
        let mut sink = CollectionSink::new(self, collection, false, loaded);
        Ok(self.pipeline.run_batch(paths, &self.cancel, &mut sink).await)
    }

    /// Remove every chunk of the named documents. An empty list is a no-op.
    pub async fn delete_documents(&self, collection: &str, doc_names: &[String]) -> Result<u64, IngestError> {
        if doc_names.is_empty() {
            return Ok(0);
        }
        let lock = self.collection_lock(collection).await;
        let _guard = lock.lock().await;
        let removed = self.store.delete_documents(collection, doc_names).await?;
        info!(collection, documents = doc_names.len(), removed, "documents deleted");
        Ok(removed)
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, IngestError> {
        Ok(self.store.list_collections().await?)
    }

    pub async fn list_documents(&self, collection: &str) -> Result<BTreeSet<String>, IngestError> {
        if !self.store.exists(collection).await? {
            return Err(IngestError::CollectionMissing(collection.to_string()));
        }
        Ok(self.store.list_documents(collection).await?)
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<bool, IngestError> {
        let lock = self.collection_lock(collection).await;
        let _guard = lock.lock().await;
        let dropped = self.store.drop_collection(collection).await?;
        if dropped {
            info!(collection, "collection dropped");
        }
        let mut locks = self.locks.lock().await;
        // Only the map and this call hold the lock: nobody is waiting on it.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(collection);
        }
        Ok(dropped)
    }

    pub async fn analyze_collection(&self, collection: &str) -> Result<CollectionReport, IngestError> {
        if !self.store.exists(collection).await? {
            return Err(IngestError::CollectionMissing(collection.to_string()));
        }
        Ok(self.store.analyze(collection).await?)
    }
}

/// Stores each document of a batch into one collection. The collection is
/// created by the first document stored when `create` is set; names already
/// loaded are reported `KO`.
struct CollectionSink<'a> {
    ingestor: &'a Ingestor,
    collection: &'a str,
    create: bool,
    loaded: BTreeSet<String>,
    lengths: Vec<usize>,
}

impl<'a> CollectionSink<'a> {
    fn new(ingestor: &'a Ingestor, collection: &'a str, create: bool, loaded: BTreeSet<String>) -> Self {
        Self {
            ingestor,
            collection,
            create,
            loaded,
            lengths: Vec::new(),
        }
    }
}

#[async_trait]
impl DocumentSink for CollectionSink<'_> {
    type Error = IngestError;

    fn skip(&self, source: &str) -> Option<FileStatus> {
        self.loaded.contains(source).then_some(FileStatus::Ko)
    }

    async fn accept(&mut self, source: &str, chunks: Vec<Chunk>) -> Result<usize, IngestError> {
        let stored = self
            .ingestor
            .store_chunks(self.collection, source, &chunks, self.create)
            .await?;
        self.create = false;
        self.lengths.extend(chunks.iter().map(Chunk::len_chars));
        self.loaded.insert(source.to_string());
        info!(collection = self.collection, source, chunks = stored, "document stored");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::ContextEnricher;
    use crate::pipeline::PipelineConfig;
    use docload_storage::MemoryStore;

    struct ConstEmbedder;

    #[async_trait]
    impl Embedder for ConstEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn ingestor() -> Ingestor {
        let pipeline = Pipeline::new(PipelineConfig::default(), ContextEnricher::without_summaries()).unwrap();
        Ingestor::new(Arc::new(MemoryStore::new()), Arc::new(ConstEmbedder), pipeline, 4)
    }

    #[tokio::test]
    async fn drop_releases_collection_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "alpha").unwrap();

        let ingestor = ingestor();
        ingestor.ingest_file("books", &path).await.unwrap();
        assert!(ingestor.locks.lock().await.contains_key("books"));

        assert!(ingestor.drop_collection("books").await.unwrap());
        assert!(ingestor.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn delete_from_missing_collection_is_an_error() {
        let ingestor = ingestor();
        let err = ingestor
            .delete_documents("nowhere", &["a.md".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
    }
}
