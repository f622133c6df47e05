//! Per-document orchestration: load, split, enrich.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docload_core::config::ChunkingConfig;
use docload_core::{doc_title, source_name, Chunk, ConfigError};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chunker::{prepare_blocks, TextSplitter};
use crate::document::{LoadError, LoaderKind};
use crate::enrich::{ContextEnricher, EnrichError};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Enrich(#[from] EnrichError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Chunks were produced (and stored, when run through the ingestor).
    Ok,
    /// Already present in the collection; nothing inserted.
    Ko,
    Error,
    /// Not attempted because the run was cancelled.
    Cancelled,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Ko => "KO",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        })
    }
}

/// Outcome for one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// File name as stored in the collection.
    pub source: String,
    pub status: FileStatus,
    pub chunks: usize,
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            source: source_name(&path.to_string_lossy()).to_string(),
            status,
            chunks: 0,
            error: None,
        }
    }

    pub fn ok(path: &Path, chunks: usize) -> Self {
        Self {
            chunks,
            ..Self::new(path, FileStatus::Ok)
        }
    }

    pub fn failed(path: &Path, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(path, FileStatus::Error)
        }
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.source, self.status)?;
        match (&self.status, &self.error) {
            (FileStatus::Ok, _) => write!(f, " ({} chunks)", self.chunks),
            (_, Some(e)) => write!(f, ": {e}"),
            _ => Ok(()),
        }
    }
}

/// Chunks of every successfully processed file, in input order, plus one
/// report per input file.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub chunks: Vec<Chunk>,
    pub files: Vec<FileReport>,
}

/// Receives each processed document of a batch, in input order.
#[async_trait]
pub trait DocumentSink: Send {
    type Error: fmt::Display + Send;

    /// Status to report for `source` without processing it.
    fn skip(&self, _source: &str) -> Option<FileStatus> {
        None
    }

    /// Take the chunks of one document. Returns the number kept.
    async fn accept(&mut self, source: &str, chunks: Vec<Chunk>) -> Result<usize, Self::Error>;
}

#[async_trait]
impl DocumentSink for Vec<Chunk> {
    type Error = Infallible;

    async fn accept(&mut self, _source: &str, chunks: Vec<Chunk>) -> Result<usize, Infallible> {
        let n = chunks.len();
        self.extend(chunks);
        Ok(n)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
}

pub struct Pipeline {
    splitter: TextSplitter,
    enricher: ContextEnricher,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, enricher: ContextEnricher) -> Result<Self, ConfigError> {
        Ok(Self {
            splitter: TextSplitter::from_config(&config.chunking)?,
            enricher,
        })
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Load, split and enrich one document.
    pub async fn process(&self, path: &Path) -> Result<Vec<Chunk>, DocumentError> {
        let kind = LoaderKind::from_path(path)?;
        let path_str = path.to_string_lossy();
        let source = source_name(&path_str);
        let title = doc_title(&path_str);

        let owned = path.to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || kind.load(owned))
            .await
            .map_err(LoadError::from)??;
        let blocks = prepare_blocks(kind, loaded);
        let units = self.splitter.split_units(&blocks);
        if units.is_empty() {
            warn!(source, "document produced no text");
        }
        let chunks = self.enricher.enrich(title, source, &units).await?;
        info!(source, loader = %kind, chunks = chunks.len(), "document processed");
        Ok(chunks)
    }

    /// Process documents one at a time and collect their chunks.
    pub async fn process_batch(&self, paths: &[PathBuf], cancel: &CancellationToken) -> BatchOutcome {
        let mut chunks = Vec::new();
        let files = self.run_batch(paths, cancel, &mut chunks).await;
        BatchOutcome { chunks, files }
    }

    /// Process documents one at a time, handing each one to `sink`. A
    /// document that fails to process or is rejected by the sink is reported
    /// and skipped; the batch goes on. Cancellation is honoured between
    /// documents.
    pub async fn run_batch<S: DocumentSink>(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Vec<FileReport> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if cancel.is_cancelled() {
                files.push(FileReport::new(path, FileStatus::Cancelled));
                continue;
            }
            let source = source_name(&path.to_string_lossy()).to_string();
            if let Some(status) = sink.skip(&source) {
                info!(source = %source, %status, "document skipped");
                files.push(FileReport::new(path, status));
                continue;
            }
            let accepted = match self.process(path).await {
                Ok(chunks) => sink.accept(&source, chunks).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match accepted {
                Ok(n) => files.push(FileReport::ok(path, n)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping document");
                    files.push(FileReport::failed(path, e));
                }
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn pipeline(size: usize, overlap: usize) -> Pipeline {
        Pipeline::new(
            PipelineConfig {
                chunking: ChunkingConfig {
                    chunk_size: size,
                    chunk_overlap: overlap,
                },
            },
            ContextEnricher::without_summaries(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_bad_chunking() {
        let config = PipelineConfig {
            chunking: ChunkingConfig {
                chunk_size: 10,
                chunk_overlap: 20,
            },
        };
        assert!(Pipeline::new(config, ContextEnricher::without_summaries()).is_err());
    }

    #[tokio::test]
    async fn markdown_document_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Guide.md");
        fs::write(&path, "First paragraph.\n\nSecond paragraph.").unwrap();

        let chunks = pipeline(20, 0).process(&path).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "# Doc. title: Guide\nFirst paragraph.");
        assert_eq!(chunks[1].content, "# Doc. title: Guide\nSecond paragraph.");
        assert!(chunks.iter().all(|c| c.source == "Guide.md" && c.page_label.is_none()));
    }

    #[tokio::test]
    async fn unsupported_extension_is_config_error() {
        let err = pipeline(100, 0).process(Path::new("/tmp/data.csv")).await.unwrap_err();
        assert!(matches!(err, DocumentError::Config(ConfigError::UnsupportedExtension(_))));
    }

    #[tokio::test]
    async fn batch_skips_failures_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        fs::write(&a, "alpha").unwrap();
        fs::write(&b, "beta").unwrap();
        let missing = dir.path().join("missing.md");

        let paths = vec![a, missing, b];
        let outcome = pipeline(100, 0)
            .process_batch(&paths, &CancellationToken::new())
            .await;

        let statuses: Vec<FileStatus> = outcome.files.iter().map(|f| f.status).collect();
        assert_eq!(statuses, vec![FileStatus::Ok, FileStatus::Error, FileStatus::Ok]);
        let sources: Vec<&str> = outcome.chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a.md", "b.md"]);
        assert!(outcome.files[1].error.is_some());
    }

    #[tokio::test]
    async fn cancelled_batch_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        fs::write(&a, "alpha").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = pipeline(100, 0).process_batch(&[a], &cancel).await;
        assert!(outcome.chunks.is_empty());
        assert_eq!(outcome.files[0].status, FileStatus::Cancelled);
    }

    /// Keeps every document except the ones named in `reject`; reports
    /// names in `known` as already loaded.
    #[derive(Default)]
    struct SelectiveSink {
        known: Vec<&'static str>,
        reject: Vec<&'static str>,
        accepted: Vec<String>,
    }

    #[async_trait]
    impl DocumentSink for SelectiveSink {
        type Error = String;

        fn skip(&self, source: &str) -> Option<FileStatus> {
            self.known.iter().any(|k| *k == source).then_some(FileStatus::Ko)
        }

        async fn accept(&mut self, source: &str, chunks: Vec<Chunk>) -> Result<usize, String> {
            if self.reject.iter().any(|r| *r == source) {
                return Err(format!("{source} rejected"));
            }
            self.accepted.push(source.to_string());
            Ok(chunks.len())
        }
    }

    #[tokio::test]
    async fn run_batch_reports_skipped_and_rejected_documents() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["a.md", "b.md", "c.md"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, "some text").unwrap();
                path
            })
            .collect();
        let mut sink = SelectiveSink {
            known: vec!["a.md"],
            reject: vec!["b.md"],
            ..SelectiveSink::default()
        };

        let files = pipeline(100, 0)
            .run_batch(&paths, &CancellationToken::new(), &mut sink)
            .await;

        let statuses: Vec<FileStatus> = files.iter().map(|f| f.status).collect();
        assert_eq!(statuses, vec![FileStatus::Ko, FileStatus::Error, FileStatus::Ok]);
        assert_eq!(files[1].error.as_deref(), Some("b.md rejected"));
        assert_eq!(files[2].chunks, 1);
        assert_eq!(sink.accepted, vec!["c.md"]);
    }

    #[test]
    fn report_display() {
        let report = FileReport::ok(Path::new("/x/y/book.pdf"), 3);
        assert_eq!(report.to_string(), "book.pdf OK (3 chunks)");
        let report = FileReport::new(Path::new("book.pdf"), FileStatus::Ko);
        assert_eq!(report.to_string(), "book.pdf KO");
    }
}
