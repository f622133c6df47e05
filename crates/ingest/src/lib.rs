//! Document ingestion: loading, splitting, context enrichment, embedding and
//! collection loading.

pub mod chunker;
pub mod document;
pub mod embedding;
pub mod enrich;
pub mod ingestor;
pub mod pipeline;

pub use chunker::TextSplitter;
pub use document::{LoadError, LoadedBlock, LoaderKind};
pub use embedding::{create_embedder, embed_all, Embedder, EmbeddingError};
pub use enrich::{summary_window, ContextEnricher, EnrichConfig, EnrichError};
pub use ingestor::{IngestAction, IngestError, IngestReport, Ingestor};
pub use pipeline::{
    BatchOutcome, DocumentError, DocumentSink, FileReport, FileStatus, Pipeline, PipelineConfig,
};
