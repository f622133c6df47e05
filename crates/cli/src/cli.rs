use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docload_core::config::EmbeddingModel;
use docload_core::{Config, ConfigError};

/// Chunk, enrich and load documents into vector collections.
///
/// Settings come from the environment (and `.env`); flags override them.
#[derive(Parser, Debug)]
#[command(name = "docload", version, about = "Chunk, enrich and load documents into vector collections")]
pub struct CliArgs {
    /// Config profile: `PROD` reads `PROD_CHUNK_SIZE` before `CHUNK_SIZE`
    #[arg(long, env = "DOCLOAD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Maximum chunk length in characters
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// Prepend a summary of neighbouring chunks to every chunk
    #[arg(long, global = true)]
    pub summaries: bool,

    /// Chunks on each side included in a summary window
    #[arg(long, global = true)]
    pub window: Option<usize>,

    /// Embedding backend: primary or alternate
    #[arg(long, global = true)]
    pub embedding_model: Option<EmbeddingModel>,

    /// Embedding vector width
    #[arg(long, global = true)]
    pub dimensions: Option<usize>,

    /// Keep collections in process memory instead of PostgreSQL
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load every PDF, DOCX and Markdown file in a directory into a NEW collection
    BatchLoad {
        collection: String,
        dir: PathBuf,
        /// Descend into subdirectories
        #[arg(long)]
        recursive: bool,
    },
    /// Add the files of a directory to an EXISTING collection, skipping loaded ones
    Add {
        collection: String,
        dir: PathBuf,
        #[arg(long)]
        recursive: bool,
    },
    /// Load one file, creating the collection if needed (OK) or skipping it if already loaded (KO)
    Upload { collection: String, file: PathBuf },
    ListCollections,
    ListDocuments { collection: String },
    /// Delete documents (by file name) from a collection
    Delete {
        collection: String,
        documents: Vec<String>,
    },
    /// Drop a collection and all its chunks
    Drop { collection: String },
    /// Per-document chunk counts and chunk-length statistics
    Analyze { collection: String },
    /// Check the database connection
    CheckDb,
}

impl CliArgs {
    /// Environment config for the selected profile, with flag overrides applied.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::for_profile(self.profile.as_deref().unwrap_or(""))?;
        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunking.chunk_overlap = overlap;
        }
        if self.summaries {
            config.summary.enabled = true;
        }
        if let Some(window) = self.window {
            config.summary.window_half_width = window;
        }
        if let Some(model) = self.embedding_model {
            config.embedding.model = model;
        }
        if let Some(dimensions) = self.dimensions {
            config.embedding.dimensions = dimensions;
        }
        config.validate()?;
        Ok(config)
    }
}
