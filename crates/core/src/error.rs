use thiserror::Error;

/// Invalid configuration. Always raised before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },

    #[error("invalid embedding dimensions {dimensions}: must be one of {allowed:?}")]
    InvalidDimensions {
        dimensions: usize,
        allowed: &'static [usize],
    },

    #[error("embedding batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("unsupported file extension: '{0}'")]
    UnsupportedExtension(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("summaries are enabled but no summarizer is configured")]
    MissingSummarizer,

    #[error("{0}")]
    Other(String),
}
