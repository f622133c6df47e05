pub mod batcher;
pub mod openai;
pub mod rest;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use docload_core::config::{EmbeddingConfig, EmbeddingModel};
use docload_core::ConfigError;

pub use batcher::embed_all;
pub use openai::OpenAiEmbedder;
pub use rest::{InputType, RestEmbedder};
pub use traits::{Embedder, EmbeddingError};

/// Build the embedder selected by `config.model`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ConfigError> {
    config.validate()?;
    let timeout = Duration::from_secs(config.timeout_secs);
    Ok(match config.model {
        EmbeddingModel::Primary => Arc::new(OpenAiEmbedder::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            config.dimensions,
            timeout,
        )),
        EmbeddingModel::Alternate => Arc::new(RestEmbedder::new(
            config.rest_url.clone(),
            config.rest_model.clone(),
            config.dimensions,
            timeout,
        )?),
    })
}
