use std::time::Duration;

use async_trait::async_trait;
use docload_core::config::ALTERNATE_ALLOWED_DIMS;
use docload_core::ConfigError;
use reqwest::Client;
use serde::Serialize;

use super::openai::EmbedResponse;
use super::traits::{Embedder, EmbeddingError};

/// Whether a text is stored or searched for. The endpoint embeds the two
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Passage,
    Query,
}

/// NIM-style REST embedding endpoint (e.g. `llama-3.2-nv-embedqa`). No
/// authentication; output width restricted to [`ALTERNATE_ALLOWED_DIMS`].
pub struct RestEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct RestRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    input_type: InputType,
    truncate: &'static str,
    dimensions: usize,
}

impl RestEmbedder {
    pub fn new(url: String, model: String, dimensions: usize, timeout: Duration) -> Result<Self, ConfigError> {
        if !ALTERNATE_ALLOWED_DIMS.contains(&dimensions) {
            return Err(ConfigError::InvalidDimensions {
                dimensions,
                allowed: ALTERNATE_ALLOWED_DIMS,
            });
        }
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            url,
            model,
            dimensions,
        })
    }

    async fn embed(&self, texts: &[&str], input_type: InputType) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = RestRequest {
            model: &self.model,
            input: texts,
            input_type,
            truncate: "NONE",
            dimensions: self.dimensions,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let vectors = response.json::<EmbedResponse>().await?.into_vectors();
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for RestEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed(texts, InputType::Passage).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text], InputType::Query).await?;
        Ok(vectors.remove(0))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_dimensions() {
        let err = RestEmbedder::new("http://x".into(), "m".into(), 1536, Duration::from_secs(30))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidDimensions { dimensions: 1536, .. }));
        for dims in [384, 512, 768, 1024, 2048] {
            assert!(RestEmbedder::new("http://x".into(), "m".into(), dims, Duration::from_secs(30)).is_ok());
        }
    }

    #[test]
    fn request_shape() {
        let input = ["hello"];
        let json = serde_json::to_value(RestRequest {
            model: "nv-embedqa",
            input: &input,
            input_type: InputType::Query,
            truncate: "NONE",
            dimensions: 1024,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "nv-embedqa",
                "input": ["hello"],
                "input_type": "query",
                "truncate": "NONE",
                "dimensions": 1024
            })
        );
    }
}
