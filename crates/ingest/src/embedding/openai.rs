use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{Embedder, EmbeddingError};

/// OpenAI-compatible `/v1/embeddings` backend. Requests a specific output
/// width through the `dimensions` field.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: Option<String>,
        model: String,
        base_url: String,
        dimensions: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    dimensions: usize,
}

#[derive(Deserialize)]
pub(super) struct EmbedResponse {
    pub(super) data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
pub(super) struct EmbedItem {
    pub(super) embedding: Vec<f32>,
    #[serde(default)]
    pub(super) index: usize,
}

impl EmbedResponse {
    /// Vectors sorted by their `index` field to restore input order.
    pub(super) fn into_vectors(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|item| item.index);
        self.data.into_iter().map(|item| item.embedding).collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let resp: EmbedResponse = response.json().await?;
        let embeddings = resp.into_vectors();

        // Validate dimensions on first vector.
        if let Some(first) = embeddings.first() {
            if first.len() != self.dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: first.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_dimensions() {
        let input = ["a", "b"];
        let json = serde_json::to_value(EmbedRequest {
            model: "text-embedding-3-small",
            input: &input,
            dimensions: 512,
        })
        .unwrap();
        assert_eq!(json["dimensions"], 512);
        assert_eq!(json["input"][1], "b");
    }

    #[test]
    fn response_is_reordered_by_index() {
        let resp: EmbedResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[2.0],"index":1},{"embedding":[1.0],"index":0}]}"#,
        )
        .unwrap();
        assert_eq!(resp.into_vectors(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let e = OpenAiEmbedder::new(None, "m".into(), "http://host/".into(), 8, Duration::from_secs(1));
        assert_eq!(e.base_url, "http://host");
        assert_eq!(e.dimensions(), 8);
    }
}
