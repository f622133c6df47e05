use tracing::debug;

use super::traits::{Embedder, EmbeddingError};

/// Embed `texts` in fixed-size batches, preserving order. Every response must
/// carry exactly one vector per requested text, each of the embedder's width.
pub async fn embed_all(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());

    for (n, batch) in texts.chunks(batch_size).enumerate() {
        let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
        let embeddings = embedder.embed_batch(&refs).await?;
        if embeddings.len() != batch.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: batch.len(),
                actual: embeddings.len(),
            });
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != embedder.dimensions()) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: embedder.dimensions(),
                actual: bad.len(),
            });
        }
        debug!(batch = n, size = batch.len(), "embedded batch");
        vectors.extend(embeddings);
    }
    Ok(vectors)
}
