use crate::error::EmbedError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Turns chunk texts and query strings into fixed-dimension vectors.
///
/// Implementations must be deterministic: the same text yields the same
/// vector, so retrieval stays reproducible across runs. The embedder is
/// constructed explicitly and passed into every pipeline call; there is no
/// process-global model instance.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Embed a batch of chunk texts. Returns exactly one vector per input,
    /// in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Offline embedder: hashed character trigrams, L2-normalized.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashEmbedder {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_text(text))
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Remote embedding model behind an Ollama-compatible `/api/embeddings`
/// endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let payload = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.endpoint))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbedError::BackendResponse {
                backend: "embeddings".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;

        if parsed.embedding.len() != self.dimensions {
            return Err(EmbedError::BackendResponse {
                backend: "embeddings".to_string(),
                details: format!(
                    "embedding dimension {} != {}",
                    parsed.embedding.len(),
                    self.dimensions
                ),
            });
        }

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        // The endpoint embeds one prompt per call.
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_one(text).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_one(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashEmbedder, HttpEmbedder};
    use std::time::Duration;

    #[tokio::test]
    async fn embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let first = embedder.embed_query("annual maintenance schedule").await.unwrap();
        let second = embedder.embed_query("annual maintenance schedule").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn batch_is_order_preserving_and_one_to_one() {
        let embedder = HashEmbedder { dimensions: 32 };
        let texts = vec![
            "alpha section".to_string(),
            "beta section".to_string(),
            "gamma section".to_string(),
        ];

        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), texts.len());
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(vector.len(), 32);
            assert_eq!(vector, &embedder.embed_query(text).await.unwrap());
        }
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let embedder = HashEmbedder::default();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn http_embedder_rejects_invalid_endpoint() {
        let result = HttpEmbedder::new("not a url", "nomic-embed-text", 768, Duration::from_secs(5));
        assert!(result.is_err());
    }
}
