//! Text embedding providers for the dense-vector index

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while computing an embedding
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding service returned status {0}")]
    Status(u16),

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// Turns text into a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}

/// Feature-hashing embedder.
///
/// Each lowercased word and each adjacent word pair is hashed with SHA-256
/// into a signed bucket; the vector is L2-normalised. Deterministic and
/// model-free, so texts sharing vocabulary land close together.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();
        if words.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vector = vec![0f32; self.dim];
        for word in &words {
            self.add_feature(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut vector {
            *x /= norm;
        }
        Ok(vector)
    }
}

/// Calls an HTTP embedding service: `POST {url}` with `{"inputs": text}`.
///
/// Accepts either a bare vector or a batch of one vector in the response.
pub struct RemoteEmbedder {
    client: Client,
    url: String,
    dim: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteEmbedding {
    Batch(Vec<Vec<f32>>),
    Single(Vec<f32>),
}

impl RemoteEmbedder {
    pub fn new(url: impl Into<String>, dim: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            dim,
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "inputs": text }))
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Status(response.status().as_u16()));
        }

        let body: RemoteEmbedding = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let vector = match body {
            RemoteEmbedding::Single(vector) => vector,
            RemoteEmbedding::Batch(mut batch) if !batch.is_empty() => batch.swap_remove(0),
            RemoteEmbedding::Batch(_) => Vec::new(),
        };

        if vector.len() != self.dim {
            return Err(EmbeddingError::Dimension {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hashing => {
            tracing::info!(dimension = config.dimension, "Using hashing embedder");
            Ok(Arc::new(HashingEmbedder::new(config.dimension)))
        }
        EmbeddingProvider::Remote => {
            let url = config.url.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Remote embedding provider requires 'embedding.url'".to_string(),
                )
            })?;

            tracing::info!(url = %url, dimension = config.dimension, "Using remote embedder");
            let embedder = RemoteEmbedder::new(
                url.clone(),
                config.dimension,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(embedder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hashing_embedder_is_normalized_and_deterministic() {
        let embedder = HashingEmbedder::new(384);
        let a = embedder.embed("The Andromeda Galaxy").await.unwrap();
        let b = embedder.embed("the andromeda galaxy").await.unwrap();

        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_is_closer() {
        let embedder = HashingEmbedder::new(384);
        let query = embedder.embed("spiral galaxy arms").await.unwrap();
        let near = embedder.embed("the arms of a spiral galaxy").await.unwrap();
        let far = embedder.embed("lunar eclipse over the desert").await.unwrap();

        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let embedder = HashingEmbedder::new(16);
        let result = embedder.embed(" ... ").await;
        assert!(matches!(result, Err(EmbeddingError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_remote_embedder_parses_batch_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .match_body(mockito::Matcher::Json(serde_json::json!({ "inputs": "orion" })))
            .with_status(200)
            .with_body("[[0.1, 0.2, 0.3]]")
            .create_async()
            .await;

        let embedder =
            RemoteEmbedder::new(format!("{}/embed", server.url()), 3, Duration::from_secs(5))
                .unwrap();
        let vector = embedder.embed("orion").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_embedder_checks_dimension() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embed")
            .with_status(200)
            .with_body("[0.1, 0.2]")
            .create_async()
            .await;

        let embedder =
            RemoteEmbedder::new(format!("{}/embed", server.url()), 3, Duration::from_secs(5))
                .unwrap();
        let result = embedder.embed("orion").await;

        assert!(matches!(
            result,
            Err(EmbeddingError::Dimension { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_remote_provider_requires_url() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Remote,
            url: None,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            create_embedder(&config),
            Err(AppError::Configuration(_))
        ));
    }
}
