//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - An OpenAI-compatible HTTP backend
//! - Dimension validation on every response

mod http_backend;

pub use http_backend::*;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Embed a single text, the common query-time case
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let mut vectors = embedder.embed(vec![text.to_string()]).await?;
    vectors
        .pop()
        .ok_or_else(|| crate::error::Error::Embedding("No embedding returned".to_string()))
}

/// Scale a vector to unit length; zero vectors are returned unchanged
pub fn normalize_embedding(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

/// Cosine similarity between two equal-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_embedding() {
        let normalized = normalize_embedding(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        assert_eq!(normalize_embedding(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a = [1.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&a, &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&a, &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }
}
