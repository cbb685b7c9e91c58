//! OpenAI-compatible HTTP embedding backend

use super::Embedder;
use crate::config::{EmbeddingConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::retry_with_backoff;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Embedding gateway over an OpenAI-compatible `/v1/embeddings` endpoint
pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    retry: RetryConfig,
    timeout: std::time::Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig, retry: &RetryConfig) -> Result<Self> {
        let base = Url::parse(&config.url)?;
        let endpoint = base
            .join("/v1/embeddings")
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            retry: retry.clone(),
            timeout: config.timeout(),
        })
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::EmbeddingTimeout(self.timeout)
            } else {
                Error::Embedding(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Error::RateLimited(format!(
                    "embedding backend returned 429 for model '{}'",
                    self.model
                )));
            }
            status if !status.is_success() => {
                let detail = response.text().await.unwrap_or_default();
                return Err(Error::Embedding(format!(
                    "embedding backend returned {}: {}",
                    status, detail
                )));
            }
            _ => {}
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("invalid embedding response: {}", e)))?;

        // Responses are not guaranteed to preserve input order
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();

        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "embedding backend returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: mismatch.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts with model {}", texts.len(), self.model);

        retry_with_backoff(&self.retry, "embed", || self.request_embeddings(&texts)).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            url: url.to_string(),
            model: "test-embed".to_string(),
            dimension,
            timeout_secs: 5,
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_embed_parses_openai_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "embedding": [0.0, 1.0, 0.0], "index": 1 },
                    { "embedding": [1.0, 0.0, 0.0], "index": 0 }
                ]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 3), &fast_retry()).unwrap();
        let vectors = embedder
            .embed(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        // Out-of-order data entries are put back in input order
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [0.1, 0.2], "index": 0 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 3), &fast_retry()).unwrap();
        let err = embedder.embed(vec!["a".to_string()]).await.unwrap_err();

        // One request only: a dimension mismatch must not be retried
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [1.0, 0.0, 0.0], "index": 0 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 3), &fast_retry()).unwrap();
        let vectors = embedder.embed(vec!["a".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 3), &fast_retry()).unwrap();
        let err = embedder.embed(vec!["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let server = MockServer::start().await;
        // No mock mounted: any request would 404 into an error
        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 3), &fast_retry()).unwrap();
        let vectors = embedder.embed(vec![]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
