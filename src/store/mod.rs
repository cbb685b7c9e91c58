//! Vector index adapters
//!
//! This module wraps the external vector/search engine behind the
//! [`VectorIndex`] trait:
//! - `QdrantIndex`: Qdrant-backed adapter (collection management, point
//!   upsert/delete, filtered vector search, scroll-based lexical scoring)
//! - `MemoryIndex`: deterministic in-process implementation for tests and
//!   embedded use

mod lexical;
mod memory;
mod payload;

pub use lexical::*;
pub use memory::*;
pub use payload::*;

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::models::{DocFilter, DocumentRecord, ScoredDoc};
use crate::retry::retry_with_backoff;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    condition::ConditionOneOf, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter, PointId, ScalarQuantizationBuilder, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Narrow contract consumed from the external vector/search engine.
/// Search calls are idempotent; implementations must apply the full filter
/// conjunction (tenant, optional owner, optional any-of tags) to both legs.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a document by `(tenant_id, id)`
    async fn upsert(&self, record: DocumentRecord) -> Result<()>;

    /// Remove a document; removing an absent id is not an error
    async fn delete(&self, tenant_id: &str, document_id: &str) -> Result<()>;

    /// Approximate nearest-neighbor search by cosine similarity
    async fn search_vector(
        &self,
        vector: &[f32],
        filter: &DocFilter,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>>;

    /// Lexical relevance search over passage text
    async fn search_lexical(
        &self,
        text: &str,
        filter: &DocFilter,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>>;
}

/// Qdrant-backed index
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
    search_timeout: Duration,
    lexical_scan_limit: usize,
    retry: RetryConfig,
    scorer: Bm25Scorer,
}

impl QdrantIndex {
    /// Connect to Qdrant using config
    pub async fn connect(config: &Config) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", config.qdrant_url);

        let client = Qdrant::from_url(&config.qdrant_url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Search(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection_name.clone(),
            dimension: config.embedding.dimension,
            search_timeout: config.retrieval.search_timeout(),
            lexical_scan_limit: config.retrieval.lexical_scan_limit,
            retry: config.retry.clone(),
            scorer: Bm25Scorer::new(),
        })
    }

    /// Ensure the collection exists with cosine distance and the configured
    /// dimension; an existing collection with a different dimension is a
    /// hard error
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;

        if exists {
            debug!("Collection {} already exists", self.collection);

            if let Some(size) = self.collection_vector_size().await? {
                if size != self.dimension {
                    return Err(Error::DimensionMismatch {
                        expected: self.dimension,
                        got: size,
                    });
                }
            }
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }

    async fn collection_vector_size(&self) -> Result<Option<usize>> {
        let info = self.client.collection_info(&self.collection).await?;

        let size = info
            .result
            .as_ref()
            .and_then(|r| r.config.as_ref())
            .and_then(|c| c.params.as_ref())
            .and_then(|p| p.vectors_config.as_ref())
            .and_then(|v| v.config.as_ref())
            .and_then(|c| match c {
                qdrant_client::qdrant::vectors_config::Config::Params(params) => {
                    Some(params.size as usize)
                }
                qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
            });

        Ok(size)
    }

    async fn with_timeout<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.search_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::SearchTimeout(self.search_timeout)),
        }
    }

    /// Scroll the filtered candidate window, bounded by
    /// `lexical_scan_limit`
    async fn scroll_candidates(&self, filter: &DocFilter) -> Result<Vec<DocumentPayload>> {
        let qdrant_filter = filter_to_qdrant(filter);
        let mut candidates = Vec::new();
        let mut offset: Option<PointId> = None;
        let batch_size = 256u32;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection)
                .limit(batch_size)
                .with_payload(true)
                .with_vectors(false)
                .filter(qdrant_filter.clone());

            if let Some(ref o) = offset {
                builder = builder.offset(o.clone());
            }

            let response = self.client.scroll(builder).await?;
            if response.result.is_empty() {
                break;
            }

            for point in response.result {
                let map: serde_json::Map<String, Value> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_from_qdrant_value(v)))
                    .collect();
                candidates.push(DocumentPayload::try_from(map)?);

                if candidates.len() >= self.lexical_scan_limit {
                    return Ok(candidates);
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(candidates)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, record: DocumentRecord) -> Result<()> {
        if record.embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: record.embedding.len(),
            });
        }

        debug!(
            "Upserting document {} for tenant {} to collection {}",
            record.id, record.tenant_id, self.collection
        );

        let point = record_to_point(&record);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await?;

        Ok(())
    }

    async fn delete(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        debug!(
            "Deleting document {} for tenant {} from collection {}",
            document_id, tenant_id, self.collection
        );

        let id = PointId::from(point_uuid(tenant_id, document_id).to_string());
        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(vec![id]))
            .await?;

        Ok(())
    }

    async fn search_vector(
        &self,
        vector: &[f32],
        filter: &DocFilter,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        retry_with_backoff(&self.retry, "vector search", || {
            self.with_timeout(async {
                let builder =
                    SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64)
                        .with_payload(true)
                        .filter(filter_to_qdrant(filter));

                let response = self.client.search_points(builder).await?;

                let mut hits = Vec::with_capacity(response.result.len());
                for point in response.result {
                    let map: serde_json::Map<String, Value> = point
                        .payload
                        .into_iter()
                        .map(|(k, v)| (k, json_from_qdrant_value(v)))
                        .collect();
                    let payload = DocumentPayload::try_from(map)?;
                    hits.push(ScoredDoc {
                        id: payload.doc_id.clone(),
                        text: payload.text.clone(),
                        tenant_id: payload.tenant_id.clone(),
                        created_at: payload.created_at_utc(),
                        score: point.score,
                    });
                }

                Ok(hits)
            })
        })
        .await
    }

    async fn search_lexical(
        &self,
        text: &str,
        filter: &DocFilter,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>> {
        let terms = Bm25Scorer::tokenize(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = retry_with_backoff(&self.retry, "lexical scan", || {
            self.with_timeout(self.scroll_candidates(filter))
        })
        .await?;

        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let scores = self.scorer.score_window(&terms, &texts);

        let mut hits: Vec<ScoredDoc> = candidates
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score > 0.0)
            .map(|(payload, score)| ScoredDoc {
                id: payload.doc_id.clone(),
                text: payload.text.clone(),
                tenant_id: payload.tenant_id.clone(),
                created_at: payload.created_at_utc(),
                score,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Build the Qdrant filter conjunction: tenant must match, owner must
/// match when given, and at least one tag must match when tags are given
pub(crate) fn filter_to_qdrant(filter: &DocFilter) -> Filter {
    let mut must: Vec<Condition> = vec![Condition::matches(
        "tenant_id",
        filter.tenant_id.clone(),
    )];

    if let Some(ref owner_id) = filter.owner_id {
        must.push(Condition::matches("owner_id", owner_id.clone()));
    }

    if let Some(ref tags) = filter.tags {
        if !tags.is_empty() {
            let any_of = Filter {
                should: tags
                    .iter()
                    .map(|tag| Condition::matches("tags", tag.clone()))
                    .collect(),
                ..Default::default()
            };
            must.push(Condition {
                condition_one_of: Some(ConditionOneOf::Filter(any_of)),
            });
        }
    }

    Filter {
        must,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_requires_tenant() {
        let filter = filter_to_qdrant(&DocFilter::tenant("t1"));
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
    }

    #[test]
    fn test_filter_with_owner_and_tags() {
        let filter = filter_to_qdrant(
            &DocFilter::tenant("t1")
                .with_owner("u1")
                .with_tags(vec!["a".to_string(), "b".to_string()]),
        );

        // tenant + owner + nested any-of tag clause, all required
        assert_eq!(filter.must.len(), 3);

        let nested = filter
            .must
            .iter()
            .find_map(|c| match &c.condition_one_of {
                Some(ConditionOneOf::Filter(f)) => Some(f),
                _ => None,
            })
            .expect("tag clause should be a nested filter");
        assert_eq!(nested.should.len(), 2);
    }

    #[test]
    fn test_empty_tag_list_adds_no_clause() {
        let filter = filter_to_qdrant(&DocFilter::tenant("t1").with_tags(vec![]));
        assert_eq!(filter.must.len(), 1);
    }
}
