//! Deterministic in-process index
//!
//! Exact cosine similarity plus the same BM25 scorer the Qdrant adapter
//! uses. Intended for tests and small embedded deployments; results are
//! reproducible across runs given identical contents.

use super::lexical::Bm25Scorer;
use super::VectorIndex;
use crate::error::{Error, Result};
use crate::models::{DocFilter, DocumentRecord, ScoredDoc};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::embed::cosine_similarity;

/// In-memory index keyed by `(tenant_id, document_id)`
pub struct MemoryIndex {
    dimension: usize,
    docs: RwLock<HashMap<(String, String), DocumentRecord>>,
    scorer: Bm25Scorer,
}

impl MemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            docs: RwLock::new(HashMap::new()),
            scorer: Bm25Scorer::new(),
        }
    }

    /// Number of stored documents, across all tenants
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    fn matches(filter: &DocFilter, record: &DocumentRecord) -> bool {
        if record.tenant_id != filter.tenant_id {
            return false;
        }

        if let Some(ref owner_id) = filter.owner_id {
            if record.owner_id.as_deref() != Some(owner_id.as_str()) {
                return false;
            }
        }

        if let Some(ref tags) = filter.tags {
            if !tags.is_empty() && !tags.iter().any(|t| record.tags.contains(t)) {
                return false;
            }
        }

        true
    }

    fn to_scored(record: &DocumentRecord, score: f32) -> ScoredDoc {
        ScoredDoc {
            id: record.id.clone(),
            text: record.text.clone(),
            tenant_id: record.tenant_id.clone(),
            created_at: record.created_at,
            score,
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, record: DocumentRecord) -> Result<()> {
        if record.embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: record.embedding.len(),
            });
        }

        let key = (record.tenant_id.clone(), record.id.clone());
        self.docs.write().await.insert(key, record);
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        let key = (tenant_id.to_string(), document_id.to_string());
        self.docs.write().await.remove(&key);
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

        let docs = self.docs.read().await;
        let mut hits: Vec<ScoredDoc> = docs
            .values()
            .filter(|r| Self::matches(filter, r))
            .map(|r| Self::to_scored(r, cosine_similarity(vector, &r.embedding)))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
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

        let docs = self.docs.read().await;
        let mut candidates: Vec<&DocumentRecord> =
            docs.values().filter(|r| Self::matches(filter, r)).collect();
        // Stable window order so BM25 window statistics are reproducible
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        let texts: Vec<&str> = candidates.iter().map(|r| r.text.as_str()).collect();
        let scores = self.scorer.score_window(&terms, &texts);

        let mut hits: Vec<ScoredDoc> = candidates
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score > 0.0)
            .map(|(record, score)| Self::to_scored(record, score))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }
}
