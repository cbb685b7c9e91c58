//! Hybrid retrieval
//!
//! Runs a lexical and a vector search concurrently over the same
//! tenant-scoped candidate set, fuses the two ranked lists into one, and
//! returns a deduplicated, score-ordered result.

mod fusion;

pub use fusion::fuse;

use crate::config::RetrievalConfig;
use crate::embed::{embed_one, Embedder};
use crate::error::{Error, Result};
use crate::models::{DocFilter, RetrievalHit, ScoredDoc};
use crate::store::VectorIndex;
use std::sync::Arc;
use tracing::{debug, info};

pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Retrieve at most `limit` hits for the query, highest fused score
    /// first, visible to the filter's tenant/owner/tags only
    pub async fn search(
        &self,
        query: &str,
        filter: &DocFilter,
        limit: Option<usize>,
    ) -> Result<Vec<RetrievalHit>> {
        let limit = self.resolve_limit(limit)?;

        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }

        let query_vector = embed_one(self.embedder.as_ref(), query).await?;

        // Both legs are independent; oversample the candidate pools so
        // fusion sees more than `limit` candidates per leg
        let pool = limit.saturating_mul(self.config.oversample_factor);
        let (lexical, vector) = tokio::join!(
            self.index.search_lexical(query, filter, pool),
            self.index.search_vector(&query_vector, filter, pool),
        );
        let lexical = Self::enforce_tenant(lexical?, filter);
        let vector = Self::enforce_tenant(vector?, filter);

        debug!(
            "Query '{}': {} lexical and {} vector candidates for tenant {}",
            query,
            lexical.len(),
            vector.len(),
            filter.tenant_id
        );

        let mut hits = fuse(
            lexical,
            vector,
            self.config.lexical_weight,
            self.config.vector_weight(),
        );
        hits.truncate(limit);

        info!(
            "Returning {} hits for tenant {}",
            hits.len(),
            filter.tenant_id
        );
        Ok(hits)
    }

    fn resolve_limit(&self, limit: Option<usize>) -> Result<usize> {
        let limit = limit.unwrap_or(self.config.default_limit);

        if limit == 0 {
            return Err(Error::InvalidArgument(
                "limit must be greater than 0".to_string(),
            ));
        }

        if limit > self.config.max_limit {
            return Err(Error::InvalidArgument(format!(
                "limit {} exceeds maximum {}",
                limit, self.config.max_limit
            )));
        }

        Ok(limit)
    }

    /// Cross-tenant hits are a correctness violation regardless of what
    /// the underlying engine returned; drop them before fusion
    fn enforce_tenant(docs: Vec<ScoredDoc>, filter: &DocFilter) -> Vec<ScoredDoc> {
        docs.into_iter()
            .filter(|d| d.tenant_id == filter.tenant_id)
            .collect()
    }
}
