//! Top-level retrieval-augmented answering engine
//!
//! `RagEngine` wires the embedding gateway, the vector index, the hybrid
//! retriever, the answer composer, and the session store into one facade:
//! index, delete, search, answer.

use crate::compose::{AnswerComposer, ComposeFailure};
use crate::config::Config;
use crate::embed::{embed_one, Embedder};
use crate::error::{Error, Result};
use crate::llm::Generator;
use crate::models::{
    AnswerRequest, DocumentRecord, GroundedAnswer, IngestRequest, RetrievalHit, SearchRequest,
    TurnRole,
};
use crate::retrieve::HybridRetriever;
use crate::session::SessionStore;
use crate::store::VectorIndex;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Concurrent upserts per batch ingestion call
const UPSERT_CONCURRENCY: usize = 8;

/// Answering failed after retrieval succeeded. The retrieved citations
/// are exposed so callers can still show the sources.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct AnswerFailure {
    #[source]
    pub error: Error,
    pub citations: Vec<crate::models::Citation>,
}

impl From<ComposeFailure> for AnswerFailure {
    fn from(failure: ComposeFailure) -> Self {
        Self {
            error: failure.error,
            citations: failure.citations,
        }
    }
}

impl From<Error> for AnswerFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            citations: Vec::new(),
        }
    }
}

pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    sessions: Arc<dyn SessionStore>,
    retriever: HybridRetriever,
    composer: AnswerComposer,
}

impl RagEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
        sessions: Arc<dyn SessionStore>,
        config: &Config,
    ) -> Self {
        let retriever =
            HybridRetriever::new(embedder.clone(), index.clone(), config.retrieval.clone());
        let composer =
            AnswerComposer::new(generator, config.llm.clone(), config.composer.clone());
        Self {
            embedder,
            index,
            sessions,
            retriever,
            composer,
        }
    }

    /// Embed and index a passage. A request that pins an `id` replaces any
    /// existing document under that id; otherwise a fresh id is minted.
    /// Returns the document id.
    pub async fn index_document(&self, request: IngestRequest) -> Result<String> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument(
                "Document text must not be empty".to_string(),
            ));
        }
        if request.tenant_id.is_empty() {
            return Err(Error::InvalidArgument(
                "tenant_id must not be empty".to_string(),
            ));
        }

        let id = request
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let embedding = embed_one(self.embedder.as_ref(), text).await?;

        let record = DocumentRecord {
            id: id.clone(),
            text: text.to_string(),
            embedding,
            tenant_id: request.tenant_id.clone(),
            owner_id: request.owner_id,
            tags: request.tags,
            created_at: Utc::now(),
        };

        self.index.upsert(record).await?;
        info!(
            "Indexed document {} for tenant {}",
            id, request.tenant_id
        );
        Ok(id)
    }

    /// Index a batch of passages with a single embedding call. Returns
    /// document ids in request order.
    pub async fn index_documents(&self, requests: Vec<IngestRequest>) -> Result<Vec<String>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        for request in &requests {
            if request.text.trim().is_empty() {
                return Err(Error::InvalidArgument(
                    "Document text must not be empty".to_string(),
                ));
            }
            if request.tenant_id.is_empty() {
                return Err(Error::InvalidArgument(
                    "tenant_id must not be empty".to_string(),
                ));
            }
        }

        let texts: Vec<String> = requests
            .iter()
            .map(|r| r.text.trim().to_string())
            .collect();
        let embeddings = self.embedder.embed(texts.clone()).await?;
        if embeddings.len() != requests.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                requests.len(),
                embeddings.len()
            )));
        }

        let now = Utc::now();
        let mut ids = Vec::with_capacity(requests.len());
        let mut records = Vec::with_capacity(requests.len());
        for ((request, text), embedding) in requests.into_iter().zip(texts).zip(embeddings) {
            let id = request
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            ids.push(id.clone());
            records.push(DocumentRecord {
                id,
                text,
                embedding,
                tenant_id: request.tenant_id,
                owner_id: request.owner_id,
                tags: request.tags,
                created_at: now,
            });
        }

        stream::iter(records)
            .map(|record| self.index.upsert(record))
            .buffer_unordered(UPSERT_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;

        info!("Indexed batch of {} documents", ids.len());
        Ok(ids)
    }

    /// Remove a document. Deleting an id that does not exist is a no-op.
    pub async fn delete_document(&self, tenant_id: &str, document_id: &str) -> Result<()> {
        self.index.delete(tenant_id, document_id).await?;
        info!("Deleted document {} for tenant {}", document_id, tenant_id);
        Ok(())
    }

    /// Hybrid search without answer generation
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<RetrievalHit>> {
        self.retriever
            .search(&request.query, &request.filter, request.limit)
            .await
    }

    /// Retrieve, compose, and answer. Session recording is best-effort:
    /// a session store failure is logged but never fails the answer.
    pub async fn answer(
        &self,
        request: AnswerRequest,
    ) -> std::result::Result<GroundedAnswer, AnswerFailure> {
        let hits = self
            .retriever
            .search(&request.question, &request.filter, request.limit)
            .await?;

        let answer = self.composer.compose(&request.question, &hits).await?;

        if let Some(session_id) = &request.session_id {
            self.record_turns(session_id, &request.question, &answer.answer)
                .await;
        }

        Ok(answer)
    }

    async fn record_turns(&self, session_id: &str, question: &str, answer: &str) {
        if let Err(err) = self
            .sessions
            .append(session_id, TurnRole::User, question)
            .await
        {
            warn!("Failed to record user turn for session {session_id}: {err}");
            return;
        }
        if let Err(err) = self
            .sessions
            .append(session_id, TurnRole::Assistant, answer)
            .await
        {
            warn!("Failed to record assistant turn for session {session_id}: {err}");
        }
    }

    /// Recorded turns for a session, oldest first
    pub async fn session_history(&self, session_id: &str) -> Result<Vec<crate::models::Turn>> {
        self.sessions.history(session_id).await
    }
}
