//! Core data model: indexed documents, retrieval hits, grounded answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of indexed knowledge. Records are never mutated in place:
/// updates are modeled as delete + re-insert under the same id, since the
/// embedding is derivable only from the current text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Opaque unique identifier, stable per tenant
    pub id: String,

    /// Original passage content
    pub text: String,

    /// Fixed-dimension embedding derived from `text`
    pub embedding: Vec<f32>,

    /// Tenant this record belongs to; every query filters on it
    pub tenant_id: String,

    /// Owning user, if scoped below the tenant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Free-form labels for optional any-of filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Set once at ingestion
    pub created_at: DateTime<Utc>,
}

/// Request to index a passage. When `id` is given, an existing document
/// with that id is replaced; otherwise a fresh id is generated.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub id: Option<String>,
    pub text: String,
    pub tenant_id: String,
    pub owner_id: Option<String>,
    pub tags: Vec<String>,
}

/// Scoping filter applied to every search: conjunction over the required
/// tenant, optional owner, and optional tags (any-of).
#[derive(Debug, Clone)]
pub struct DocFilter {
    pub tenant_id: String,
    pub owner_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl DocFilter {
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            owner_id: None,
            tags: None,
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

/// A candidate returned by one search leg, before fusion
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub id: String,
    pub text: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

/// Ephemeral per-query result. Exists only for the duration of one
/// query/response cycle; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub document_id: String,
    pub text: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,

    /// Lexical relevance, absent when the document did not match lexically
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,

    /// Cosine-derived similarity, absent when not in the vector candidate set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,

    /// Combined ranking score; always present
    pub fused_score: f32,
}

/// Hybrid search request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub filter: DocFilter,
    /// Maximum hits to return; `None` uses the configured default
    pub limit: Option<usize>,
}

/// Answer request: a question plus the retrieval scope
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub question: String,
    pub filter: DocFilter,
    pub limit: Option<usize>,
    /// When set, the question and answer are appended to this session's
    /// history (best-effort)
    pub session_id: Option<String>,
}

/// Maps a citation index in the answer text back to its source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based index as rendered in the context block (`[1]`, `[2]`, ...)
    pub index: usize,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    pub fused_score: f32,
}

impl Citation {
    pub fn from_hit(index: usize, hit: &RetrievalHit) -> Self {
        Self {
            index,
            document_id: hit.document_id.clone(),
            keyword_score: hit.keyword_score,
            vector_score: hit.vector_score,
            fused_score: hit.fused_score,
        }
    }
}

/// A grounded answer with its source citations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    /// Model that produced the answer; empty when no LLM call was made
    pub model: String,
}

/// One conversation turn in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}
