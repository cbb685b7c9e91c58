//! ragline: multi-tenant hybrid retrieval with grounded answering
//!
//! Documents are embedded through an OpenAI-compatible gateway and stored
//! in Qdrant. Queries run a lexical leg and a vector leg concurrently,
//! fuse the scores, and ground an LLM answer in the fused hits with
//! per-source citations. All reads and writes are scoped to a tenant.

pub mod compose;
pub mod config;
pub mod embed;
pub mod engine;
pub mod error;
pub mod llm;
pub mod models;
pub mod retrieve;
pub mod retry;
pub mod session;
pub mod store;

pub use config::Config;
pub use engine::{AnswerFailure, RagEngine};
pub use error::{Error, Result};
pub use models::{
    AnswerRequest, Citation, DocFilter, DocumentRecord, GroundedAnswer, IngestRequest,
    RetrievalHit, SearchRequest,
};
