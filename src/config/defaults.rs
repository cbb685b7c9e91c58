//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default collection name
pub fn default_collection_name() -> String {
    "ragline_docs".to_string()
}

/// Default embedding backend URL (OpenAI-compatible /v1/embeddings)
pub fn default_embedding_url() -> String {
    std::env::var("RAGLINE_EMBEDDING_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

/// Default embedding dimension (text-embedding-3-large)
pub fn default_embedding_dimension() -> usize {
    3072
}

/// Default embedding request timeout in seconds
pub fn default_embedding_timeout() -> u64 {
    30
}

/// Default LLM backend URL (OpenAI-compatible /v1/chat/completions)
pub fn default_llm_url() -> String {
    std::env::var("RAGLINE_LLM_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default LLM model
pub fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

/// Default maximum completion tokens
pub fn default_llm_max_tokens() -> u32 {
    2000
}

/// Default sampling temperature
pub fn default_llm_temperature() -> f32 {
    0.7
}

/// Default generation request timeout in seconds
pub fn default_llm_timeout() -> u64 {
    60
}

/// Default number of hits returned by a query
pub fn default_retrieval_limit() -> usize {
    5
}

/// Maximum hits a caller may request
pub fn default_retrieval_max_limit() -> usize {
    50
}

/// Default lexical weight in score fusion (vector weight is the complement)
pub fn default_lexical_weight() -> f32 {
    0.5
}

/// Default candidate-pool oversampling factor per search leg
pub fn default_oversample_factor() -> usize {
    2
}

/// Default cap on scrolled candidates for in-process lexical scoring
pub fn default_lexical_scan_limit() -> usize {
    1000
}

/// Default per-call search timeout in seconds
pub fn default_search_timeout() -> u64 {
    30
}

/// Default context budget for the answer composer, in characters
pub fn default_context_budget_chars() -> usize {
    6000
}

/// Default retry attempts for idempotent upstream calls
pub fn default_retry_max_attempts() -> usize {
    3
}

/// Default base backoff delay in milliseconds
pub fn default_retry_base_delay_ms() -> u64 {
    200
}

/// Default backoff delay ceiling in milliseconds
pub fn default_retry_max_delay_ms() -> u64 {
    5000
}

/// Default cap on turns kept per session
pub fn default_session_max_turns() -> usize {
    50
}
