//! Answer composition
//!
//! Builds a bounded grounding context from retrieval hits, delegates
//! generation to the LLM gateway, and maps citation indices back to
//! source documents.

use crate::config::{ComposerConfig, EmptyContextPolicy, LlmConfig};
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, Generator};
use crate::models::{Citation, GroundedAnswer, RetrievalHit};
use std::sync::Arc;
use tracing::{debug, info};

/// Fixed instruction for grounded answering
const SYSTEM_PROMPT: &str = "You are an assistant that answers questions from supplied source passages.

Rules:
1. Answer using only the numbered sources in the context block.
2. If the sources do not contain the answer, say explicitly that the provided sources are insufficient.
3. Cite the sources you used by their index, e.g. \"according to [1]\".
4. Do not speculate beyond the sources.";

/// Deterministic answer used when retrieval produced nothing and the
/// policy avoids a wasted LLM call
const INSUFFICIENT_ANSWER: &str =
    "No relevant sources were found for this question, so an answer cannot be provided.";

/// Marker sent as the context block under the call-through policy
const NO_SOURCES_MARKER: &str = "[no sources found]";

/// Generation failed after retrieval succeeded; the citations are
/// preserved so the caller still gets the retrieved sources
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ComposeFailure {
    #[source]
    pub error: Error,
    pub citations: Vec<Citation>,
}

pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    llm: LlmConfig,
    config: ComposerConfig,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>, llm: LlmConfig, config: ComposerConfig) -> Self {
        Self {
            generator,
            llm,
            config,
        }
    }

    /// Compose a grounded answer for the question from the hits, which
    /// must already be in descending fused-score order
    pub async fn compose(
        &self,
        question: &str,
        hits: &[RetrievalHit],
    ) -> std::result::Result<GroundedAnswer, ComposeFailure> {
        if hits.is_empty() {
            match self.config.empty_context {
                EmptyContextPolicy::Static => {
                    debug!("No hits; returning static answer without an LLM call");
                    return Ok(GroundedAnswer {
                        answer: INSUFFICIENT_ANSWER.to_string(),
                        citations: Vec::new(),
                        model: String::new(),
                    });
                }
                EmptyContextPolicy::CallThrough => {
                    let answer = self
                        .generate(question, NO_SOURCES_MARKER.to_string())
                        .await
                        .map_err(|error| ComposeFailure {
                            error,
                            citations: Vec::new(),
                        })?;
                    return Ok(GroundedAnswer {
                        answer,
                        citations: Vec::new(),
                        model: self.generator.model_name().to_string(),
                    });
                }
            }
        }

        let (context, citations) = self.build_context(hits);
        info!(
            "Composed context from {} of {} hits ({} chars)",
            citations.len(),
            hits.len(),
            context.len()
        );

        let answer = self
            .generate(question, context)
            .await
            .map_err(|error| ComposeFailure {
                error,
                citations: citations.clone(),
            })?;

        Ok(GroundedAnswer {
            answer,
            citations,
            model: self.generator.model_name().to_string(),
        })
    }

    /// Concatenate hit texts under stable citation indices, dropping
    /// lowest-scored hits once the character budget is exceeded. The top
    /// hit is always kept.
    fn build_context(&self, hits: &[RetrievalHit]) -> (String, Vec<Citation>) {
        let budget = self.config.context_budget_chars;
        let mut blocks: Vec<String> = Vec::new();
        let mut citations: Vec<Citation> = Vec::new();
        let mut used = 0usize;

        for (i, hit) in hits.iter().enumerate() {
            let index = i + 1;
            let block = format!("[{}] {}", index, hit.text.trim());

            if !blocks.is_empty() && used + block.len() > budget {
                break;
            }

            used += block.len();
            blocks.push(block);
            citations.push(Citation::from_hit(index, hit));
        }

        (blocks.join("\n\n"), citations)
    }

    async fn generate(&self, question: &str, context: String) -> Result<String> {
        let user_prompt = format!(
            "Sources:\n\n{}\n\nQuestion: {}\n\nAnswer the question using the sources above.",
            context, question
        );

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ];

        self.generator
            .generate(messages, self.llm.max_tokens, self.llm.temperature)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeGenerator {
        calls: AtomicUsize,
        last_user_prompt: Mutex<String>,
        fail: bool,
    }

    impl FakeGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_user_prompt: Mutex::new(String::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        async fn generate(
            &self,
            messages: Vec<ChatMessage>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(user) = messages.last() {
                *self.last_user_prompt.lock().unwrap() = user.content.clone();
            }
            if self.fail {
                return Err(Error::Generation("provider unavailable".to_string()));
            }
            Ok("Grounded answer citing [1].".to_string())
        }

        fn model_name(&self) -> &str {
            "fake-llm"
        }
    }

    fn hit(id: &str, text: &str, fused: f32) -> RetrievalHit {
        RetrievalHit {
            document_id: id.to_string(),
            text: text.to_string(),
            tenant_id: "t1".to_string(),
            created_at: Utc::now(),
            keyword_score: Some(1.0),
            vector_score: Some(0.8),
            fused_score: fused,
        }
    }

    fn composer_with(
        generator: Arc<FakeGenerator>,
        budget: usize,
        policy: EmptyContextPolicy,
    ) -> AnswerComposer {
        AnswerComposer::new(
            generator,
            LlmConfig::default(),
            ComposerConfig {
                context_budget_chars: budget,
                empty_context: policy,
            },
        )
    }

    #[tokio::test]
    async fn test_citations_indexed_in_score_order() {
        let generator = Arc::new(FakeGenerator::new());
        let composer = composer_with(generator.clone(), 6000, EmptyContextPolicy::Static);

        let hits = vec![hit("best", "top passage", 0.9), hit("next", "second passage", 0.5)];
        let answer = composer.compose("question?", &hits).await.unwrap();

        assert_eq!(answer.citations.len(), 2);
        assert_eq!(answer.citations[0].index, 1);
        assert_eq!(answer.citations[0].document_id, "best");
        assert_eq!(answer.citations[1].index, 2);
        assert_eq!(answer.citations[1].document_id, "next");
        assert_eq!(answer.model, "fake-llm");

        let prompt = generator.last_user_prompt.lock().unwrap().clone();
        assert!(prompt.contains("[1] top passage"));
        assert!(prompt.contains("[2] second passage"));
        assert!(prompt.contains("Question: question?"));
    }

    #[tokio::test]
    async fn test_budget_drops_lowest_scored_hits() {
        let generator = Arc::new(FakeGenerator::new());
        // Budget fits the first block only
        let composer = composer_with(generator.clone(), 40, EmptyContextPolicy::Static);

        let hits = vec![
            hit("a", "a passage that fits in the budget", 0.9),
            hit("b", "a second passage that will not fit", 0.5),
        ];
        let answer = composer.compose("q", &hits).await.unwrap();

        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].document_id, "a");
        let prompt = generator.last_user_prompt.lock().unwrap().clone();
        assert!(!prompt.contains("second passage"));
    }

    #[tokio::test]
    async fn test_top_hit_kept_even_over_budget() {
        let generator = Arc::new(FakeGenerator::new());
        let composer = composer_with(generator.clone(), 5, EmptyContextPolicy::Static);

        let hits = vec![hit("only", "a passage much longer than five characters", 0.9)];
        let answer = composer.compose("q", &hits).await.unwrap();
        assert_eq!(answer.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_hits_static_policy_skips_llm() {
        let generator = Arc::new(FakeGenerator::new());
        let composer = composer_with(generator.clone(), 6000, EmptyContextPolicy::Static);

        let answer = composer.compose("q", &[]).await.unwrap();
        assert_eq!(answer.answer, INSUFFICIENT_ANSWER);
        assert!(answer.citations.is_empty());
        assert!(answer.model.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

        // Deterministic for repeated calls
        let again = composer.compose("q", &[]).await.unwrap();
        assert_eq!(again.answer, answer.answer);
    }

    #[tokio::test]
    async fn test_empty_hits_call_through_policy_sends_marker() {
        let generator = Arc::new(FakeGenerator::new());
        let composer = composer_with(generator.clone(), 6000, EmptyContextPolicy::CallThrough);

        let answer = composer.compose("q", &[]).await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert!(answer.citations.is_empty());

        let prompt = generator.last_user_prompt.lock().unwrap().clone();
        assert!(prompt.contains(NO_SOURCES_MARKER));
    }

    #[tokio::test]
    async fn test_generation_failure_preserves_citations() {
        let generator = Arc::new(FakeGenerator::failing());
        let composer = composer_with(generator, 6000, EmptyContextPolicy::Static);

        let hits = vec![hit("a", "passage", 0.9)];
        let failure = composer.compose("q", &hits).await.unwrap_err();

        assert!(matches!(failure.error, Error::Generation(_)));
        assert_eq!(failure.citations.len(), 1);
        assert_eq!(failure.citations[0].document_id, "a");
    }
}
