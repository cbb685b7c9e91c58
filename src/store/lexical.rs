//! In-process BM25 scoring for the lexical search leg
//!
//! Qdrant provides no lexical relevance of its own, so both index
//! implementations score a filtered candidate window here. IDF is computed
//! over that window.

/// BM25 scorer with standard parameters
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
}

impl Bm25Scorer {
    pub fn new() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }

    /// Tokenize a query or document into lowercase terms; tokens shorter
    /// than three characters carry little signal and are dropped
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() >= 3)
            .map(|s| s.to_lowercase())
            .collect()
    }

    /// Score every document in the window against the query terms.
    /// Returns one score per document, 0.0 for documents with no term match.
    pub fn score_window(&self, query_terms: &[String], docs: &[&str]) -> Vec<f32> {
        if query_terms.is_empty() || docs.is_empty() {
            return vec![0.0; docs.len()];
        }

        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| Self::tokenize(d)).collect();
        let total_len: usize = tokenized.iter().map(|t| t.len()).sum();
        let avg_doc_len = (total_len as f32 / docs.len() as f32).max(1.0);
        let n = docs.len() as f32;

        // Document frequency per query term over the window
        let df: Vec<f32> = query_terms
            .iter()
            .map(|term| {
                tokenized
                    .iter()
                    .filter(|tokens| tokens.iter().any(|t| t == term))
                    .count() as f32
            })
            .collect();

        tokenized
            .iter()
            .map(|tokens| {
                let doc_len = tokens.len() as f32;
                let mut score = 0.0;

                for (term, df) in query_terms.iter().zip(df.iter()) {
                    let tf = tokens.iter().filter(|t| *t == term).count() as f32;
                    if tf == 0.0 {
                        continue;
                    }

                    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                    let numerator = tf * (self.k1 + 1.0);
                    let denominator =
                        tf + self.k1 * (1.0 - self.b + self.b * (doc_len / avg_doc_len));
                    score += idf * (numerator / denominator);
                }

                score
            })
            .collect()
    }
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_short_tokens() {
        let terms = Bm25Scorer::tokenize("How to configure X?");
        assert!(terms.contains(&"how".to_string()));
        assert!(terms.contains(&"configure".to_string()));
        assert!(!terms.contains(&"to".to_string()));
        assert!(!terms.contains(&"x".to_string()));
    }

    #[test]
    fn test_matching_doc_outscores_unrelated() {
        let scorer = Bm25Scorer::new();
        let terms = Bm25Scorer::tokenize("rust programming");
        let docs = vec!["Rust is a systems programming language", "Python is great"];

        let scores = scorer.score_window(&terms, &docs.iter().map(|s| *s).collect::<Vec<_>>());
        assert!(scores[0] > scores[1]);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_rare_term_weighs_more_than_common() {
        let scorer = Bm25Scorer::new();
        let terms = Bm25Scorer::tokenize("framework qdrant");
        let docs: Vec<&str> = vec![
            "a web framework for services",
            "another web framework",
            "qdrant vector database",
        ];

        let scores = scorer.score_window(&terms, &docs);
        // "qdrant" appears in one document of three, "framework" in two;
        // the rare term contributes the larger IDF
        assert!(scores[2] > scores[1]);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        let scorer = Bm25Scorer::new();
        let scores = scorer.score_window(&[], &["some text"]);
        assert_eq!(scores, vec![0.0]);
    }
}
