//! Score fusion for hybrid retrieval
//!
//! Each search leg's scores are min-max normalized to unit range
//! independently, then combined with a configurable weight pair summing
//! to 1.0. A document absent from a leg contributes 0 for that term, so a
//! document present in both legs never scores below what either leg alone
//! would give it. Ties are broken by more recent `created_at`, then by
//! ascending `document_id`, yielding a total order.

use crate::models::{RetrievalHit, ScoredDoc};
use std::collections::HashMap;

struct Accumulator {
    text: String,
    tenant_id: String,
    created_at: chrono::DateTime<chrono::Utc>,
    keyword_score: Option<f32>,
    vector_score: Option<f32>,
    fused: f32,
}

/// Merge the two ranked lists into one deduplicated, fused-score-ordered
/// list. `lexical_weight + vector_weight` is expected to be 1.0.
pub fn fuse(
    lexical: Vec<ScoredDoc>,
    vector: Vec<ScoredDoc>,
    lexical_weight: f32,
    vector_weight: f32,
) -> Vec<RetrievalHit> {
    let mut merged: HashMap<String, Accumulator> =
        HashMap::with_capacity(lexical.len() + vector.len());

    let lexical_norms = normalize(&lexical);
    for (doc, norm) in lexical.into_iter().zip(lexical_norms) {
        let entry = merged.entry(doc.id.clone()).or_insert_with(|| Accumulator {
            text: doc.text.clone(),
            tenant_id: doc.tenant_id.clone(),
            created_at: doc.created_at,
            keyword_score: None,
            vector_score: None,
            fused: 0.0,
        });
        entry.keyword_score = Some(doc.score);
        entry.fused += lexical_weight * norm;
    }

    let vector_norms = normalize(&vector);
    for (doc, norm) in vector.into_iter().zip(vector_norms) {
        let entry = merged.entry(doc.id.clone()).or_insert_with(|| Accumulator {
            text: doc.text.clone(),
            tenant_id: doc.tenant_id.clone(),
            created_at: doc.created_at,
            keyword_score: None,
            vector_score: None,
            fused: 0.0,
        });
        entry.vector_score = Some(doc.score);
        entry.fused += vector_weight * norm;
    }

    let mut hits: Vec<RetrievalHit> = merged
        .into_iter()
        .map(|(id, acc)| RetrievalHit {
            document_id: id,
            text: acc.text,
            tenant_id: acc.tenant_id,
            created_at: acc.created_at,
            keyword_score: acc.keyword_score,
            vector_score: acc.vector_score,
            fused_score: acc.fused,
        })
        .collect();

    hits.sort_by(|a, b| {
        b.fused_score
            .total_cmp(&a.fused_score)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    hits
}

/// Min-max normalization to unit range. A constant list (including a
/// single element) normalizes to 1.0 so a lone hit is not zeroed out of
/// its own leg.
fn normalize(docs: &[ScoredDoc]) -> Vec<f32> {
    let Some((min, max)) = min_max(docs) else {
        return Vec::new();
    };

    let range = max - min;
    docs.iter()
        .map(|d| {
            if range < f32::EPSILON {
                1.0
            } else {
                (d.score - min) / range
            }
        })
        .collect()
}

fn min_max(docs: &[ScoredDoc]) -> Option<(f32, f32)> {
    if docs.is_empty() {
        return None;
    }
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for d in docs {
        if d.score < min {
            min = d.score;
        }
        if d.score > max {
            max = d.score;
        }
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn doc(id: &str, score: f32) -> ScoredDoc {
        doc_at(id, score, 0)
    }

    fn doc_at(id: &str, score: f32, minute: u32) -> ScoredDoc {
        ScoredDoc {
            id: id.to_string(),
            text: format!("text {}", id),
            tenant_id: "t1".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap(),
            score,
        }
    }

    #[test]
    fn test_both_legs_outrank_single_leg() {
        let lexical = vec![doc("both", 2.0), doc("lex_only", 2.0)];
        let vector = vec![doc("both", 0.9), doc("vec_only", 0.9)];

        let hits = fuse(lexical, vector, 0.5, 0.5);
        assert_eq!(hits[0].document_id, "both");
        assert!(hits[0].fused_score > hits[1].fused_score);
    }

    #[test]
    fn test_fused_at_least_single_leg_score() {
        let lexical = vec![doc("a", 3.0), doc("b", 1.0)];
        let vector = vec![doc("a", 0.8), doc("c", 0.4)];

        let hits = fuse(lexical.clone(), vector.clone(), 0.5, 0.5);
        let a_fused = hits
            .iter()
            .find(|h| h.document_id == "a")
            .unwrap()
            .fused_score;

        let lex_alone = fuse(lexical, Vec::new(), 0.5, 0.5);
        let a_lex = lex_alone
            .iter()
            .find(|h| h.document_id == "a")
            .unwrap()
            .fused_score;

        assert!(a_fused >= a_lex);
    }

    #[test]
    fn test_disjoint_legs_form_union() {
        let lexical = vec![doc("l1", 2.0), doc("l2", 1.0)];
        let vector = vec![doc("v1", 0.9), doc("v2", 0.5)];

        let hits = fuse(lexical, vector, 0.5, 0.5);
        assert_eq!(hits.len(), 4);

        let l2 = hits.iter().find(|h| h.document_id == "l2").unwrap();
        assert!(l2.keyword_score.is_some());
        assert!(l2.vector_score.is_none());
    }

    #[test]
    fn test_no_duplicates_for_overlapping_legs() {
        let lexical = vec![doc("a", 2.0)];
        let vector = vec![doc("a", 0.9)];

        let hits = fuse(lexical, vector, 0.5, 0.5);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].keyword_score.is_some());
        assert!(hits[0].vector_score.is_some());
    }

    #[test]
    fn test_single_element_leg_normalizes_to_one() {
        let hits = fuse(vec![doc("only", 0.0001)], Vec::new(), 0.5, 0.5);
        assert!((hits[0].fused_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tie_break_recent_first_then_id() {
        // Equal raw scores fuse to equal values
        let lexical = vec![
            doc_at("older", 1.0, 0),
            doc_at("newer", 1.0, 5),
            doc_at("also_newer", 1.0, 5),
        ];

        let hits = fuse(lexical, Vec::new(), 1.0, 0.0);
        assert_eq!(hits[0].document_id, "also_newer");
        assert_eq!(hits[1].document_id, "newer");
        assert_eq!(hits[2].document_id, "older");
    }

    #[test]
    fn test_weights_shift_ranking() {
        let lexical = vec![doc("lex_top", 5.0), doc("shared", 1.0)];
        let vector = vec![doc("vec_top", 0.99), doc("shared", 0.1)];

        let lex_heavy = fuse(lexical.clone(), vector.clone(), 0.9, 0.1);
        assert_eq!(lex_heavy[0].document_id, "lex_top");

        let vec_heavy = fuse(lexical, vector, 0.1, 0.9);
        assert_eq!(vec_heavy[0].document_id, "vec_top");
    }

    #[test]
    fn test_empty_legs_fuse_to_empty() {
        assert!(fuse(Vec::new(), Vec::new(), 0.5, 0.5).is_empty());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let make = || {
            (
                vec![doc("a", 1.0), doc("b", 1.0), doc("c", 0.5)],
                vec![doc("b", 0.7), doc("d", 0.7)],
            )
        };

        let (l1, v1) = make();
        let (l2, v2) = make();
        let first: Vec<String> = fuse(l1, v1, 0.5, 0.5)
            .into_iter()
            .map(|h| h.document_id)
            .collect();
        let second: Vec<String> = fuse(l2, v2, 0.5, 0.5)
            .into_iter()
            .map(|h| h.document_id)
            .collect();
        assert_eq!(first, second);
    }
}
