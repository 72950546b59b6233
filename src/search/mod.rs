//! Per-branch scoring and reciprocal-rank fusion.
//!
//! These are pure functions over index maps so they can be unit-tested
//! without spinning up an [`crate::index::Index`] or an embedder.

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;

use crate::analyzer;
use crate::index::IndexState;

pub const RRF_K: f64 = 60.0;
pub const ANCHOR_BONUS: f64 = 10000.0;
pub const COVERAGE_BONUS: f64 = 50000.0;
pub const NEURAL_BONUS: f64 = 20000.0;
pub const PHONETIC_BONUS: f64 = 50.0;
pub const NGRAM_MULTIPLIER: f64 = 100.0;
pub const FUZZY_BONUS: f64 = 60.0;
pub const FUZZY_MIN_DIST: usize = 1;
pub const FUZZY_MAX_DIST: usize = 2;
pub const PASS2_THRESHOLD: f64 = 5.0;
pub const SEMANTIC_TOP_N: usize = 5;
pub const SEMANTIC_THRESHOLD: f32 = 0.70;
pub const RESULT_LIMIT: usize = 5;

/// Per-query mutable scoring state, threaded through Pass 1 and Pass 2.
#[derive(Default)]
pub struct BranchScores {
    pub keyword_score: AHashMap<u32, f64>,
    pub matched_tokens: AHashMap<u32, AHashSet<String>>,
    pub vector_score: AHashMap<u32, f64>,
}

impl BranchScores {
    fn record_hit(&mut self, doc: u32, contribution: f64, query_term: &str) {
        *self.keyword_score.entry(doc).or_insert(0.0) += contribution;
        self.matched_tokens
            .entry(doc)
            .or_default()
            .insert(query_term.to_string());
    }
}

/// Edge n-gram branch: matches `q`'s own fragments against the posting index.
pub fn score_ngram_branch(state: &IndexState, q: &str, scores: &mut BranchScores) {
    let q_len = q.chars().count().max(1);
    for fragment in analyzer::edge_ngrams(q) {
        let Some(posting) = state.postings.get(&fragment) else {
            continue;
        };
        let contribution = (fragment.chars().count() as f64 / q_len as f64) * NGRAM_MULTIPLIER;
        for &doc in posting {
            scores.record_hit(doc, contribution, q);
        }
    }
}

/// Phonetic branch: matches `q`'s Soundex code against the phonetic index.
pub fn score_phonetic_branch(state: &IndexState, q: &str, scores: &mut BranchScores) {
    let code = analyzer::soundex(q);
    if code.is_empty() {
        return;
    }
    let Some(posting) = state.phonetic_postings.get(&code) else {
        return;
    };
    for &doc in posting {
        scores.record_hit(doc, PHONETIC_BONUS, q);
    }
}

/// Fuzzy branch: only for query terms longer than 3 runes. Scans vocabulary
/// buckets within one length of `q` for near-misses within edit distance 2.
pub fn score_fuzzy_branch(state: &IndexState, q: &str, scores: &mut BranchScores) {
    let q_len = q.chars().count();
    if q_len <= 3 {
        return;
    }

    let lengths = [q_len.saturating_sub(1), q_len, q_len + 1];
    for &len in lengths.iter() {
        let Some(bucket) = state.vocabulary.get(&len) else {
            continue;
        };
        // Candidates in a bucket are independent; the edit-distance check is
        // the expensive part, so it runs across the pool and only the hits
        // get folded into the (sequential) score map.
        let hits: Vec<(&String, f64)> = bucket
            .par_iter()
            .filter_map(|candidate| {
                let (dist, within_cap) = analyzer::bounded_distance(q, candidate);
                if !within_cap || !(FUZZY_MIN_DIST..=FUZZY_MAX_DIST).contains(&dist) {
                    return None;
                }
                Some((candidate, FUZZY_BONUS / dist as f64))
            })
            .collect();
        for (candidate, contribution) in hits {
            let Some(posting) = state.postings.get(candidate) else {
                continue;
            };
            for &doc in posting {
                scores.record_hit(doc, contribution, q);
            }
        }
    }
}

/// Vector branch: cosine of the query embedding against every document
/// vector. Every document carrying a (non-empty) vector gets an entry, even
/// a zero score, so it still participates in the vector ranking `R_v`.
pub fn score_vector_branch(state: &IndexState, q_vec: &[f32], scores: &mut BranchScores) {
    for (&doc, vector) in &state.doc_vectors {
        if vector.is_empty() {
            continue;
        }
        let sim = analyzer::cosine_similarity_simd(q_vec, vector);
        scores.vector_score.insert(doc, f64::from(sim));
    }
}

/// Adds the anchor bonus to every document with a positive keyword score.
/// Applied once, after Pass 1's lexical/phonetic/fuzzy branches.
pub fn apply_anchor_bonus(scores: &mut BranchScores) {
    let hits: Vec<u32> = scores
        .keyword_score
        .iter()
        .filter(|&(_, &s)| s > 0.0)
        .map(|(&d, _)| d)
        .collect();
    for doc in hits {
        *scores.keyword_score.get_mut(&doc).expect("just matched") += ANCHOR_BONUS;
    }
}

/// Adds the coverage bonus to documents matched by every query term, at most
/// once per document — `already_bonused` tracks which documents have already
/// received it so a second call (after Pass 2 adds new matches) only grants
/// it to documents that newly qualify.
pub fn apply_coverage_bonus(
    scores: &mut BranchScores,
    query_term_count: usize,
    already_bonused: &mut AHashSet<u32>,
) {
    let newly_covering: Vec<u32> = scores
        .matched_tokens
        .iter()
        .filter(|(doc, terms)| terms.len() >= query_term_count && !already_bonused.contains(doc))
        .map(|(&d, _)| d)
        .collect();
    for doc in newly_covering {
        *scores.keyword_score.entry(doc).or_insert(0.0) += COVERAGE_BONUS;
        already_bonused.insert(doc);
    }
}

/// Terms (excluding `q` itself) whose embedding has cosine similarity to
/// `q_vec` of at least [`SEMANTIC_THRESHOLD`], ranked by score descending,
/// ties broken alphabetically, truncated to [`SEMANTIC_TOP_N`].
pub fn semantic_neighbors(
    term_vectors: &AHashMap<String, Vec<f32>>,
    q: &str,
    q_vec: &[f32],
) -> Vec<String> {
    if q_vec.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(String, f32)> = term_vectors
        .iter()
        .filter(|(term, _)| term.as_str() != q)
        .filter_map(|(term, vector)| {
            if vector.is_empty() {
                return None;
            }
            let sim = analyzer::cosine_similarity(q_vec, vector);
            (sim >= SEMANTIC_THRESHOLD).then(|| (term.clone(), sim))
        })
        .collect();

    scored.sort_by(|(term_a, score_a), (term_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .expect("cosine similarity is never NaN")
            .then_with(|| term_a.cmp(term_b))
    });
    scored.truncate(SEMANTIC_TOP_N);
    scored.into_iter().map(|(term, _)| term).collect()
}

/// Reciprocal rank fusion of the keyword and vector rankings, truncated to
/// [`RESULT_LIMIT`]. `keyword_score` must only contain documents with a
/// positive score (zero/negative entries are not part of `R_k`).
pub fn rrf_fuse(
    id_map: &AHashMap<u32, String>,
    keyword_score: &AHashMap<u32, f64>,
    vector_score: &AHashMap<u32, f64>,
) -> Vec<(String, f64)> {
    let original_id_of = |doc: u32| id_map.get(&doc).map(String::as_str).unwrap_or_default();

    let mut r_k: Vec<u32> = keyword_score
        .iter()
        .filter(|&(_, &s)| s > 0.0)
        .map(|(&d, _)| d)
        .filter(|d| id_map.contains_key(d))
        .collect();
    r_k.sort_by(|&a, &b| {
        keyword_score[&b]
            .partial_cmp(&keyword_score[&a])
            .expect("keyword scores are never NaN")
            .then_with(|| {
                let va = vector_score.get(&a).copied().unwrap_or(0.0);
                let vb = vector_score.get(&b).copied().unwrap_or(0.0);
                vb.partial_cmp(&va).expect("vector scores are never NaN")
            })
            .then_with(|| original_id_of(a).cmp(original_id_of(b)))
    });
    let rank_k: AHashMap<u32, usize> = r_k.iter().enumerate().map(|(i, &d)| (d, i + 1)).collect();

    let mut r_v: Vec<u32> = vector_score
        .keys()
        .copied()
        .filter(|d| id_map.contains_key(d))
        .collect();
    r_v.sort_by(|&a, &b| {
        vector_score[&b]
            .partial_cmp(&vector_score[&a])
            .expect("vector scores are never NaN")
            .then_with(|| original_id_of(a).cmp(original_id_of(b)))
    });
    let rank_v: AHashMap<u32, usize> = r_v.iter().enumerate().map(|(i, &d)| (d, i + 1)).collect();

    let mut all_docs: AHashSet<u32> = AHashSet::new();
    all_docs.extend(r_k.iter().copied());
    all_docs.extend(r_v.iter().copied());

    let mut fused: Vec<(u32, f64)> = all_docs
        .into_iter()
        .map(|doc| {
            let kw_term = rank_k
                .get(&doc)
                .map(|&rank| NGRAM_MULTIPLIER / (RRF_K + rank as f64))
                .unwrap_or(0.0);
            let vec_term = rank_v
                .get(&doc)
                .map(|&rank| 1.0 / (RRF_K + rank as f64))
                .unwrap_or(0.0);
            (doc, kw_term + vec_term)
        })
        .collect();

    fused.sort_by(|&(a, score_a), &(b, score_b)| {
        score_b
            .partial_cmp(&score_a)
            .expect("rrf scores are never NaN")
            .then_with(|| original_id_of(a).cmp(original_id_of(b)))
    });
    fused.truncate(RESULT_LIMIT);

    fused
        .into_iter()
        .map(|(doc, score)| (original_id_of(doc).to_string(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_state() -> IndexState {
        IndexState::default()
    }

    #[test]
    fn ngram_branch_scores_prefix_matches() {
        let mut state = fresh_state();
        state.postings.insert("rank".to_string(), vec![7]);
        let mut scores = BranchScores::default();
        score_ngram_branch(&state, "rank", &mut scores);
        assert!(scores.keyword_score[&7] > 0.0);
        assert!(scores.matched_tokens[&7].contains("rank"));
    }

    #[test]
    fn phonetic_branch_requires_a_matching_code() {
        let mut state = fresh_state();
        state
            .phonetic_postings
            .insert(analyzer::soundex("robert"), vec![3]);
        let mut scores = BranchScores::default();
        score_phonetic_branch(&state, "rupert", &mut scores);
        assert_eq!(scores.keyword_score[&3], PHONETIC_BONUS);
    }

    #[test]
    fn fuzzy_branch_skips_short_query_terms() {
        let mut state = fresh_state();
        state.vocabulary.insert(3, vec!["cat".to_string()]);
        state.postings.insert("cat".to_string(), vec![1]);
        let mut scores = BranchScores::default();
        score_fuzzy_branch(&state, "cot", &mut scores);
        assert!(scores.keyword_score.is_empty());
    }

    #[test]
    fn coverage_bonus_is_not_doubled_on_second_call() {
        let mut scores = BranchScores::default();
        scores.matched_tokens.insert(1, ["a".to_string()].into());
        scores.keyword_score.insert(1, 10.0);
        let mut bonused = AHashSet::new();
        apply_coverage_bonus(&mut scores, 1, &mut bonused);
        apply_coverage_bonus(&mut scores, 1, &mut bonused);
        assert_eq!(scores.keyword_score[&1], 10.0 + COVERAGE_BONUS);
    }

    #[test]
    fn rrf_fuse_prefers_keyword_hits_over_pure_vector() {
        let mut id_map = AHashMap::new();
        id_map.insert(1, "KEYWORD-DOC".to_string());
        id_map.insert(2, "VECTOR-DOC".to_string());

        let mut keyword_score = AHashMap::new();
        keyword_score.insert(1, 1.0);

        let mut vector_score = AHashMap::new();
        vector_score.insert(2, 0.99);
        vector_score.insert(1, 0.0);

        let results = rrf_fuse(&id_map, &keyword_score, &vector_score);
        assert_eq!(results[0].0, "KEYWORD-DOC");
    }

    #[test]
    fn rrf_fuse_breaks_ties_by_original_id() {
        let mut id_map = AHashMap::new();
        id_map.insert(1, "B".to_string());
        id_map.insert(2, "A".to_string());

        let mut keyword_score = AHashMap::new();
        keyword_score.insert(1, 5.0);
        keyword_score.insert(2, 5.0);

        let results = rrf_fuse(&id_map, &keyword_score, &AHashMap::new());
        assert_eq!(results[0].0, "A");
        assert_eq!(results[1].0, "B");
    }
}
