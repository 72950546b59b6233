//! The index store: postings, vectors, vocabulary, and the `Add`/`Search`
//! entry points that tie the analyzer, embedder and scorer together.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::analyzer;
use crate::embedder::Embedder;
use crate::error::IndexError;
use crate::hashing::fnv1a32;
use crate::search;

/// All index state guarded by [`Index`]'s single reader-writer lock. Also
/// the unit the snapshot codec serializes.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct IndexState {
    pub id_map: AHashMap<u32, String>,
    pub postings: AHashMap<String, Vec<u32>>,
    pub phonetic_postings: AHashMap<String, Vec<u32>>,
    pub doc_vectors: AHashMap<u32, Vec<f32>>,
    pub fragments_of: AHashMap<u32, AHashSet<String>>,
    /// This document's term occurrences as last indexed, kept so a re-index
    /// can undo its `term_frequency` contribution before adding the new
    /// text's — mirrors `fragments_of`'s purge-then-insert role for postings.
    pub terms_of: AHashMap<u32, Vec<String>>,
    pub term_frequency: AHashMap<String, u64>,
    pub vocabulary: AHashMap<usize, Vec<String>>,
    pub globally_seen: AHashSet<String>,
    pub term_vectors: AHashMap<String, Vec<f32>>,
}

/// In-memory hybrid index: lexical postings plus embedding vectors, scored
/// through [`search`]'s branch functions and fused with reciprocal rank
/// fusion.
pub struct Index {
    state: RwLock<IndexState>,
    embedder: Arc<dyn Embedder>,
}

fn insert_sorted_unique(list: &mut Vec<u32>, id: u32) {
    match list.binary_search(&id) {
        Ok(_) => {}
        Err(pos) => list.insert(pos, id),
    }
}

fn remove_from_posting(map: &mut AHashMap<String, Vec<u32>>, fragment: &str, id: u32) {
    let Some(list) = map.get_mut(fragment) else {
        return;
    };
    if let Ok(pos) = list.binary_search(&id) {
        list.remove(pos);
    }
    if list.is_empty() {
        map.remove(fragment);
    }
}

fn decrement_term_frequency(map: &mut AHashMap<String, u64>, term: &str) {
    let Some(count) = map.get_mut(term) else {
        return;
    };
    *count -= 1;
    if *count == 0 {
        map.remove(term);
    }
}

impl Index {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            embedder,
        }
    }

    /// Idempotent upsert. Embedder calls (for the document and for any
    /// globally-new term) happen before the write lock is acquired; the
    /// purge-then-insert mutation itself is atomic under a single
    /// acquisition.
    pub async fn add(&self, original_id: &str, text: &str) -> Result<(), IndexError> {
        if original_id.is_empty() || text.is_empty() {
            return Err(IndexError::MalformedRequest(
                "id and text must both be non-empty".to_string(),
            ));
        }

        let doc_vector = self.embedder.embed(text).await;
        let terms = analyzer::tokenize(text);

        let unseen_terms: Vec<String> = {
            let mut seen_in_doc = AHashSet::new();
            let state = self.state.read();
            terms
                .iter()
                .filter(|term| seen_in_doc.insert((*term).clone()))
                .filter(|term| !state.term_vectors.contains_key(term.as_str()))
                .cloned()
                .collect()
        };
        let mut new_term_vectors = Vec::with_capacity(unseen_terms.len());
        for term in unseen_terms {
            let vector = self.embedder.embed(&term).await;
            new_term_vectors.push((term, vector));
        }

        let internal_id = fnv1a32(original_id);

        let mut state = self.state.write();

        if let Some(existing) = state.id_map.get(&internal_id) {
            if existing != original_id {
                return Err(IndexError::HashCollision {
                    internal_id,
                    existing: existing.clone(),
                    incoming: original_id.to_string(),
                });
            }
        }

        if let Some(stale_fragments) = state.fragments_of.remove(&internal_id) {
            for fragment in &stale_fragments {
                remove_from_posting(&mut state.postings, fragment, internal_id);
                remove_from_posting(&mut state.phonetic_postings, fragment, internal_id);
            }
        }
        if let Some(stale_terms) = state.terms_of.remove(&internal_id) {
            for term in &stale_terms {
                decrement_term_frequency(&mut state.term_frequency, term);
            }
        }

        state.id_map.insert(internal_id, original_id.to_string());
        state.doc_vectors.insert(internal_id, doc_vector);

        for (term, vector) in new_term_vectors {
            state.term_vectors.entry(term).or_insert(vector);
        }

        let mut fragments_of_doc: AHashSet<String> = AHashSet::new();

        for term in &terms {
            *state.term_frequency.entry(term.clone()).or_insert(0) += 1;

            for fragment in analyzer::edge_ngrams(term) {
                if fragments_of_doc.insert(fragment.clone()) {
                    insert_sorted_unique(state.postings.entry(fragment).or_default(), internal_id);
                }
            }

            let code = analyzer::soundex(term);
            if !code.is_empty() && fragments_of_doc.insert(code.clone()) {
                insert_sorted_unique(
                    state.phonetic_postings.entry(code).or_default(),
                    internal_id,
                );
            }

            if state.globally_seen.insert(term.clone()) {
                state
                    .vocabulary
                    .entry(term.chars().count())
                    .or_default()
                    .push(term.clone());
            }
        }

        state.fragments_of.insert(internal_id, fragments_of_doc);
        state.terms_of.insert(internal_id, terms);

        Ok(())
    }

    /// Analyzes `query`, runs Pass 1 (lexical/phonetic/fuzzy + vector),
    /// conditionally runs Pass 2 (neural expansion), fuses with RRF, and
    /// returns up to [`search::RESULT_LIMIT`] `(original_id, score)` pairs.
    pub async fn search(&self, query: &str) -> Vec<(String, f64)> {
        let query_terms = analyzer::tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let q_vec = self.embedder.embed(query).await;
        let mut scores = search::BranchScores::default();

        {
            let state = self.state.read();
            if state.id_map.is_empty() {
                return Vec::new();
            }
            for q in &query_terms {
                search::score_ngram_branch(&state, q, &mut scores);
                search::score_phonetic_branch(&state, q, &mut scores);
                search::score_fuzzy_branch(&state, q, &mut scores);
            }
            search::score_vector_branch(&state, &q_vec, &mut scores);
        }

        search::apply_anchor_bonus(&mut scores);
        let mut coverage_bonused = AHashSet::new();
        search::apply_coverage_bonus(&mut scores, query_terms.len(), &mut coverage_bonused);

        let best_keyword_score = scores
            .keyword_score
            .values()
            .copied()
            .fold(0.0_f64, f64::max);

        if best_keyword_score < search::PASS2_THRESHOLD {
            self.run_neural_expansion(&query_terms, &mut scores).await;
            search::apply_coverage_bonus(&mut scores, query_terms.len(), &mut coverage_bonused);
        }

        let state = self.state.read();
        search::rrf_fuse(&state.id_map, &scores.keyword_score, &scores.vector_score)
    }

    async fn run_neural_expansion(&self, query_terms: &[String], scores: &mut search::BranchScores) {
        for q in query_terms.iter().filter(|q| q.chars().count() >= 3) {
            let q_vec = self.embedder.embed(q).await;
            if q_vec.is_empty() {
                continue;
            }

            let neighbors = {
                let state = self.state.read();
                search::semantic_neighbors(&state.term_vectors, q, &q_vec)
            };
            if neighbors.is_empty() {
                continue;
            }

            let state = self.state.read();
            for neighbor in &neighbors {
                let stemmed = analyzer::stem(neighbor);
                let mut docs: AHashSet<u32> = AHashSet::new();
                if let Some(posting) = state.postings.get(&stemmed) {
                    docs.extend(posting.iter().copied());
                }
                let prefix_len = stemmed.chars().count().min(3);
                let prefix: String = stemmed.chars().take(prefix_len).collect();
                if let Some(posting) = state.postings.get(&prefix) {
                    docs.extend(posting.iter().copied());
                }
                for doc in docs {
                    *scores.keyword_score.entry(doc).or_insert(0.0) += search::NEURAL_BONUS;
                    scores.matched_tokens.entry(doc).or_default().insert(q.clone());
                }
            }
        }
    }

    /// Clones the current state for the snapshot codec. Takes the reader
    /// lock, matching `Save`'s locking discipline.
    pub fn snapshot(&self) -> IndexState {
        self.state.read().clone()
    }

    /// Replaces all state. Takes the writer lock, matching `Load`'s locking
    /// discipline.
    pub fn restore(&self, state: IndexState) {
        *self.state.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::MockEmbedder;

    fn new_index() -> Index {
        Index::new(Arc::new(MockEmbedder::new(8)))
    }

    #[tokio::test]
    async fn rejects_empty_id_or_text_without_mutating() {
        let idx = new_index();
        assert!(idx.add("", "some text").await.is_err());
        assert!(idx.add("ID", "").await.is_err());
        assert!(idx.state.read().id_map.is_empty());
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let idx = new_index();
        idx.add("TECH-01", "The PageRank algorithm uses backlink structures.")
            .await
            .unwrap();
        let first = idx.snapshot();
        idx.add("TECH-01", "The PageRank algorithm uses backlink structures.")
            .await
            .unwrap();
        let second = idx.snapshot();
        assert_eq!(first.postings.len(), second.postings.len());
        assert_eq!(first.fragments_of.len(), second.fragments_of.len());
        assert_eq!(first.term_frequency, second.term_frequency);
    }

    #[tokio::test]
    async fn reindexing_with_different_text_does_not_inflate_term_frequency() {
        let idx = new_index();
        idx.add("LEGAL-03", "revolutionary revolutionary database")
            .await
            .unwrap();
        assert_eq!(idx.state.read().term_frequency.get("revolutionary"), Some(&2));

        idx.add("LEGAL-03", "gardening paragraph").await.unwrap();
        let state = idx.state.read();
        assert!(!state.term_frequency.contains_key("revolutionary"));
        assert_eq!(state.term_frequency.get("garden"), Some(&1));
    }

    #[tokio::test]
    async fn reindex_purges_stale_fragments() {
        let idx = new_index();
        idx.add("LEGAL-03", "The relational database was revolutionary.")
            .await
            .unwrap();
        let internal_id = fnv1a32("LEGAL-03");
        assert!(idx.state.read().postings.contains_key("revolutionary"));

        idx.add("LEGAL-03", "Completely different text entirely.")
            .await
            .unwrap();
        let state = idx.state.read();
        if let Some(posting) = state.postings.get("revolutionary") {
            assert!(!posting.contains(&internal_id));
        }
    }

    #[tokio::test]
    async fn pageran_prefix_query_finds_pagerank_document() {
        let idx = new_index();
        idx.add("TECH-01", "The PageRank algorithm uses backlink structures.")
            .await
            .unwrap();
        idx.add(
            "DATA-08",
            "Modern ranking systems prioritize various ranks and ranked signals to ensure high-quality rankings.",
        )
        .await
        .unwrap();

        let results = idx.search("PageRan").await;
        assert_eq!(results.first().map(|(id, _)| id.as_str()), Some("TECH-01"));
    }

    #[tokio::test]
    async fn empty_query_returns_no_results() {
        let idx = new_index();
        idx.add("TECH-01", "The PageRank algorithm.").await.unwrap();
        assert!(idx.search("   ...   ").await.is_empty());
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let idx = new_index();
        assert!(idx.search("anything").await.is_empty());
    }
}
