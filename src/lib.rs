//! # zenith
//!
//! An in-memory hybrid (lexical + semantic) search engine. Documents are
//! indexed under a stable 32-bit id derived from their external id;
//! queries are scored across n-gram, phonetic, fuzzy and vector branches,
//! then fused with reciprocal rank fusion.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zenith::embedder::MockEmbedder;
//! use zenith::index::Index;
//!
//! # async fn run() {
//! let index = Index::new(Arc::new(MockEmbedder::new(128)));
//! index.add("DOC-1", "The PageRank algorithm uses backlink structures.").await.unwrap();
//! let results = index.search("PageRank").await;
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod embedder;
pub mod error;
pub mod hashing;
pub mod index;
pub mod rpc;
pub mod search;
pub mod snapshot;
