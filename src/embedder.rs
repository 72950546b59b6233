//! Client for the external embedding oracle.
//!
//! The oracle is a blocking request/response collaborator: `POST {endpoint}`
//! with `{"text": "..."}`, expecting `{"embedding": [f32, ...]}`. Failure
//! (transport, decode, or timeout) degrades to an empty vector rather than
//! propagating an error — callers treat an empty vector as "no semantic
//! signal" (`cosine_similarity` is 0 for empty vectors).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A text → embedding oracle. Implementations must be stateless and safe
/// for concurrent use; `embed` never blocks the caller past its own timeout.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP client for the remote embedding oracle.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpEmbedder {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        let call = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { text })
            .send();

        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                warn!(error = %err, "embedder request failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis(), "embedder request timed out");
                return Vec::new();
            }
        };

        match response.json::<EmbedResponse>().await {
            Ok(body) => body.embedding,
            Err(err) => {
                warn!(error = %err, "embedder response decode failed");
                Vec::new()
            }
        }
    }
}

/// Deterministic, network-free embedder for tests: seeds a small PRNG from
/// the FNV-1a hash of the input text so that the same text always produces
/// the same vector, and unrelated texts produce near-orthogonal vectors.
pub struct MockEmbedder {
    dims: usize,
}

impl MockEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        let mut state = u64::from(crate::hashing::fnv1a32(text));
        (0..self.dims)
            .map(|_| (splitmix64(&mut state) >> 11) as f32 / (1u64 << 53) as f32)
            .collect()
    }
}
