//! Wire-level request/response types for the binary RPC surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    Index { id: String, data: String },
    Search { query: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    Index { status: bool, message: String },
    Search { results: Vec<SearchHit> },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
}
