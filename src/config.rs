//! Server configuration: CLI flags with environment-aware defaults.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Runtime configuration for the zenith server.
#[derive(Debug, Clone, Parser)]
#[command(name = "zenith-server", about = "In-memory hybrid search engine")]
pub struct Config {
    /// Address the RPC listener binds to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Path to the snapshot file, loaded on startup and saved on shutdown.
    #[arg(long, default_value = "zenith.db")]
    pub snapshot_path: PathBuf,

    /// Embedding oracle endpoint.
    #[arg(long, default_value = "http://localhost:5000/embed")]
    pub embedder_endpoint: String,

    /// Per-call embedder timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    pub embedder_timeout_secs: u64,

    /// Use the deterministic in-process mock embedder instead of calling
    /// out over HTTP. Intended for local trials without a running oracle.
    #[arg(long)]
    pub mock_embedder: bool,

    /// Tracing filter, e.g. `info`, `zenith=debug`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn embedder_timeout(&self) -> Duration {
        Duration::from_secs(self.embedder_timeout_secs)
    }
}
