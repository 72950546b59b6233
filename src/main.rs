use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use zenith::config::Config;
use zenith::embedder::{Embedder, HttpEmbedder, MockEmbedder};
use zenith::index::Index;
use zenith::{rpc, snapshot};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "zenith-server exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let embedder: Arc<dyn Embedder> = if config.mock_embedder {
        Arc::new(MockEmbedder::new(128))
    } else {
        Arc::new(HttpEmbedder::new(
            config.embedder_endpoint.clone(),
            config.embedder_timeout(),
        ))
    };

    let index = Arc::new(Index::new(embedder));

    match snapshot::load(&config.snapshot_path).context("loading snapshot")? {
        Some(state) => {
            index.restore(state);
            tracing::info!(path = %config.snapshot_path.display(), "restored index from snapshot");
        }
        None => tracing::info!("starting with an empty index"),
    }

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding RPC listener on {}", config.bind))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let serve_index = Arc::clone(&index);
    let mut server = tokio::spawn(async move { rpc::serve(listener, serve_index, shutdown_rx).await });

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal")?;
            tracing::info!("received interrupt, shutting down");
            let _ = shutdown_tx.send(());
            server
                .await
                .context("RPC server task panicked")?
                .context("RPC server failed")?;
        }
        result = &mut server => {
            result.context("RPC server task panicked")?.context("RPC server failed")?;
        }
    }

    let state = index.snapshot();
    snapshot::save(&state, &config.snapshot_path).context("saving snapshot on shutdown")?;

    Ok(())
}
