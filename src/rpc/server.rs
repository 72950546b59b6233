//! TCP server: one length-delimited, postcard-framed request/response per
//! connection round-trip. Each connection is a sequential task; there is no
//! parallelism within a single `Index` or `Search` call.

use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, error, info, warn};

use crate::index::Index;

use super::protocol::{Request, Response, SearchHit};

/// Serves `Index`/`Search` requests on an already-bound `listener` until
/// `shutdown` resolves. Binding happens in the caller so a bind failure
/// surfaces before the server task is spawned, rather than only being
/// noticed on shutdown.
pub async fn serve(
    listener: TcpListener,
    index: Arc<Index>,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr()?, "zenith RPC listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let index = Arc::clone(&index);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, index).await {
                        warn!(%peer, error = %err, "connection ended with an error");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("RPC server shutting down");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, index: Arc<Index>) -> std::io::Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let frame = frame?;
        let request: Request = match postcard::from_bytes(&frame) {
            Ok(req) => req,
            Err(err) => {
                error!(error = %err, "failed to decode request frame");
                continue;
            }
        };

        let response = dispatch(&index, request).await;
        let bytes = postcard::to_allocvec(&response)
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        framed.send(Bytes::from(bytes)).await?;
    }

    Ok(())
}

async fn dispatch(index: &Index, request: Request) -> Response {
    match request {
        Request::Index { id, data } => match index.add(&id, &data).await {
            Ok(()) => Response::Index {
                status: true,
                message: "document indexed successfully".to_string(),
            },
            Err(err) => {
                debug!(error = %err, "index request rejected");
                Response::Index {
                    status: false,
                    message: err.to_string(),
                }
            }
        },
        Request::Search { query } => {
            let results = index
                .search(&query)
                .await
                .into_iter()
                .map(|(id, score)| SearchHit { id, score })
                .collect();
            Response::Search { results }
        }
    }
}
