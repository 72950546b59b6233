//! Typed error values for the index core and snapshot codec.
//!
//! The service boundary (RPC handlers, `main`) collapses these into client-safe
//! acks or `anyhow` contexts; internally they are matched on.

/// Errors raised by the index store.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A malformed `Add` request: empty id or empty text. Non-mutating.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Two distinct original ids hashed to the same internal id.
    #[error("hash collision: '{existing}' and '{incoming}' both hash to internal id {internal_id}")]
    HashCollision {
        internal_id: u32,
        existing: String,
        incoming: String,
    },
}

/// Errors raised by the snapshot codec.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[source] postcard::Error),

    #[error("snapshot decode error: {0}")]
    Decode(#[source] postcard::Error),

    #[error("unsupported snapshot format version: {0}")]
    UnsupportedVersion(u16),
}
