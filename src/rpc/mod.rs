//! Binary length-delimited RPC surface: `Index` and `Search`.

pub mod protocol;
pub mod server;

pub use protocol::{Request, Response, SearchHit};
pub use server::serve;
