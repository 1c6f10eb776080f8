//! # poolnet
//!
//! A bounded, reusable HTTP client pool for Rust.
//!
//! `poolnet` lets any number of concurrent callers send HTTP requests while
//! keeping the number of live transport handles, and the number of requests
//! in flight, below a fixed cap. Handles are expensive to build (TLS context,
//! keep-alive connections), so they are kept and reused instead of being
//! built per request.
//!
//! ## Features
//!
//! - **Admission Control**: at most 10 requests in flight in the shared pool
//! - **Handle Reuse**: idle handles are reused oldest-first
//! - **Cancellation Safety**: handles and slots are returned on every exit path
//! - **Response Cache**: conditional revalidation with `ETag`/`Last-Modified`
//! - **Charset Repair**: quoted `charset` values in `Content-Type` are unquoted
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use poolnet::PoolRequest;
//!
//! #[tokio::main]
//! async fn main() {
//!     let request = PoolRequest::get("https://example.com").build().unwrap();
//!     let response = poolnet::send(request).await.unwrap();
//!     println!("Status: {}", response.status());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core types and error definitions
//! - [`http`] - Requests, responses, charset repair and the response cache
//! - [`pool`] - Admission gate, idle handle cache and the shared pool
//! - [`socket`] - TCP and TLS connection setup
//! - [`transport`] - Transport handle traits and the default network handle

pub mod base;
pub mod http;
pub mod pool;
pub mod socket;
pub mod transport;

pub use base::neterror::NetError;
pub use crate::http::{PoolRequest, PoolRequestBuilder, PoolResponse};
pub use pool::global::{global, send};
pub use pool::{ClientPool, PoolBuilder, PoolConfig, PoolStats, MAX_POOL_SIZE};
pub use transport::{
    CacheReadBehavior, NetworkTransportFactory, Transport, TransportFactory, TransportPolicy,
};
