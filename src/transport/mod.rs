//! Transport handles managed by the pool.
//!
//! A transport handle executes one request at a time and is reused across
//! requests. The pool never looks inside a handle; it only needs:
//! - [`Transport`]: execute a translated request, report reusability
//! - [`TransportFactory`]: construct a handle from the pool's fixed [`TransportPolicy`]
//!
//! [`network`] holds the default implementation over hyper and BoringSSL.

pub mod network;

use crate::base::neterror::NetError;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::Full;

pub use network::{NetworkTransport, NetworkTransportFactory};

/// Alias for the `Future` returned by [`Transport::execute`].
pub type Executing<'a> = BoxFuture<'a, Result<Response<Bytes>, NetError>>;

/// How a handle consults a response cache before going to the network.
///
/// Matches the read behaviors of a protocol filter's cache control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheReadBehavior {
    /// Serve fresh entries, revalidate stale ones.
    Normal,
    /// Always ask the server; revalidate cached entries instead of serving them.
    #[default]
    MostRecent,
    /// Serve any cached entry, never touch the network.
    OnlyFromCache,
    /// Skip cache reads entirely.
    NoCache,
}

/// Fixed configuration applied to every handle the pool constructs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportPolicy {
    pub cache_read_behavior: CacheReadBehavior,
}

impl TransportPolicy {
    pub fn new(cache_read_behavior: CacheReadBehavior) -> Self {
        Self { cache_read_behavior }
    }
}

/// A reusable transport handle.
///
/// `execute` takes `&mut self`: a handle is owned by exactly one in-flight
/// request. The returned future may be dropped at any await point (request
/// cancellation); the handle must remain usable afterwards or report
/// otherwise through [`is_reusable`](Transport::is_reusable).
pub trait Transport: Send + 'static {
    /// Execute one request and return the fully buffered response.
    fn execute(&mut self, request: Request<Full<Bytes>>) -> Executing<'_>;

    /// Whether the handle may go back to the idle queue.
    fn is_reusable(&self) -> bool {
        true
    }
}

/// Constructs transport handles. Shared by all callers of a pool.
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: Transport;

    /// Build a new handle. Failure is fatal for the request that asked for it.
    fn create(&self, policy: &TransportPolicy) -> Result<Self::Transport, NetError>;
}
