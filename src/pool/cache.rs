//! Idle transport handles waiting to be reused.

use crate::base::neterror::NetError;
use crate::transport::{Executing, Transport, TransportFactory, TransportPolicy};
use bytes::Bytes;
use crossbeam::queue::SegQueue;
use http::Request;
use http_body_util::Full;
use std::sync::atomic::{AtomicUsize, Ordering};

/// FIFO of constructed-but-unused handles, plus the factory that builds new ones.
///
/// The queue is unbounded; the pool gate limits how many handles can be
/// checked out at once, which in turn limits how many ever exist.
pub struct ClientCache<F: TransportFactory> {
    factory: F,
    idle: SegQueue<F::Transport>,
    created: AtomicUsize,
}

impl<F: TransportFactory> ClientCache<F> {
    pub fn new(factory: F) -> Self {
        Self { factory, idle: SegQueue::new(), created: AtomicUsize::new(0) }
    }

    /// Reuse the oldest idle handle, or construct one with `policy`.
    pub fn checkout(&self, policy: &TransportPolicy) -> Result<CheckedOutClient<'_, F>, NetError> {
        if let Some(client) = self.idle.pop() {
            tracing::trace!(idle = self.idle.len(), "reusing idle transport");
            return Ok(CheckedOutClient { cache: self, client: Some(client), reused: true });
        }

        let client = self.factory.create(policy)?;
        let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(created, "constructed transport");
        Ok(CheckedOutClient { cache: self, client: Some(client), reused: false })
    }

    /// Return a handle for reuse. Handles that report themselves unusable are dropped.
    pub fn checkin(&self, client: F::Transport) {
        if !client.is_reusable() {
            tracing::warn!("discarding transport that is no longer reusable");
            return;
        }
        self.idle.push(client);
        tracing::trace!(idle = self.idle.len(), "transport checked in");
    }

    /// Handles currently idle.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Handles constructed over the cache's lifetime.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F: TransportFactory> std::fmt::Debug for ClientCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("idle", &self.idle_count())
            .field("created", &self.created_count())
            .finish()
    }
}

/// A handle on loan to one request. Checked back in when dropped, whatever
/// the outcome of the request, including cancellation.
pub struct CheckedOutClient<'a, F: TransportFactory> {
    cache: &'a ClientCache<F>,
    client: Option<F::Transport>,
    reused: bool,
}

impl<F: TransportFactory> CheckedOutClient<'_, F> {
    /// Whether the handle came from the idle queue rather than the factory.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn execute(&mut self, request: Request<Full<Bytes>>) -> Executing<'_> {
        match self.client.as_mut() {
            Some(client) => client.execute(request),
            None => Box::pin(async { Err(NetError::ConnectionAborted) }),
        }
    }
}

impl<F: TransportFactory> Drop for CheckedOutClient<'_, F> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.cache.checkin(client);
        }
    }
}
