//! The bounded client pool.
//!
//! [`ClientPool`] composes two pieces:
//! - [`gate`]: admission control, at most `capacity` requests in flight
//! - [`cache`]: idle transport handles reused across requests
//!
//! A request is admitted, borrows a handle, executes, and on every exit
//! path gives the handle back and then its admission slot.
//!
//! # Example
//!
//! ```rust,ignore
//! use poolnet::{ClientPool, PoolRequest};
//!
//! let pool = ClientPool::builder().capacity(4).build_default()?;
//! let response = pool.send(PoolRequest::get("https://example.com").build()?).await?;
//! println!("Status: {}", response.status());
//! ```

pub mod cache;
pub mod gate;
pub mod global;

use crate::base::neterror::NetError;
use crate::http::charset::fix_invalid_charset;
use crate::http::{PoolRequest, PoolResponse};
use crate::transport::{
    CacheReadBehavior, NetworkTransportFactory, TransportFactory, TransportPolicy,
};
use cache::ClientCache;
use gate::PoolGate;
use tokio::sync::Semaphore;

/// Maximum number of transport handles in the process-wide pool.
pub const MAX_POOL_SIZE: usize = 10;

/// Construction-time pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum requests in flight, and so maximum handles alive.
    pub capacity: usize,

    /// Cache read behavior every handle is built with.
    pub cache_read_behavior: CacheReadBehavior,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { capacity: MAX_POOL_SIZE, cache_read_behavior: CacheReadBehavior::MostRecent }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), NetError> {
        if self.capacity == 0 || self.capacity > Semaphore::MAX_PERMITS {
            return Err(NetError::InvalidPoolCapacity);
        }
        Ok(())
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub available_slots: usize,
    pub in_flight: usize,
    pub idle_clients: usize,
    pub clients_created: usize,
}

/// Bounded pool of reusable transport handles.
pub struct ClientPool<F: TransportFactory = NetworkTransportFactory> {
    gate: PoolGate,
    clients: ClientCache<F>,
    policy: TransportPolicy,
}

impl<F: TransportFactory> std::fmt::Debug for ClientPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("capacity", &self.gate.capacity())
            .field("available_slots", &self.gate.available())
            .field("idle_clients", &self.clients.idle_count())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for ClientPool<NetworkTransportFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientPool<NetworkTransportFactory> {
    /// Pool of [`MAX_POOL_SIZE`] network handles preferring the most recent responses.
    pub fn new() -> Self {
        Self::from_parts(NetworkTransportFactory::new(), PoolConfig::default())
    }

    /// Create a new pool builder.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::default()
    }
}

impl<F: TransportFactory> ClientPool<F> {
    /// Create a pool over `factory`, validating `config`.
    pub fn with_config(factory: F, config: PoolConfig) -> Result<Self, NetError> {
        config.validate()?;
        Ok(Self::from_parts(factory, config))
    }

    fn from_parts(factory: F, config: PoolConfig) -> Self {
        tracing::debug!(
            capacity = config.capacity,
            cache_read_behavior = ?config.cache_read_behavior,
            "creating client pool"
        );
        Self {
            gate: PoolGate::new(config.capacity),
            clients: ClientCache::new(factory),
            policy: TransportPolicy::new(config.cache_read_behavior),
        }
    }

    /// Send a request through the pool.
    ///
    /// Waits while `capacity` requests are already in flight. The handle is
    /// checked back in and the slot released before this returns, on
    /// success, on error, and when the returned future is dropped.
    pub async fn send(&self, request: PoolRequest) -> Result<PoolResponse, NetError> {
        let _slot = self.gate.acquire_slot().await?;
        // Translated before checkout so a bad request never builds a handle.
        let http_request = request.to_http_request()?;
        // Declared after the slot so it drops first: checkin, then release.
        let mut client = self.clients.checkout(&self.policy)?;

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            reused = client.is_reused(),
            "sending pooled request"
        );

        let mut response = client.execute(http_request).await?;
        fix_invalid_charset(response.headers_mut());

        Ok(PoolResponse::from_http(response, request.into_url()))
    }

    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    /// Admission slots not currently held.
    pub fn available_slots(&self) -> usize {
        self.gate.available()
    }

    /// Requests currently admitted.
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Handles waiting in the idle queue.
    pub fn idle_clients(&self) -> usize {
        self.clients.idle_count()
    }

    /// Handles constructed over the pool's lifetime.
    pub fn clients_created(&self) -> usize {
        self.clients.created_count()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity(),
            available_slots: self.available_slots(),
            in_flight: self.in_flight(),
            idle_clients: self.idle_clients(),
            clients_created: self.clients_created(),
        }
    }

    pub fn policy(&self) -> &TransportPolicy {
        &self.policy
    }

    pub fn factory(&self) -> &F {
        self.clients.factory()
    }
}

/// Builder for creating a [`ClientPool`].
#[derive(Debug, Default)]
pub struct PoolBuilder {
    capacity: Option<usize>,
    cache_read_behavior: Option<CacheReadBehavior>,
}

impl PoolBuilder {
    /// Set the maximum number of requests in flight.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the cache read behavior handles are built with.
    pub fn cache_read_behavior(mut self, behavior: CacheReadBehavior) -> Self {
        self.cache_read_behavior = Some(behavior);
        self
    }

    pub fn config(&self) -> PoolConfig {
        let defaults = PoolConfig::default();
        PoolConfig {
            capacity: self.capacity.unwrap_or(defaults.capacity),
            cache_read_behavior: self.cache_read_behavior.unwrap_or(defaults.cache_read_behavior),
        }
    }

    /// Build the pool over a custom transport factory.
    pub fn build<F: TransportFactory>(self, factory: F) -> Result<ClientPool<F>, NetError> {
        ClientPool::<F>::with_config(factory, self.config())
    }

    /// Build the pool over network transports.
    pub fn build_default(self) -> Result<ClientPool, NetError> {
        self.build(NetworkTransportFactory::new())
    }
}
