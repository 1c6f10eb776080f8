//! The process-wide pool.
//!
//! Built on first use with [`MAX_POOL_SIZE`](super::MAX_POOL_SIZE) network
//! handles preferring the most recent responses. Every caller in the
//! process shares it.

use super::ClientPool;
use crate::base::neterror::NetError;
use crate::http::{PoolRequest, PoolResponse};
use once_cell::sync::Lazy;

static GLOBAL_POOL: Lazy<ClientPool> = Lazy::new(ClientPool::new);

/// The shared pool instance.
pub fn global() -> &'static ClientPool {
    &GLOBAL_POOL
}

/// Send a request through the shared pool.
pub async fn send(request: PoolRequest) -> Result<PoolResponse, NetError> {
    global().send(request).await
}
