//! Admission control: at most `capacity` requests in flight.

use crate::base::neterror::NetError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Counting gate bounding concurrent in-flight requests.
///
/// Cloning shares the underlying counter.
#[derive(Debug, Clone)]
pub struct PoolGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl PoolGate {
    /// Create a gate with `capacity` admission slots.
    ///
    /// Callers validate `capacity` first; see
    /// [`PoolConfig::validate`](crate::pool::PoolConfig::validate).
    pub fn new(capacity: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Wait for a free slot.
    ///
    /// Dropping the returned future before it completes leaves the gate
    /// untouched. The slot is given back when the [`AdmissionSlot`] drops.
    pub async fn acquire_slot(&self) -> Result<AdmissionSlot, NetError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| NetError::PoolClosed)?;
        tracing::trace!(available = self.semaphore.available_permits(), "admission slot acquired");
        Ok(AdmissionSlot { _permit: permit })
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire_slot(&self) -> Option<AdmissionSlot> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Some(AdmissionSlot { _permit: permit }),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

/// One unit of admission. Released exactly once, on drop.
#[must_use = "the slot is released as soon as it is dropped"]
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        tracing::trace!("admission slot released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = PoolGate::new(2);
        assert_eq!(gate.available(), 2);

        let first = gate.acquire_slot().await.unwrap();
        let second = gate.acquire_slot().await.unwrap();
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.in_flight(), 2);
        assert!(gate.try_acquire_slot().is_none());

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_admitted_after_release() {
        let gate = PoolGate::new(1);
        let held = gate.acquire_slot().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _slot = gate.acquire_slot().await.unwrap();
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_is_noop() {
        let gate = PoolGate::new(1);
        let held = gate.acquire_slot().await.unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), gate.acquire_slot()).await;
        assert!(timed_out.is_err());
        assert_eq!(gate.available(), 0);

        drop(held);
        assert_eq!(gate.available(), 1);
        assert!(gate.try_acquire_slot().is_some());
    }
}
