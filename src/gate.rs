//! Capacity gate: counting admission control for lease requests

use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::UNBOUNDED;
use crate::errors::{PoolError, PoolResult};

/// Absolute deadline for a lease request, fixed once at the start of the
/// call so that internal waits never restart the clock.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    Forever,
    Immediate,
    At { at: Instant, timeout_ms: i64 },
}

impl Deadline {
    pub(crate) fn from_timeout_ms(timeout_ms: i64) -> PoolResult<Self> {
        match timeout_ms {
            UNBOUNDED => Ok(Self::Forever),
            0 => Ok(Self::Immediate),
            ms if ms > 0 => Ok(Self::At {
                at: Instant::now() + Duration::from_millis(ms as u64),
                timeout_ms: ms,
            }),
            ms => Err(PoolError::InvalidArgument(ms)),
        }
    }
}

/// Bounds the number of instances simultaneously leased-out-or-idle.
///
/// Unbounded pools carry no semaphore; `acquire` then succeeds without
/// suspending. Bounded pools forget each acquired permit and refund it
/// through [`release`](Self::release), so a permit stays consumed for the
/// whole life of the instance it admitted, whether that instance is on
/// lease or sitting idle.
pub(crate) struct CapacityGate {
    semaphore: Option<Semaphore>,
}

impl CapacityGate {
    pub(crate) fn new(max_leases: i64) -> Self {
        let semaphore =
            (max_leases != UNBOUNDED).then(|| Semaphore::new(max_leases as usize));
        Self { semaphore }
    }

    /// Wait for a permit. Cancellation is checked before and during the
    /// wait and wins over an expiring deadline observed in the same poll;
    /// a cancelled or timed-out call consumes no permit.
    pub(crate) async fn acquire(
        &self,
        deadline: Deadline,
        cancel: Option<&CancellationToken>,
    ) -> PoolResult<()> {
        let Some(semaphore) = &self.semaphore else {
            return Ok(());
        };
        if let Some(token) = cancel
            && token.is_cancelled()
        {
            return Err(PoolError::Cancelled);
        }
        let permit = match deadline {
            Deadline::Forever => wait(semaphore, cancel).await?,
            Deadline::Immediate => return self.try_acquire_now(),
            Deadline::At { at, timeout_ms } => {
                match tokio::time::timeout_at(at, wait(semaphore, cancel)).await {
                    Ok(result) => result?,
                    Err(_) => return Err(PoolError::LeaseTimeout(timeout_ms)),
                }
            }
        };
        permit.forget();
        Ok(())
    }

    /// Synchronous immediate attempt; never waits.
    pub(crate) fn try_acquire_now(&self) -> PoolResult<()> {
        let Some(semaphore) = &self.semaphore else {
            return Ok(());
        };
        match semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Ok(())
            }
            Err(TryAcquireError::Closed) => Err(PoolError::Disposed),
            Err(TryAcquireError::NoPermits) => Err(PoolError::LeaseTimeout(0)),
        }
    }

    /// Refund one permit. Safe even when the instance it admitted was
    /// finalized instead of enqueued.
    pub(crate) fn release(&self) {
        if let Some(semaphore) = &self.semaphore {
            semaphore.add_permits(1);
        }
    }

    /// Fail all current and future waiters with `Disposed`.
    pub(crate) fn close(&self) {
        if let Some(semaphore) = &self.semaphore {
            semaphore.close();
        }
    }

    /// Free permits, or `None` when unbounded.
    pub(crate) fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(Semaphore::available_permits)
    }
}

async fn wait<'a>(
    semaphore: &'a Semaphore,
    cancel: Option<&CancellationToken>,
) -> PoolResult<SemaphorePermit<'a>> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(PoolError::Cancelled),
            permit = semaphore.acquire() => permit.map_err(|_| PoolError::Disposed),
        },
        None => semaphore.acquire().await.map_err(|_| PoolError::Disposed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_gate_never_blocks() {
        let gate = CapacityGate::new(UNBOUNDED);
        for _ in 0..1000 {
            gate.acquire(Deadline::Immediate, None).await.unwrap();
        }
        assert_eq!(gate.available(), None);
    }

    #[tokio::test]
    async fn immediate_acquire_fails_without_waiting() {
        let gate = CapacityGate::new(1);
        gate.acquire(Deadline::Immediate, None).await.unwrap();
        let err = gate.acquire(Deadline::Immediate, None).await.unwrap_err();
        assert_eq!(err, PoolError::LeaseTimeout(0));
        gate.release();
        gate.acquire(Deadline::Immediate, None).await.unwrap();
    }

    #[tokio::test]
    async fn bounded_acquire_times_out() {
        let gate = CapacityGate::new(1);
        gate.acquire(Deadline::Immediate, None).await.unwrap();

        let start = Instant::now();
        let deadline = Deadline::from_timeout_ms(50).unwrap();
        let err = gate.acquire(deadline, None).await.unwrap_err();
        assert_eq!(err, PoolError::LeaseTimeout(50));
        assert!(start.elapsed() >= Duration::from_millis(50));
        // The failed wait must not have consumed the refunded permit.
        gate.release();
        assert_eq!(gate.available(), Some(1));
    }

    #[tokio::test]
    async fn pre_cancelled_token_wins_immediately() {
        let gate = CapacityGate::new(1);
        gate.acquire(Deadline::Immediate, None).await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let deadline = Deadline::from_timeout_ms(10_000).unwrap();
        let start = Instant::now();
        let err = gate.acquire(deadline, Some(&token)).await.unwrap_err();
        assert_eq!(err, PoolError::Cancelled);
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn cancellation_beats_pending_wait() {
        let gate = std::sync::Arc::new(CapacityGate::new(1));
        gate.acquire(Deadline::Immediate, None).await.unwrap();

        let token = CancellationToken::new();
        let waiter = {
            let gate = std::sync::Arc::clone(&gate);
            let token = token.clone();
            tokio::spawn(async move {
                let deadline = Deadline::from_timeout_ms(5_000).unwrap();
                gate.acquire(deadline, Some(&token)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        assert_eq!(waiter.await.unwrap().unwrap_err(), PoolError::Cancelled);
        // No permit was consumed by the cancelled waiter.
        gate.release();
        assert_eq!(gate.available(), Some(1));
    }

    #[tokio::test]
    async fn closed_gate_rejects_waiters() {
        let gate = CapacityGate::new(1);
        gate.close();
        let err = gate.acquire(Deadline::Forever, None).await.unwrap_err();
        assert_eq!(err, PoolError::Disposed);
    }

    #[test]
    fn deadline_rejects_bad_timeouts() {
        assert_eq!(
            Deadline::from_timeout_ms(-2).unwrap_err(),
            PoolError::InvalidArgument(-2)
        );
        assert!(matches!(
            Deadline::from_timeout_ms(UNBOUNDED).unwrap(),
            Deadline::Forever
        ));
        assert!(matches!(Deadline::from_timeout_ms(0).unwrap(), Deadline::Immediate));
    }
}
