//! Core lease pool implementation

use crate::config::{PoolConfig, UNBOUNDED};
use crate::errors::{PoolError, PoolResult};
use crate::gate::{CapacityGate, Deadline};
use crate::idle::IdleQueue;
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A leased instance that automatically returns to its pool when dropped
///
/// The handle is move-only and its instance slot is taken exactly once, so
/// an instance can never travel back to the pool twice.
#[must_use]
pub struct Lease<T: Send + 'static> {
    instance: Option<T>,
    shared: Arc<PoolShared<T>>,
}

impl<T: Send + 'static> Lease<T> {
    /// Return the instance to the pool now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: Send + 'static> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.instance.as_ref().expect("instance already returned")
    }
}

impl<T: Send + 'static> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.instance.as_mut().expect("instance already returned")
    }
}

impl<T: Send + 'static> Drop for Lease<T> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.shared.give_back(instance);
        }
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("instance", &self.instance).finish()
    }
}

struct PoolState<T> {
    idle: IdleQueue<T>,
    disposed: bool,
    sweeper: Option<JoinHandle<()>>,
}

struct PoolShared<T: Send + 'static> {
    config: PoolConfig<T>,
    gate: CapacityGate,
    state: Mutex<PoolState<T>>,
    metrics: MetricsTracker,
    // Runtime the pool was built on, if any. Lets a handle dropped on a
    // plain thread still arm the sweeper.
    runtime: Option<Handle>,
}

/// Bounded, thread-safe pool of reusable instances
///
/// Callers lease an instance, use it through the [`Lease`] handle, and give
/// it back by dropping the handle. The pool enforces the `max_leases`
/// ceiling over everything simultaneously leased-out-or-idle, revalidates
/// idle instances before reuse, and finalizes instances that fail
/// validation, idle past their timeout, or are still queued at disposal.
///
/// Cloning the pool is cheap and yields another handle to the same pool.
///
/// # Examples
///
/// ```
/// use leasepool::{Pool, PoolConfig};
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let pool = Pool::new(PoolConfig::new(|| vec![0u8; 4096]).with_max_leases(4)).unwrap();
///
/// let buffer = pool.lease().await.unwrap();
/// assert_eq!(buffer.len(), 4096);
/// drop(buffer); // back in the pool, ready for reuse
/// # });
/// ```
pub struct Pool<T: Send + 'static> {
    shared: Arc<PoolShared<T>>,
}

impl<T: Send + 'static> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Build a pool, validating the configuration.
    pub fn new(config: PoolConfig<T>) -> PoolResult<Self> {
        config.validate_fields()?;
        let gate = CapacityGate::new(config.max_leases);
        Ok(Self {
            shared: Arc::new(PoolShared {
                gate,
                state: Mutex::new(PoolState {
                    idle: IdleQueue::new(),
                    disposed: false,
                    sweeper: None,
                }),
                metrics: MetricsTracker::new(),
                runtime: Handle::try_current().ok(),
                config,
            }),
        })
    }

    /// Lease an instance, waiting indefinitely for a free slot.
    pub async fn lease(&self) -> PoolResult<Lease<T>> {
        self.lease_inner(UNBOUNDED, None).await
    }

    /// Lease an instance, waiting at most `timeout_ms` milliseconds.
    /// `-1` waits forever, `0` attempts without waiting.
    pub async fn lease_for(&self, timeout_ms: i64) -> PoolResult<Lease<T>> {
        self.lease_inner(timeout_ms, None).await
    }

    /// Lease an instance with both a timeout and a cancellation signal.
    /// Cancellation racing the deadline wins when both are observable.
    pub async fn lease_with(
        &self,
        timeout_ms: i64,
        cancel: &CancellationToken,
    ) -> PoolResult<Lease<T>> {
        self.lease_inner(timeout_ms, Some(cancel)).await
    }

    /// Synchronous immediate attempt, for callers on dedicated threads:
    /// succeeds only if a slot is free right now.
    pub fn try_lease(&self) -> PoolResult<Lease<T>> {
        if self.shared.state.lock().disposed {
            return Err(PoolError::Disposed);
        }
        self.shared
            .gate
            .try_acquire_now()
            .inspect_err(|err| self.shared.record_gate_error(err))?;
        self.shared.checkout()
    }

    async fn lease_inner(
        &self,
        timeout_ms: i64,
        cancel: Option<&CancellationToken>,
    ) -> PoolResult<Lease<T>> {
        if self.shared.state.lock().disposed {
            return Err(PoolError::Disposed);
        }
        let deadline = Deadline::from_timeout_ms(timeout_ms)?;
        self.shared
            .gate
            .acquire(deadline, cancel)
            .await
            .inspect_err(|err| self.shared.record_gate_error(err))?;
        self.shared.checkout()
    }

    /// Free lease slots, or `None` when the pool is unbounded.
    pub fn available_leases(&self) -> Option<usize> {
        self.shared.gate.available()
    }

    /// Instances currently idle in the pool.
    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Shut the pool down: fail waiters, stop the sweeper, and finalize
    /// every idle instance exactly once.
    ///
    /// Instances on lease at this moment are not tracked here; each one is
    /// finalized when its handle is eventually released.
    ///
    /// # Panics
    ///
    /// Panics if the pool was already disposed; disposing twice is a
    /// programmer error.
    pub fn dispose(&self) {
        let (entries, sweeper) = {
            let mut state = self.shared.state.lock();
            assert!(!state.disposed, "pool disposed twice");
            state.disposed = true;
            (state.idle.drain_all(), state.sweeper.take())
        };
        if let Some(handle) = sweeper {
            handle.abort();
        }
        self.shared.gate.close();
        for entry in entries {
            self.shared.finalize(entry.instance);
        }
    }

    /// Point-in-time metrics snapshot.
    pub fn metrics(&self) -> PoolMetrics {
        let idle = self.shared.state.lock().idle.len();
        self.shared.metrics.snapshot(idle, self.shared.gate.available())
    }

    /// Export metrics as a HashMap
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.metrics(), pool_name, tags)
    }
}

impl<T: Send + 'static> PoolShared<T> {
    /// Select an idle instance or construct a fresh one. Runs with a gate
    /// permit already held; on failure the permit is refunded.
    fn checkout(self: &Arc<Self>) -> PoolResult<Lease<T>> {
        let mut instance = loop {
            let entry = {
                let mut state = self.state.lock();
                if state.disposed {
                    // Disposal raced the gate wait.
                    drop(state);
                    self.gate.release();
                    return Err(PoolError::Disposed);
                }
                state.idle.dequeue()
            };
            // Hooks run outside the state lock.
            match entry {
                Some(entry) => {
                    if (self.config.validate)(&entry.instance) {
                        MetricsTracker::bump(&self.metrics.total_reused);
                        break entry.instance;
                    }
                    MetricsTracker::bump(&self.metrics.validation_failures);
                    self.finalize(entry.instance);
                }
                None => {
                    MetricsTracker::bump(&self.metrics.total_constructed);
                    break (self.config.construct)();
                }
            }
        };
        (self.config.on_lease)(&mut instance);
        MetricsTracker::bump(&self.metrics.total_leased);
        Ok(Lease {
            instance: Some(instance),
            shared: Arc::clone(self),
        })
    }

    /// Accept an instance back from a released handle.
    fn give_back(self: &Arc<Self>, mut instance: T) {
        // A post-disposal return still finalizes the instance; the pool no
        // longer manages it beyond that, and on_return is skipped.
        if self.state.lock().disposed {
            self.finalize(instance);
            return;
        }
        (self.config.on_return)(&mut instance);
        MetricsTracker::bump(&self.metrics.total_returned);
        if self.config.idle_timeout_ms == 0 {
            // Never kept idle: the queue and sweeper are bypassed.
            self.finalize(instance);
            self.gate.release();
            return;
        }
        {
            let mut state = self.state.lock();
            if state.disposed {
                drop(state);
                self.finalize(instance);
                return;
            }
            if self.config.idle_timeout_ms > 0
                && state.sweeper.as_ref().is_none_or(JoinHandle::is_finished)
            {
                let Some(sweeper) = self.spawn_sweeper() else {
                    // No runtime reachable from here and none captured at
                    // construction: nothing could ever evict this entry,
                    // so it is finalized as if the idle timeout were zero.
                    drop(state);
                    self.finalize(instance);
                    self.gate.release();
                    return;
                };
                state.sweeper = Some(sweeper);
            }
            state.idle.enqueue(instance);
        }
        self.gate.release();
    }

    fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok().or_else(|| self.runtime.clone())?;
        let weak = Arc::downgrade(self);
        let interval = Duration::from_millis(self.config.idle_timeout_ms as u64);
        Some(runtime.spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(shared) = weak.upgrade() else { return };
                let rearm = shared.sweep(interval);
                drop(shared);
                if !rearm {
                    return;
                }
            }
        }))
    }

    /// One eviction pass. Returns whether the sweeper should stay armed
    /// for another full interval.
    ///
    /// Entries are dequeued and finalized one at a time so a finalize
    /// panic leaves later entries queued for the next pass.
    fn sweep(&self, idle_timeout: Duration) -> bool {
        loop {
            let entry = {
                let mut state = self.state.lock();
                if state.disposed {
                    return false;
                }
                state.idle.dequeue_expired(idle_timeout)
            };
            let Some(entry) = entry else { break };
            MetricsTracker::bump(&self.metrics.total_evicted);
            self.finalize(entry.instance);
        }
        // The exit decision and the sweeper slot are settled under one
        // lock, so a return racing the finalize calls above either sees a
        // cleared slot and arms a new sweeper, or is observed here.
        let mut state = self.state.lock();
        if state.disposed {
            return false;
        }
        if state.idle.is_empty() {
            state.sweeper = None;
            return false;
        }
        true
    }

    fn finalize(&self, instance: T) {
        MetricsTracker::bump(&self.metrics.total_finalized);
        (self.config.finalize)(instance);
    }

    fn record_gate_error(&self, err: &PoolError) {
        match err {
            PoolError::LeaseTimeout(_) => MetricsTracker::bump(&self.metrics.lease_timeouts),
            PoolError::Cancelled => MetricsTracker::bump(&self.metrics.cancellations),
            _ => {}
        }
    }
}
