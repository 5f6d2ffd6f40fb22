//! Pool configuration and lifecycle hooks

use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::errors::{PoolError, PoolResult};

/// Sentinel meaning "no limit": an unbounded pool, an idle timeout that
/// never expires, or an infinite lease wait.
pub const UNBOUNDED: i64 = -1;

pub(crate) type ConstructFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
pub(crate) type ValidateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub(crate) type FinalizeFn<T> = Arc<dyn Fn(T) + Send + Sync>;
pub(crate) type HookFn<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// Configuration for a [`Pool`](crate::Pool), immutable once the pool is built.
///
/// Only the `construct` hook is mandatory; every other field has a default.
/// The default `finalize` simply drops the instance, so a resource type with
/// teardown logic gets it for free through its own `Drop` implementation.
///
/// # Examples
///
/// ```
/// use leasepool::PoolConfig;
///
/// let config = PoolConfig::new(|| String::with_capacity(4096))
///     .with_max_leases(8)
///     .with_idle_timeout_ms(30_000)
///     .with_validate(|s: &String| s.capacity() >= 4096);
///
/// assert_eq!(config.max_leases, 8);
/// assert_eq!(config.idle_timeout_ms, 30_000);
/// ```
pub struct PoolConfig<T> {
    /// Ceiling on instances simultaneously leased-out-or-idle.
    /// [`UNBOUNDED`] disables the ceiling.
    pub max_leases: i64,

    /// How long an instance may sit idle before it is finalized.
    /// [`UNBOUNDED`] keeps idle instances forever; `0` finalizes every
    /// instance synchronously on return instead of keeping it idle.
    pub idle_timeout_ms: i64,

    pub(crate) construct: ConstructFn<T>,
    pub(crate) validate: ValidateFn<T>,
    pub(crate) finalize: FinalizeFn<T>,
    pub(crate) on_lease: HookFn<T>,
    pub(crate) on_return: HookFn<T>,
}

impl<T> Clone for PoolConfig<T> {
    fn clone(&self) -> Self {
        Self {
            max_leases: self.max_leases,
            idle_timeout_ms: self.idle_timeout_ms,
            construct: Arc::clone(&self.construct),
            validate: Arc::clone(&self.validate),
            finalize: Arc::clone(&self.finalize),
            on_lease: Arc::clone(&self.on_lease),
            on_return: Arc::clone(&self.on_return),
        }
    }
}

impl<T> fmt::Debug for PoolConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("max_leases", &self.max_leases)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> PoolConfig<T> {
    /// Create a configuration around the mandatory `construct` hook.
    pub fn new<F>(construct: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            max_leases: UNBOUNDED,
            idle_timeout_ms: UNBOUNDED,
            construct: Arc::new(construct),
            validate: Arc::new(|_: &T| true),
            finalize: Arc::new(drop),
            on_lease: Arc::new(|_: &mut T| {}),
            on_return: Arc::new(|_: &mut T| {}),
        }
    }

    /// Bound the number of instances simultaneously leased-out-or-idle.
    pub fn with_max_leases(mut self, max_leases: i64) -> Self {
        self.max_leases = max_leases;
        self
    }

    /// Set the idle timeout in milliseconds.
    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: i64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    /// Check run against an idle instance before it is reused; returning
    /// `false` finalizes the instance and moves on to the next one.
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validate = Arc::new(validate);
        self
    }

    /// Teardown for an instance the pool will never hand out again.
    pub fn with_finalize<F>(mut self, finalize: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.finalize = Arc::new(finalize);
        self
    }

    /// Run on an instance just before it is handed to a caller.
    pub fn with_on_lease<F>(mut self, on_lease: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.on_lease = Arc::new(on_lease);
        self
    }

    /// Run on an instance just after a caller returns it.
    pub fn with_on_return<F>(mut self, on_return: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.on_return = Arc::new(on_return);
        self
    }

    pub(crate) fn validate_fields(&self) -> PoolResult<()> {
        if self.max_leases == 0 || self.max_leases < UNBOUNDED {
            return Err(PoolError::InvalidConfiguration(format!(
                "max_leases must be -1 or positive, got {}",
                self.max_leases
            )));
        }
        if self.max_leases > Semaphore::MAX_PERMITS as i64 {
            return Err(PoolError::InvalidConfiguration(format!(
                "max_leases {} exceeds the supported maximum of {}",
                self.max_leases,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.idle_timeout_ms < UNBOUNDED {
            return Err(PoolError::InvalidConfiguration(format!(
                "idle_timeout_ms must be -1, 0 or positive, got {}",
                self.idle_timeout_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded() {
        let config = PoolConfig::new(|| 1u8);
        assert_eq!(config.max_leases, UNBOUNDED);
        assert_eq!(config.idle_timeout_ms, UNBOUNDED);
        assert!(config.validate_fields().is_ok());
        assert!((config.validate)(&0));
    }

    #[test]
    fn rejects_zero_max_leases() {
        let config = PoolConfig::new(|| 1u8).with_max_leases(0);
        assert!(matches!(
            config.validate_fields(),
            Err(PoolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_max_leases_beyond_semaphore_range() {
        let config = PoolConfig::new(|| 1u8).with_max_leases(i64::MAX);
        assert!(matches!(
            config.validate_fields(),
            Err(PoolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_negative_idle_timeout_below_sentinel() {
        let config = PoolConfig::new(|| 1u8).with_idle_timeout_ms(-2);
        assert!(matches!(
            config.validate_fields(),
            Err(PoolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn builder_wires_hooks() {
        let config = PoolConfig::new(|| 5u32)
            .with_validate(|v| *v > 1)
            .with_on_lease(|v| *v += 1);
        assert!((config.validate)(&2));
        assert!(!(config.validate)(&0));
        let mut v = (config.construct)();
        (config.on_lease)(&mut v);
        assert_eq!(v, 6);
    }
}
