//! # leasepool
//!
//! Bounded, thread-safe lease pool for reusable, expensive-to-construct
//! resources (connections, buffers, handles).
//!
//! Callers borrow an instance through an async `lease` call, use it via the
//! RAII [`Lease`] handle, and give it back by dropping the handle. The pool
//! decides whether to reuse, validate, evict, or freshly construct
//! instances, never exceeds the configured `max_leases` ceiling, and
//! reclaims instances that sit idle past the configured timeout.
//!
//! ## Features
//!
//! - Counting capacity gate over everything leased-out-or-idle
//! - Strict-FIFO idle queue with revalidation before reuse
//! - Background eviction sweep for instances idling past their timeout
//! - Automatic return of instances via RAII (Drop trait)
//! - Async waits with per-call timeouts and cancellation tokens
//! - Five caller-supplied lifecycle hooks: construct, validate, finalize,
//!   on_lease, on_return
//! - Metrics snapshot with Prometheus export
//!
//! ## Quick Start
//!
//! ```
//! use leasepool::{Pool, PoolConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let pool = Pool::new(
//!     PoolConfig::new(|| String::with_capacity(1024)).with_max_leases(8),
//! )
//! .unwrap();
//!
//! {
//!     let mut buf = pool.lease().await.unwrap();
//!     buf.push_str("hello");
//!     // Instance automatically returned when `buf` goes out of scope
//! }
//! assert_eq!(pool.idle_count(), 1);
//! # });
//! ```

mod config;
mod errors;
mod gate;
mod idle;
mod metrics;
mod pool;

pub use config::{PoolConfig, UNBOUNDED};
pub use errors::{PoolError, PoolResult};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{Lease, Pool};
