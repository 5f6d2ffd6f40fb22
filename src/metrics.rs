//! Metrics collection and export for lease pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time metrics snapshot for a pool
///
/// # Examples
///
/// ```
/// use leasepool::{Pool, PoolConfig};
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let pool = Pool::new(PoolConfig::new(|| 42u32)).unwrap();
///
/// let lease = pool.lease().await.unwrap();
/// let metrics = pool.metrics();
/// assert_eq!(metrics.total_leased, 1);
/// assert_eq!(metrics.total_constructed, 1);
/// drop(lease);
/// # });
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Leases served to callers
    pub total_leased: usize,

    /// Instances returned by callers
    pub total_returned: usize,

    /// Instances freshly constructed
    pub total_constructed: usize,

    /// Leases served from the idle queue
    pub total_reused: usize,

    /// Instances finalized, for any reason
    pub total_finalized: usize,

    /// Instances finalized by the idle-eviction sweep
    pub total_evicted: usize,

    /// Idle instances discarded after failing validation
    pub validation_failures: usize,

    /// Lease requests that ran out their deadline
    pub lease_timeouts: usize,

    /// Lease requests aborted by their cancellation signal
    pub cancellations: usize,

    /// Instances currently idle in the pool
    pub idle_instances: usize,

    /// Free lease slots, `None` when the pool is unbounded
    pub available_leases: Option<usize>,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_leased".to_string(), self.total_leased.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("total_constructed".to_string(), self.total_constructed.to_string());
        metrics.insert("total_reused".to_string(), self.total_reused.to_string());
        metrics.insert("total_finalized".to_string(), self.total_finalized.to_string());
        metrics.insert("total_evicted".to_string(), self.total_evicted.to_string());
        metrics.insert(
            "validation_failures".to_string(),
            self.validation_failures.to_string(),
        );
        metrics.insert("lease_timeouts".to_string(), self.lease_timeouts.to_string());
        metrics.insert("cancellations".to_string(), self.cancellations.to_string());
        metrics.insert("idle_instances".to_string(), self.idle_instances.to_string());
        metrics.insert(
            "available_leases".to_string(),
            match self.available_leases {
                Some(n) => n.to_string(),
                None => "unbounded".to_string(),
            },
        );
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use leasepool::{Pool, PoolConfig};
    /// use std::collections::HashMap;
    /// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
    /// let pool = Pool::new(PoolConfig::new(|| 42u32)).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags));
    /// assert!(output.contains("leasepool_leases_served_total"));
    /// assert!(output.contains("service=\"api\""));
    /// # });
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        output.push_str("# HELP leasepool_instances_idle Instances currently idle\n");
        output.push_str("# TYPE leasepool_instances_idle gauge\n");
        output.push_str(&format!(
            "leasepool_instances_idle{{{}}} {}\n",
            labels, metrics.idle_instances
        ));

        if let Some(available) = metrics.available_leases {
            output.push_str("# HELP leasepool_leases_available Free lease slots\n");
            output.push_str("# TYPE leasepool_leases_available gauge\n");
            output.push_str(&format!(
                "leasepool_leases_available{{{}}} {}\n",
                labels, available
            ));
        }

        // Counter metrics
        output.push_str("# HELP leasepool_leases_served_total Leases served to callers\n");
        output.push_str("# TYPE leasepool_leases_served_total counter\n");
        output.push_str(&format!(
            "leasepool_leases_served_total{{{}}} {}\n",
            labels, metrics.total_leased
        ));

        output.push_str("# HELP leasepool_instances_returned_total Instances returned by callers\n");
        output.push_str("# TYPE leasepool_instances_returned_total counter\n");
        output.push_str(&format!(
            "leasepool_instances_returned_total{{{}}} {}\n",
            labels, metrics.total_returned
        ));

        output.push_str("# HELP leasepool_instances_constructed_total Instances freshly constructed\n");
        output.push_str("# TYPE leasepool_instances_constructed_total counter\n");
        output.push_str(&format!(
            "leasepool_instances_constructed_total{{{}}} {}\n",
            labels, metrics.total_constructed
        ));

        output.push_str("# HELP leasepool_instances_reused_total Leases served from the idle queue\n");
        output.push_str("# TYPE leasepool_instances_reused_total counter\n");
        output.push_str(&format!(
            "leasepool_instances_reused_total{{{}}} {}\n",
            labels, metrics.total_reused
        ));

        output.push_str("# HELP leasepool_instances_finalized_total Instances finalized\n");
        output.push_str("# TYPE leasepool_instances_finalized_total counter\n");
        output.push_str(&format!(
            "leasepool_instances_finalized_total{{{}}} {}\n",
            labels, metrics.total_finalized
        ));

        output.push_str("# HELP leasepool_instances_evicted_total Instances evicted after idling\n");
        output.push_str("# TYPE leasepool_instances_evicted_total counter\n");
        output.push_str(&format!(
            "leasepool_instances_evicted_total{{{}}} {}\n",
            labels, metrics.total_evicted
        ));

        output.push_str("# HELP leasepool_validation_failures_total Idle instances failing validation\n");
        output.push_str("# TYPE leasepool_validation_failures_total counter\n");
        output.push_str(&format!(
            "leasepool_validation_failures_total{{{}}} {}\n",
            labels, metrics.validation_failures
        ));

        output.push_str("# HELP leasepool_lease_timeouts_total Lease requests that timed out\n");
        output.push_str("# TYPE leasepool_lease_timeouts_total counter\n");
        output.push_str(&format!(
            "leasepool_lease_timeouts_total{{{}}} {}\n",
            labels, metrics.lease_timeouts
        ));

        output.push_str("# HELP leasepool_cancellations_total Lease requests that were cancelled\n");
        output.push_str("# TYPE leasepool_cancellations_total counter\n");
        output.push_str(&format!(
            "leasepool_cancellations_total{{{}}} {}\n",
            labels, metrics.cancellations
        ));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub total_leased: AtomicUsize,
    pub total_returned: AtomicUsize,
    pub total_constructed: AtomicUsize,
    pub total_reused: AtomicUsize,
    pub total_finalized: AtomicUsize,
    pub total_evicted: AtomicUsize,
    pub validation_failures: AtomicUsize,
    pub lease_timeouts: AtomicUsize,
    pub cancellations: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            total_leased: AtomicUsize::new(0),
            total_returned: AtomicUsize::new(0),
            total_constructed: AtomicUsize::new(0),
            total_reused: AtomicUsize::new(0),
            total_finalized: AtomicUsize::new(0),
            total_evicted: AtomicUsize::new(0),
            validation_failures: AtomicUsize::new(0),
            lease_timeouts: AtomicUsize::new(0),
            cancellations: AtomicUsize::new(0),
        }
    }

    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, idle_instances: usize, available_leases: Option<usize>) -> PoolMetrics {
        PoolMetrics {
            total_leased: self.total_leased.load(Ordering::Relaxed),
            total_returned: self.total_returned.load(Ordering::Relaxed),
            total_constructed: self.total_constructed.load(Ordering::Relaxed),
            total_reused: self.total_reused.load(Ordering::Relaxed),
            total_finalized: self.total_finalized.load(Ordering::Relaxed),
            total_evicted: self.total_evicted.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            lease_timeouts: self.lease_timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            idle_instances,
            available_leases,
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_includes_every_counter() {
        let tracker = MetricsTracker::new();
        MetricsTracker::bump(&tracker.total_leased);
        MetricsTracker::bump(&tracker.total_constructed);
        let snapshot = tracker.snapshot(2, Some(3));
        let exported = snapshot.export();
        assert_eq!(exported["total_leased"], "1");
        assert_eq!(exported["idle_instances"], "2");
        assert_eq!(exported["available_leases"], "3");
    }

    #[test]
    fn unbounded_pools_export_a_sentinel() {
        let snapshot = MetricsTracker::new().snapshot(0, None);
        assert_eq!(snapshot.export()["available_leases"], "unbounded");
    }

    #[test]
    fn prometheus_format_carries_labels() {
        let snapshot = MetricsTracker::new().snapshot(1, Some(4));
        let output = MetricsExporter::export_prometheus(&snapshot, "db", None);
        assert!(output.contains("leasepool_instances_idle{pool=\"db\"} 1"));
        assert!(output.contains("leasepool_leases_available{pool=\"db\"} 4"));
    }
}
