//! Advanced features: lifecycle hooks, idle eviction, disposal, metrics export

use leasepool::{Pool, PoolConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
struct Connection {
    id: usize,
    healthy: bool,
}

impl Connection {
    fn new(id: usize) -> Self {
        Self { id, healthy: true }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== leasepool - Advanced Features ===\n");

    // Example 1: Full lifecycle hooks
    lifecycle_hooks().await;

    // Example 2: Idle eviction
    idle_eviction().await;

    // Example 3: Disposal
    disposal().await;

    // Example 4: Prometheus metrics
    prometheus_export().await;
}

async fn lifecycle_hooks() {
    println!("1. Lifecycle Hooks:");

    let next_id = Arc::new(AtomicUsize::new(1));
    let config = PoolConfig::new(move || {
        let id = next_id.fetch_add(1, Ordering::SeqCst);
        println!("   construct: Connection-{}", id);
        Connection::new(id)
    })
    .with_validate(|conn: &Connection| conn.healthy)
    .with_finalize(|conn: Connection| println!("   finalize:  Connection-{}", conn.id))
    .with_on_lease(|conn: &mut Connection| println!("   on_lease:  Connection-{}", conn.id))
    .with_on_return(|conn: &mut Connection| println!("   on_return: Connection-{}", conn.id));

    let pool = Pool::new(config).unwrap();

    {
        let mut conn = pool.lease().await.unwrap();
        // Break the connection so validation discards it on the next lease
        conn.healthy = false;
    }
    {
        let _conn = pool.lease().await.unwrap();
    }

    println!();
}

async fn idle_eviction() {
    println!("2. Idle Eviction:");

    let pool = Pool::new(
        PoolConfig::new(|| String::from("session")).with_idle_timeout_ms(200),
    )
    .unwrap();

    {
        let _lease = pool.lease().await.unwrap();
    }
    println!("   Idle right after return: {}", pool.idle_count());

    println!("   Waiting past the idle timeout...");
    sleep(Duration::from_millis(500)).await;

    println!("   Idle after the sweep: {}", pool.idle_count());
    println!("   Evicted so far: {}\n", pool.metrics().total_evicted);
}

async fn disposal() {
    println!("3. Disposal:");

    let pool = Pool::new(
        PoolConfig::new(|| 1u8).with_finalize(|_| println!("   finalized an idle instance")),
    )
    .unwrap();

    {
        let _a = pool.lease().await.unwrap();
        let _b = pool.lease().await.unwrap();
    }
    println!("   Idle before dispose: {}", pool.idle_count());

    pool.dispose();
    println!("   Disposed: {}", pool.is_disposed());
    println!("   Lease after dispose: {:?}\n", pool.lease().await.err());
}

async fn prometheus_export() {
    println!("4. Prometheus Metrics Export:");

    let pool = Pool::new(PoolConfig::new(|| vec![0u8; 64]).with_max_leases(5)).unwrap();

    {
        let _a = pool.lease().await.unwrap();
        let _b = pool.lease().await.unwrap();
    }

    let mut tags = std::collections::HashMap::new();
    tags.insert("service".to_string(), "example".to_string());
    tags.insert("env".to_string(), "dev".to_string());

    let prometheus_text = pool.export_metrics_prometheus("example_pool", Some(&tags));
    println!("{}", prometheus_text);
}
