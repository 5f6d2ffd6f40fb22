//! Async usage examples: timeouts, cancellation, concurrent callers

use leasepool::{Pool, PoolConfig, PoolError};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    println!("=== leasepool - Async Examples ===\n");

    // Example 1: Lease with timeout
    lease_with_timeout().await;

    // Example 2: Cancellation
    lease_with_cancellation().await;

    // Example 3: Concurrent callers against a small ceiling
    concurrent_access().await;
}

async fn lease_with_timeout() {
    println!("1. Lease with Timeout:");

    let pool = Pool::new(PoolConfig::new(|| 42u32).with_max_leases(1)).unwrap();

    // Hold the only slot
    let _held = pool.lease().await.unwrap();

    // A bounded wait on the second caller runs out
    match pool.lease_for(100).await {
        Ok(_) => println!("   Unexpectedly got a lease"),
        Err(PoolError::LeaseTimeout(ms)) => println!("   Timed out after {} ms", ms),
        Err(err) => println!("   Failed: {}", err),
    }

    println!();
}

async fn lease_with_cancellation() {
    println!("2. Cancellation:");

    let pool = Pool::new(PoolConfig::new(|| 42u32).with_max_leases(1)).unwrap();
    let _held = pool.lease().await.unwrap();

    let token = CancellationToken::new();
    let waiter = {
        let pool = pool.clone();
        let token = token.clone();
        tokio::spawn(async move { pool.lease_with(10_000, &token).await.map(|l| l.release()) })
    };

    sleep(Duration::from_millis(50)).await;
    token.cancel();

    match waiter.await.unwrap() {
        Err(PoolError::Cancelled) => println!("   Wait cancelled before the timeout"),
        other => println!("   Unexpected outcome: {:?}", other.is_ok()),
    }

    println!();
}

async fn concurrent_access() {
    println!("3. Concurrent Access:");

    let pool = Pool::new(
        PoolConfig::new(|| vec![0u8; 1024])
            .with_max_leases(3)
            .with_idle_timeout_ms(5_000),
    )
    .unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let _buffer = pool.lease().await.unwrap();
            sleep(Duration::from_millis(10)).await;
            println!("   Task {} finished", i);
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    println!("   Available at the end: {:?}", pool.available_leases());
}
