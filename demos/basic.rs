//! Basic usage examples for leasepool

use leasepool::{Pool, PoolConfig, UNBOUNDED};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== leasepool - Basic Examples ===\n");

    // Example 1: Simple pool
    simple_pool().await;

    // Example 2: Bounded pool with validation
    configured_pool().await;

    // Example 3: Immediate attempts
    try_lease().await;

    // Example 4: Metrics
    metrics().await;
}

async fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = Pool::new(PoolConfig::new(|| String::from("resource"))).unwrap();

    {
        let lease = pool.lease().await.unwrap();
        println!("   Leased: {}", *lease);
        // Instance automatically returned when dropped
    }

    println!("   Idle after return: {}\n", pool.idle_count());
}

async fn configured_pool() {
    println!("2. Bounded Pool with Validation:");

    let config = PoolConfig::new(|| 7i32)
        .with_max_leases(5)
        .with_idle_timeout_ms(UNBOUNDED)
        .with_validate(|x: &i32| *x > 0);

    let pool = Pool::new(config).unwrap();

    {
        let _a = pool.lease().await.unwrap();
        let _b = pool.lease().await.unwrap();
        println!("   Available leases: {:?}", pool.available_leases());
        println!("   Idle instances: {}", pool.idle_count());
    }

    println!("   After return - Available: {:?}\n", pool.available_leases());
}

async fn try_lease() {
    println!("3. Immediate Attempts:");
    let pool = Pool::new(PoolConfig::new(|| 42u32).with_max_leases(1)).unwrap();

    // Take the only slot
    let held = pool.try_lease();
    assert!(held.is_ok());

    // Next immediate attempt fails without waiting
    match pool.try_lease() {
        Ok(_) => println!("   Unexpected second lease"),
        Err(err) => println!("   Second attempt failed as expected: {}", err),
    }

    drop(held);
    println!("   After return: try_lease ok = {}\n", pool.try_lease().is_ok());
}

async fn metrics() {
    println!("4. Metrics:");
    let pool = Pool::new(PoolConfig::new(|| vec![0u8; 256])).unwrap();

    {
        let _a = pool.lease().await.unwrap();
    }
    {
        let _b = pool.lease().await.unwrap();
    }

    let metrics = pool.metrics();
    println!("   Leased: {}", metrics.total_leased);
    println!("   Constructed: {}", metrics.total_constructed);
    println!("   Reused: {}", metrics.total_reused);
}
