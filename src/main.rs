// leasepool - bounded, thread-safe lease pool
//
// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use leasepool::{Pool, PoolConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== leasepool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    // Quick demo
    println!("Quick Demo:");
    let pool = Pool::new(PoolConfig::new(|| vec![0u8; 1024]).with_max_leases(4)).unwrap();

    {
        let buffer = pool.lease().await.unwrap();
        println!("  Leased a {}-byte buffer", buffer.len());
    }

    println!("  Idle after return: {}", pool.idle_count());
    println!("  Available leases: {:?}", pool.available_leases());
}
