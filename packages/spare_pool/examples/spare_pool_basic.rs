//! Basic usage example for `SparePool` and `PoolRegistry`.
//!
//! This example recycles scratch buffers through a pool, shows how a reclaimer takes spares
//! away under memory pressure, and returns values to a registered pool by key.

use spare_pool::{Keyed, PoolKey, PoolRegistry, SparePool};

const BUFFER_SIZE: usize = 16 * 1024;

fn main() {
    // Retain at most (approximately) 4 spare buffers.
    let pool = SparePool::with_spare_limit(|| Vec::<u8>::with_capacity(BUFFER_SIZE), 4);

    for request in 0..10 {
        let mut buffer = pool.acquire();
        buffer.extend_from_slice(format!("request {request}").as_bytes());

        println!("Handled {} bytes", buffer.len());

        buffer.clear();
        pool.release(buffer);
    }

    let stats = pool.stats();
    println!(
        "Recycled {} buffers, created {} buffers",
        stats.hits(),
        stats.misses()
    );

    // Something noticed that memory is tight. Drop whatever the pool holds.
    let reclaimed = pool.reclaimer().reclaim_all();
    println!("Reclaimed {reclaimed} spare buffers");

    // The next acquire notices the reclaimed spares and creates a fresh buffer.
    drop(pool.acquire());
    println!("Spares after reclaiming: {}", pool.spare_count());

    // A registry lets unrelated code share pools by key.
    let registry = PoolRegistry::new();
    let key = PoolKey::named::<String>("log lines");
    registry
        .reference_pool(key, || String::with_capacity(256))
        .expect("the key is declared for String");

    let mut line: Keyed<String> = registry
        .get_keyed(&key)
        .expect("a pool is registered for the key");
    line.push_str("all buffers returned");
    println!("{}", *line);
    line.clear();

    line.release(&registry)
        .expect("the pool is still registered");

    println!("Registered pools: {}", registry.len());
}
