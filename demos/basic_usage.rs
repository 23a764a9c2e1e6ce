//! Basic usage example of the cache store.

use cache_store::{
    config::{CacheConfig, Driver},
    error::Result,
    factory, Fallback,
};
use serde::{Deserialize, Serialize};

/// Example value: Employment
#[derive(Clone, Serialize, Deserialize, Debug)]
struct Employment {
    id: String,
    employer_name: String,
    salary: f64,
}

/// Simulates a slow database lookup.
async fn fetch_employment(id: &str) -> Result<Employment> {
    println!("  [DB] Fetching employment: {}", id);
    Ok(Employment {
        id: id.to_string(),
        employer_name: "Acme Corp".to_string(),
        salary: 75000.0,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Cache Store - Basic Example ===\n");

    // 1. Build a file-backed store from configuration
    println!("1. Building file cache store...");
    let config = CacheConfig {
        driver: Driver::File,
        path: std::env::temp_dir().join("cache-store-demo"),
        default_minutes: 30,
        ..Default::default()
    };
    let mut store = factory::build(&config).await?;
    println!("   ✓ Store ready at {}\n", config.path.display());

    // 2. Remember - miss, load from database
    println!("2. First request for employment (emp_001):");
    let employment: Employment = store
        .remember_async("emp_001", 10, || fetch_employment("emp_001"))
        .await?;
    println!(
        "   ✓ Employment loaded: {} (${:.2})\n",
        employment.employer_name, employment.salary
    );

    // 3. Remember again - served from memory, no database call
    println!("3. Second request for same employment (emp_001):");
    let employment: Employment = store
        .remember_async("emp_001", 10, || fetch_employment("emp_001"))
        .await?;
    println!("   ✓ Employment loaded from cache: {}\n", employment.id);

    // 4. Defaults on miss
    println!("4. Lookup with a lazy default:");
    let visits: u64 = store.get_or("visits", Fallback::lazy(|| 0)).await?;
    println!("   ✓ Visits (default): {}\n", visits);

    // 5. Forget and flush
    println!("5. Forget and flush:");
    store.forget("emp_001").await?;
    println!("   ✓ emp_001 forgotten (in memory: {})", store.exists_in_memory("emp_001"));
    store.flush().await?;
    println!("   ✓ Cache flushed\n");

    println!("=== Example Complete ===\n");

    Ok(())
}
