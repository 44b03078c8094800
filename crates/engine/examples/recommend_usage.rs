//! Recommendation Engine Usage Example
//!
//! Feeds a small interaction log through the full pipeline and prints
//! personalized recommendations, popular items, and build metrics.
//!
//! Run with: cargo run --example recommend_usage

use std::sync::Arc;

use chrono::Utc;
use cinematch_engine::{
    EngineConfig, Interaction, InteractionStore, MemoryInteractionStore, Recommender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for observability
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== CineMatch Engine Usage ===\n");

    // 1. Seed an interaction log
    println!("1. Seeding the interaction log...");
    let store = Arc::new(MemoryInteractionStore::new());
    let ratings = [
        ("alice", "inception", 5.0),
        ("alice", "solaris", 3.0),
        ("bob", "inception", 4.0),
        ("bob", "stalker", 5.0),
        ("carol", "solaris", 5.0),
        ("carol", "stalker", 4.0),
        ("carol", "inception", 2.0),
    ];
    for (user, item, weight) in ratings {
        store
            .append(Interaction::new(user, item, weight, Utc::now()))
            .await?;
    }
    println!("✓ {} interactions appended\n", ratings.len());

    // 2. Build the model
    println!("2. Building the model...");
    let config = EngineConfig {
        min_co_rated: 1,
        ..EngineConfig::default()
    };
    let engine = Arc::new(Recommender::new(store, config)?);
    engine.rebuild().await?;
    println!("✓ Snapshot published\n");

    // 3. Personalized recommendations
    println!("3. Recommendations for alice:");
    for rec in engine.get_recommendations("alice", 3)? {
        println!("   #{} {} (score {:.3})", rec.rank, rec.item_id, rec.score);
    }

    // 4. Popularity fallback for a cold-start user
    println!("\n4. Cold start for a newcomer, falling back to popular items:");
    if engine.get_recommendations("dave", 3)?.is_empty() {
        for rec in engine.popular_items(3)? {
            println!("   #{} {} (total weight {:.1})", rec.rank, rec.item_id, rec.score);
        }
    }

    // 5. Build metrics
    let metrics = engine.metrics();
    println!(
        "\n5. Builds: {} ok, {} failed, last took {:?}",
        metrics.builds_succeeded, metrics.builds_failed, metrics.last_build_duration
    );

    // 6. Keep the model fresh in the background
    let scheduler = Arc::clone(&engine).spawn_scheduler();
    println!("\n6. Recompute scheduler running; shutting it down again...");
    scheduler.shutdown().await;
    println!("✓ Done");

    Ok(())
}
