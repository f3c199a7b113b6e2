use std::sync::Arc;

use futures_util::{StreamExt, stream};
use restaurant_geo_cache::{
    Restaurant, RestaurantCacheOperations, SyncOutcome,
    cache::{RedisGeoStore, RegionKeyScheme},
    config::Config,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let store = RedisGeoStore::new(Arc::new(redis_client));

    let operations = RestaurantCacheOperations::new(
        store,
        RegionKeyScheme::new(config.region_key_prefix.clone()),
        config.sync_settings(),
    );

    // 从标准输入读取餐厅，每行一个 JSON 对象
    let mut restaurants = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.expect("Failed to read stdin") {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Restaurant>(&line) {
            Ok(restaurant) => restaurants.push(restaurant),
            Err(e) => tracing::warn!("Skipping invalid restaurant line: {}", e),
        }
    }
    tracing::info!(
        "Syncing {} restaurants with concurrency {}",
        restaurants.len(),
        config.sync_concurrency
    );

    let results: Vec<_> = stream::iter(restaurants.iter())
        .map(|restaurant| {
            let operations = &operations;
            async move { (restaurant.id, operations.sync_rating_update(restaurant).await) }
        })
        .buffer_unordered(config.sync_concurrency)
        .collect()
        .await;

    let mut failed = 0usize;
    let mut skipped = 0usize;
    for (id, result) in results {
        match result {
            Ok(SyncOutcome::Synced) => {}
            Ok(SyncOutcome::ZeroRatingsNoOp) => skipped += 1,
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to sync restaurant {}: {}", id, e);
            }
        }
    }

    let stats = operations.stats();
    tracing::info!(
        "Done: synced {}, no ratings {}, failed {}, removed {}, malformed {}",
        stats.synced,
        skipped,
        failed,
        stats.removed_entries,
        stats.malformed_candidates
    );

    if failed > 0 {
        std::process::exit(1);
    }
}
