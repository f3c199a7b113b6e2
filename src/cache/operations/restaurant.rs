use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::keys::RegionKeyScheme;
use crate::cache::lock::KeyedLock;
use crate::cache::models::{
    ENTRY_DELIMITER, NearbyRestaurant, Restaurant, RestaurantCacheEntry, decode_entry,
    encode_entry,
};
use crate::cache::store::{DistanceUnit, GeoIndexSession, GeoIndexStore, GeoMember};
use crate::config::SyncSettings;
use crate::error::{CacheUnavailable, MalformedEntry, SyncError};

/// 同步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 缓存中现在恰好有一条该餐厅的最新条目
    Synced,
    /// 没有任何评分，未访问存储
    ZeroRatingsNoOp,
}

/// 同步统计
#[derive(Default)]
struct SyncStats {
    synced: AtomicU64,
    zero_rating_noops: AtomicU64,
    removed_entries: AtomicU64,
    malformed_candidates: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatsSnapshot {
    pub synced: u64,
    pub zero_rating_noops: u64,
    pub removed_entries: u64,
    pub malformed_candidates: u64,
}

/// 餐厅 GEO 缓存操作
pub struct RestaurantCacheOperations<S> {
    store: S,
    keys: RegionKeyScheme,
    settings: SyncSettings,
    locks: KeyedLock,
    stats: SyncStats,
}

impl<S: GeoIndexStore> RestaurantCacheOperations<S> {
    /// 创建新的餐厅缓存操作实例
    pub fn new(store: S, keys: RegionKeyScheme, settings: SyncSettings) -> Self {
        Self {
            store,
            keys,
            settings,
            locks: KeyedLock::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn keys(&self) -> &RegionKeyScheme {
        &self.keys
    }

    pub fn stats(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            synced: self.stats.synced.load(Ordering::Relaxed),
            zero_rating_noops: self.stats.zero_rating_noops.load(Ordering::Relaxed),
            removed_entries: self.stats.removed_entries.load(Ordering::Relaxed),
            malformed_candidates: self.stats.malformed_candidates.load(Ordering::Relaxed),
        }
    }

    /// 评分变化后同步餐厅缓存
    ///
    /// GEO 索引不支持按键查找，所以先在餐厅坐标附近做半径查询，
    /// 按 ID 找出旧条目，删除后再写入新条目。同一餐厅的调用互斥执行。
    /// 删除总是先于写入，中途取消只会导致缓存暂时缺失，不会产生重复。
    pub async fn sync_rating_update(
        &self,
        restaurant: &Restaurant,
    ) -> Result<SyncOutcome, SyncError> {
        tracing::info!("Syncing rating cache for restaurant {}", restaurant.id);

        let Some((average_rating, rating_count)) = restaurant.rating_aggregate() else {
            self.stats.zero_rating_noops.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                "Restaurant {} has no ratings, skipping cache sync",
                restaurant.id
            );
            return Ok(SyncOutcome::ZeroRatingsNoOp);
        };

        check_delimiter("name", &restaurant.name)?;
        check_delimiter("region_name", &restaurant.region_name)?;

        let entry = RestaurantCacheEntry::from_restaurant(restaurant, average_rating, rating_count);
        let payload = encode_entry(&entry);
        let key = self.keys.partition_key(&restaurant.region_name);

        // 等锁不设超时，持锁方的每次存储调用都有超时
        let _guard = self.locks.lock(restaurant.id).await;
        let mut session = self.bounded("connect", self.store.session()).await?;

        let candidates = self
            .bounded(
                "GEORADIUS",
                session.radius_query(
                    &key,
                    restaurant.longitude,
                    restaurant.latitude,
                    self.settings.search_radius,
                    self.settings.search_unit,
                ),
            )
            .await?;

        let mut removed = 0u64;
        if !candidates.is_empty() {
            for stale in self.entries_for(restaurant.id, candidates) {
                // 内容完全相同的成员由 GEOADD 直接覆盖
                if stale == payload {
                    continue;
                }
                self.bounded("ZREM", session.remove_member(&key, &stale))
                    .await?;
                removed += 1;
            }
        }

        self.bounded(
            "GEOADD",
            session.add_member(&key, restaurant.longitude, restaurant.latitude, &payload),
        )
        .await?;

        if removed > 1 {
            tracing::warn!(
                "Removed {} cache entries for restaurant {} in {}",
                removed,
                restaurant.id,
                key
            );
        }
        self.stats.removed_entries.fetch_add(removed, Ordering::Relaxed);
        self.stats.synced.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "Synced restaurant {} into {} (avg {:.2}, count {}, replaced {})",
            restaurant.id,
            key,
            average_rating,
            rating_count,
            removed
        );

        Ok(SyncOutcome::Synced)
    }

    /// 查找附近的餐厅
    pub async fn find_nearby(
        &self,
        region_name: &str,
        latitude: f64,
        longitude: f64,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<Vec<NearbyRestaurant>, CacheUnavailable> {
        let key = self.keys.partition_key(region_name);
        let mut session = self.bounded("connect", self.store.session()).await?;
        let members = self
            .bounded(
                "GEORADIUS",
                session.radius_query(&key, longitude, latitude, radius, unit),
            )
            .await?;

        let mut nearby = Vec::with_capacity(members.len());
        for member in members {
            match decode_entry(&member.payload) {
                Ok(entry) => nearby.push(NearbyRestaurant {
                    entry,
                    distance: member.distance,
                }),
                Err(e) => self.record_malformed(&key, &member.payload, &e),
            }
        }
        Ok(nearby)
    }

    /// 过滤出属于指定餐厅的成员，无法解码的成员跳过并计数
    fn entries_for(&self, restaurant_id: i64, candidates: Vec<GeoMember>) -> Vec<Vec<u8>> {
        candidates
            .into_iter()
            .filter_map(|member| match decode_entry(&member.payload) {
                Ok(entry) if entry.restaurant_id == restaurant_id => Some(member.payload),
                Ok(entry) => {
                    tracing::debug!(
                        "Skipping neighbour {} while syncing {}",
                        entry.restaurant_id,
                        restaurant_id
                    );
                    None
                }
                Err(e) => {
                    self.record_malformed("sync candidates", &member.payload, &e);
                    None
                }
            })
            .collect()
    }

    fn record_malformed(&self, context: &str, payload: &[u8], error: &MalformedEntry) {
        self.stats
            .malformed_candidates
            .fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Skipping malformed cache member in {}: {} ({:?})",
            context,
            error,
            String::from_utf8_lossy(payload)
        );
    }

    /// 给存储调用加上超时
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, CacheUnavailable>>,
    ) -> Result<T, CacheUnavailable> {
        let timeout = self.settings.store_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| CacheUnavailable::Timeout { operation, timeout })?
    }
}

fn check_delimiter(field: &'static str, value: &str) -> Result<(), SyncError> {
    if value.contains(ENTRY_DELIMITER) {
        return Err(SyncError::ReservedDelimiter {
            field,
            delimiter: ENTRY_DELIMITER,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryGeoStore;
    use std::time::Duration;

    fn operations(store: MemoryGeoStore) -> RestaurantCacheOperations<MemoryGeoStore> {
        RestaurantCacheOperations::new(store, RegionKeyScheme::default(), SyncSettings::default())
    }

    fn restaurant(id: i64, ratings: Vec<i32>) -> Restaurant {
        Restaurant {
            id,
            name: "Mapo Galbi".to_string(),
            region_name: "Gangnam".to_string(),
            latitude: 37.50,
            longitude: 127.03,
            ratings,
        }
    }

    #[tokio::test]
    async fn zero_ratings_never_touch_the_store() {
        let store = MemoryGeoStore::new();
        store.set_available(false);
        let ops = operations(store.clone());

        let outcome = ops.sync_rating_update(&restaurant(1, vec![])).await.unwrap();

        assert_eq!(outcome, SyncOutcome::ZeroRatingsNoOp);
        assert_eq!(store.sessions_opened(), 0);
        assert_eq!(ops.stats().zero_rating_noops, 1);
    }

    #[tokio::test]
    async fn delimiter_in_name_is_rejected_before_store_access() {
        let store = MemoryGeoStore::new();
        let ops = operations(store.clone());
        let mut r = restaurant(1, vec![5]);
        r.name = "Bar: Seoul".to_string();

        let err = ops.sync_rating_update(&r).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::ReservedDelimiter { field: "name", .. }
        ));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn unavailable_store_is_surfaced() {
        let store = MemoryGeoStore::new();
        store.set_available(false);
        let ops = operations(store);

        let err = ops.sync_rating_update(&restaurant(1, vec![3])).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Unavailable(CacheUnavailable::Backend(_))
        ));
    }

    #[tokio::test]
    async fn slow_store_call_times_out() {
        let settings = SyncSettings {
            store_timeout: Duration::from_millis(10),
            ..SyncSettings::default()
        };
        let ops = RestaurantCacheOperations::new(
            MemoryGeoStore::new(),
            RegionKeyScheme::default(),
            settings,
        );

        let err = ops
            .bounded("GEORADIUS", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, CacheUnavailable>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CacheUnavailable::Timeout {
                operation: "GEORADIUS",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn identical_resync_does_not_remove() {
        let store = MemoryGeoStore::new();
        let ops = operations(store.clone());
        let r = restaurant(9, vec![4, 4]);

        ops.sync_rating_update(&r).await.unwrap();
        let after_first = store.mutations();
        ops.sync_rating_update(&r).await.unwrap();

        // 第二次只有一次 GEOADD
        assert_eq!(store.mutations(), after_first + 1);
        assert_eq!(ops.stats().removed_entries, 0);
        assert_eq!(ops.stats().synced, 2);
    }

    #[tokio::test]
    async fn find_nearby_skips_malformed_members() {
        let store = MemoryGeoStore::new();
        let ops = operations(store.clone());
        ops.sync_rating_update(&restaurant(1, vec![5])).await.unwrap();
        store
            .insert_raw("map:sgg:Gangnam", 127.03, 37.50, b"garbage")
            .await;

        let nearby = ops
            .find_nearby("Gangnam", 37.50, 127.03, 1.0, DistanceUnit::Kilometers)
            .await
            .unwrap();

        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].entry.restaurant_id, 1);
        assert_eq!(ops.stats().malformed_candidates, 1);
    }
}
