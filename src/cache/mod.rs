// 缓存模块
// 包含缓存数据结构、GEO 存储和评分同步逻辑

pub mod keys;
pub mod lock;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型和函数，方便其他模块使用
pub use keys::RegionKeyScheme;
pub use models::{NearbyRestaurant, Restaurant, RestaurantCacheEntry};
pub use operations::{RestaurantCacheOperations, SyncOutcome, SyncStatsSnapshot};
pub use store::{DistanceUnit, GeoIndexStore, MemoryGeoStore, RedisGeoStore};
