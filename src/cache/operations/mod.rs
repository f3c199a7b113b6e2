/// 缓存操作
/// 提供餐厅 GEO 缓存的同步与查询

// 餐厅缓存操作
pub mod restaurant;

// 重新导出常用操作
pub use restaurant::{RestaurantCacheOperations, SyncOutcome, SyncStatsSnapshot};
