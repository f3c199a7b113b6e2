/// 缓存数据模型
/// 定义缓存数据的结构体及其编解码

// 餐厅缓存模型
pub mod restaurant;

// GEO 成员编解码
pub mod codec;

// 重新导出常用类型
pub use codec::{ENTRY_DELIMITER, decode_entry, encode_entry};
pub use restaurant::{NearbyRestaurant, Restaurant, RestaurantCacheEntry};
