/// 缓存键模块
/// 提供区域 GEO 分区键的生成规则

// 区域分区键
pub mod region_keys;

pub use region_keys::{DEFAULT_REGION_KEY_PREFIX, RegionKeyScheme};
