//! GEO 索引存储抽象
//!
//! 每个区域一个 GEO 有序集合。会话在一次同步开始时获取，
//! 结束(包括出错)时释放，不跨调用持有连接。

use async_trait::async_trait;

use crate::error::CacheUnavailable;

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryGeoStore;
pub use redis_store::RedisGeoStore;

/// 距离单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl DistanceUnit {
    /// Redis GEO 命令的单位参数
    pub fn as_redis_arg(self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::Feet => "ft",
        }
    }

    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Miles => 1609.34,
            DistanceUnit::Feet => 0.3048,
        }
    }
}

/// 半径查询命中的成员
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMember {
    pub payload: Vec<u8>,
    /// 与查询中心的距离，单位与查询一致
    pub distance: f64,
}

/// GEO 索引后端
#[async_trait]
pub trait GeoIndexStore: Send + Sync {
    type Session: GeoIndexSession;

    /// 获取一个会话(连接)
    async fn session(&self) -> Result<Self::Session, CacheUnavailable>;
}

/// 单个会话上的 GEO 操作
#[async_trait]
pub trait GeoIndexSession: Send {
    /// 添加成员，成员已存在时覆盖坐标
    async fn add_member(
        &mut self,
        partition_key: &str,
        longitude: f64,
        latitude: f64,
        payload: &[u8],
    ) -> Result<(), CacheUnavailable>;

    /// 查询半径内的成员，按距离升序
    async fn radius_query(
        &mut self,
        partition_key: &str,
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<Vec<GeoMember>, CacheUnavailable>;

    /// 删除成员，不存在时什么也不做
    async fn remove_member(
        &mut self,
        partition_key: &str,
        payload: &[u8],
    ) -> Result<(), CacheUnavailable>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DistanceUnit::Meters, "m", 1.0)]
    #[case(DistanceUnit::Kilometers, "km", 1000.0)]
    #[case(DistanceUnit::Miles, "mi", 1609.34)]
    #[case(DistanceUnit::Feet, "ft", 0.3048)]
    fn unit_maps_to_redis_argument(
        #[case] unit: DistanceUnit,
        #[case] arg: &str,
        #[case] meters: f64,
    ) {
        assert_eq!(unit.as_redis_arg(), arg);
        assert_eq!(unit.meters_per_unit(), meters);
    }
}
