use std::sync::Arc;

use async_trait::async_trait;
use redis::Client as RedisClient;
use redis::aio::MultiplexedConnection;

use super::{DistanceUnit, GeoIndexSession, GeoIndexStore, GeoMember};
use crate::error::CacheUnavailable;

/// 基于 Redis GEO 命令的索引存储
#[derive(Clone)]
pub struct RedisGeoStore {
    redis_client: Arc<RedisClient>,
}

impl RedisGeoStore {
    /// 创建新的 Redis GEO 存储实例
    pub fn new(redis_client: Arc<RedisClient>) -> Self {
        Self { redis_client }
    }
}

#[async_trait]
impl GeoIndexStore for RedisGeoStore {
    type Session = RedisGeoSession;

    async fn session(&self) -> Result<Self::Session, CacheUnavailable> {
        let conn = self.redis_client.get_multiplexed_async_connection().await?;
        Ok(RedisGeoSession { conn })
    }
}

/// 持有一个 Redis 连接的会话，drop 时释放
pub struct RedisGeoSession {
    conn: MultiplexedConnection,
}

#[async_trait]
impl GeoIndexSession for RedisGeoSession {
    async fn add_member(
        &mut self,
        partition_key: &str,
        longitude: f64,
        latitude: f64,
        payload: &[u8],
    ) -> Result<(), CacheUnavailable> {
        // GEOADD 参数顺序是 longitude, latitude
        let _: i64 = redis::cmd("GEOADD")
            .arg(partition_key)
            .arg(longitude)
            .arg(latitude)
            .arg(payload)
            .query_async(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn radius_query(
        &mut self,
        partition_key: &str,
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<Vec<GeoMember>, CacheUnavailable> {
        let results: Vec<(Vec<u8>, f64)> = redis::cmd("GEORADIUS")
            .arg(partition_key)
            .arg(longitude)
            .arg(latitude)
            .arg(radius)
            .arg(unit.as_redis_arg())
            .arg("WITHDIST")
            .arg("ASC")
            .query_async(&mut self.conn)
            .await?;

        Ok(results
            .into_iter()
            .map(|(payload, distance)| GeoMember { payload, distance })
            .collect())
    }

    async fn remove_member(
        &mut self,
        partition_key: &str,
        payload: &[u8],
    ) -> Result<(), CacheUnavailable> {
        let _: i64 = redis::cmd("ZREM")
            .arg(partition_key)
            .arg(payload)
            .query_async(&mut self.conn)
            .await?;
        Ok(())
    }
}
