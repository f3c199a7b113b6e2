use std::env;
use std::time::Duration;

use crate::cache::keys::DEFAULT_REGION_KEY_PREFIX;
use crate::cache::store::DistanceUnit;

/// 同步时定位旧缓存条目的默认搜索半径（公里）
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 0.01;

/// 单次存储调用的默认超时（毫秒）
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub redis_url: String,
    pub region_key_prefix: String,
    pub search_radius_km: f64,
    pub store_timeout_ms: u64,
    pub sync_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            redis_url: env::var("REDIS_URL")?,
            region_key_prefix: env::var("REGION_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_REGION_KEY_PREFIX.to_string()),
            search_radius_km: env::var("SYNC_SEARCH_RADIUS_KM")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|r| r.is_finite() && *r > 0.0)
                .unwrap_or(DEFAULT_SEARCH_RADIUS_KM),
            store_timeout_ms: env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_STORE_TIMEOUT_MS),
            sync_concurrency: env::var("SYNC_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(8),
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            search_radius: self.search_radius_km,
            search_unit: DistanceUnit::Kilometers,
            store_timeout: self.store_timeout(),
        }
    }
}

/// 评分同步服务使用的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub search_radius: f64,
    pub search_unit: DistanceUnit,
    pub store_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_SEARCH_RADIUS_KM,
            search_unit: DistanceUnit::Kilometers,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}
