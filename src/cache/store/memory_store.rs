//! 内存版 GEO 索引存储
//!
//! 语义与 Redis GEO 有序集合一致：同一分区内成员唯一，
//! 重复添加只更新坐标。用于测试和无 Redis 的嵌入场景。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DistanceUnit, GeoIndexSession, GeoIndexStore, GeoMember};
use crate::error::CacheUnavailable;

/// Redis 使用的地球半径(米)
const EARTH_RADIUS_IN_METERS: f64 = 6372797.560856;

const MAX_LATITUDE: f64 = 85.05112878;

/// 分区内的一个成员及其坐标
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMember {
    pub payload: Vec<u8>,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Default)]
struct MemoryState {
    partitions: Mutex<HashMap<String, Vec<StoredMember>>>,
    unavailable: AtomicBool,
    stall_adds: AtomicBool,
    sessions_opened: AtomicUsize,
    mutations: AtomicUsize,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), CacheUnavailable> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheUnavailable::Backend(
                "memory geo store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryGeoStore {
    state: Arc<MemoryState>,
}

impl MemoryGeoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换可用状态，离线时所有操作返回 CacheUnavailable
    pub fn set_available(&self, available: bool) {
        self.state.unavailable.store(!available, Ordering::SeqCst);
    }

    /// 开启后 add_member 永远挂起，用于模拟删除之后、写入之前被取消
    pub fn set_stall_adds(&self, stall: bool) {
        self.state.stall_adds.store(stall, Ordering::SeqCst);
    }

    /// 已打开的会话数
    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// 写操作数：每次添加，以及真正删掉成员的删除
    pub fn mutations(&self) -> usize {
        self.state.mutations.load(Ordering::SeqCst)
    }

    /// 分区内全部成员的快照
    pub async fn members(&self, partition_key: &str) -> Vec<StoredMember> {
        self.state
            .partitions
            .lock()
            .await
            .get(partition_key)
            .cloned()
            .unwrap_or_default()
    }

    /// 直接写入成员，绕过会话和可用状态
    pub async fn insert_raw(
        &self,
        partition_key: &str,
        longitude: f64,
        latitude: f64,
        payload: &[u8],
    ) {
        let mut partitions = self.state.partitions.lock().await;
        upsert(
            partitions.entry(partition_key.to_string()).or_default(),
            longitude,
            latitude,
            payload,
        );
    }
}

#[async_trait]
impl GeoIndexStore for MemoryGeoStore {
    type Session = MemoryGeoSession;

    async fn session(&self) -> Result<Self::Session, CacheUnavailable> {
        self.state.check_available()?;
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryGeoSession {
            state: self.state.clone(),
        })
    }
}

pub struct MemoryGeoSession {
    state: Arc<MemoryState>,
}

#[async_trait]
impl GeoIndexSession for MemoryGeoSession {
    async fn add_member(
        &mut self,
        partition_key: &str,
        longitude: f64,
        latitude: f64,
        payload: &[u8],
    ) -> Result<(), CacheUnavailable> {
        // 让出执行权，使并发调用可以交错
        tokio::task::yield_now().await;
        self.state.check_available()?;
        validate_coordinates(longitude, latitude)?;
        if self.state.stall_adds.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let mut partitions = self.state.partitions.lock().await;
        upsert(
            partitions.entry(partition_key.to_string()).or_default(),
            longitude,
            latitude,
            payload,
        );
        self.state.mutations.fetch_add(1, Ordering::SeqCst);
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
        tokio::task::yield_now().await;
        self.state.check_available()?;
        validate_coordinates(longitude, latitude)?;

        let radius_meters = radius * unit.meters_per_unit();
        let partitions = self.state.partitions.lock().await;
        let Some(members) = partitions.get(partition_key) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<(f64, &StoredMember)> = members
            .iter()
            .map(|m| (distance_meters(longitude, latitude, m.longitude, m.latitude), m))
            .filter(|(d, _)| *d <= radius_meters)
            .collect();
        results.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(results
            .into_iter()
            .map(|(d, m)| GeoMember {
                payload: m.payload.clone(),
                distance: d / unit.meters_per_unit(),
            })
            .collect())
    }

    async fn remove_member(
        &mut self,
        partition_key: &str,
        payload: &[u8],
    ) -> Result<(), CacheUnavailable> {
        tokio::task::yield_now().await;
        self.state.check_available()?;

        let mut partitions = self.state.partitions.lock().await;
        let Some(members) = partitions.get_mut(partition_key) else {
            return Ok(());
        };
        let before = members.len();
        members.retain(|m| m.payload != payload);
        if members.len() < before {
            self.state.mutations.fetch_add(1, Ordering::SeqCst);
        }
        // Redis 在有序集合清空后删除键
        if members.is_empty() {
            partitions.remove(partition_key);
        }
        Ok(())
    }
}

fn upsert(members: &mut Vec<StoredMember>, longitude: f64, latitude: f64, payload: &[u8]) {
    match members.iter_mut().find(|m| m.payload == payload) {
        Some(existing) => {
            existing.longitude = longitude;
            existing.latitude = latitude;
        }
        None => members.push(StoredMember {
            payload: payload.to_vec(),
            longitude,
            latitude,
        }),
    }
}

fn validate_coordinates(longitude: f64, latitude: f64) -> Result<(), CacheUnavailable> {
    if !(-180.0..=180.0).contains(&longitude) || !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&latitude)
    {
        return Err(CacheUnavailable::Backend(format!(
            "invalid longitude,latitude pair {},{}",
            longitude, latitude
        )));
    }
    Ok(())
}

/// 与 Redis geohashGetDistance 相同的 haversine 公式
fn distance_meters(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1r = lat1.to_radians();
    let lat2r = lat2.to_radians();
    let u = ((lat2r - lat1r) / 2.0).sin();
    let v = ((lon2.to_radians() - lon1.to_radians()) / 2.0).sin();
    2.0 * EARTH_RADIUS_IN_METERS * (u * u + lat1r.cos() * lat2r.cos() * v * v).sqrt().asin()
}
