use serde::{Deserialize, Serialize};

/// 餐厅聚合(由主库提供)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub region_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub ratings: Vec<i32>,
}

impl Restaurant {
    /// 计算平均评分和评分数量，没有评分时返回 None
    pub fn rating_aggregate(&self) -> Option<(f64, u32)> {
        if self.ratings.is_empty() {
            return None;
        }
        let count = self.ratings.len();
        let sum: i64 = self.ratings.iter().map(|r| i64::from(*r)).sum();
        Some((sum as f64 / count as f64, count as u32))
    }
}

/// 餐厅 GEO 缓存条目
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RestaurantCacheEntry {
    pub restaurant_id: i64,
    pub name: String,
    pub region_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub average_rating: f64,
    pub rating_count: u32,
}

impl RestaurantCacheEntry {
    /// 用最新的评分聚合构建缓存条目
    pub fn from_restaurant(restaurant: &Restaurant, average_rating: f64, rating_count: u32) -> Self {
        Self {
            restaurant_id: restaurant.id,
            name: restaurant.name.clone(),
            region_name: restaurant.region_name.clone(),
            latitude: restaurant.latitude,
            longitude: restaurant.longitude,
            average_rating,
            rating_count,
        }
    }
}

/// 附近餐厅查询结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NearbyRestaurant {
    pub entry: RestaurantCacheEntry,
    pub distance: f64,
}
