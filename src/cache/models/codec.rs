//! 缓存条目与 GEO 成员字节串之间的编解码
//!
//! 格式: `id:name:region:latitude:longitude:average_rating:rating_count`，
//! 第一个字段永远是餐厅 ID。name 和 region 不能包含分隔符。

use std::str::FromStr;

use super::restaurant::RestaurantCacheEntry;
use crate::error::MalformedEntry;

/// 字段分隔符
pub const ENTRY_DELIMITER: char = ':';

const FIELD_COUNT: usize = 7;

/// 编码缓存条目
pub fn encode_entry(entry: &RestaurantCacheEntry) -> Vec<u8> {
    // f64 的 Display 输出是最短可往返表示
    format!(
        "{id}{d}{name}{d}{region}{d}{lat}{d}{lon}{d}{avg}{d}{count}",
        d = ENTRY_DELIMITER,
        id = entry.restaurant_id,
        name = entry.name,
        region = entry.region_name,
        lat = entry.latitude,
        lon = entry.longitude,
        avg = entry.average_rating,
        count = entry.rating_count,
    )
    .into_bytes()
}

/// 解码缓存条目
pub fn decode_entry(payload: &[u8]) -> Result<RestaurantCacheEntry, MalformedEntry> {
    let text = std::str::from_utf8(payload).map_err(|_| MalformedEntry::NotUtf8)?;
    let fields: Vec<&str> = text.split(ENTRY_DELIMITER).collect();
    let [id, name, region, lat, lon, avg, count] = fields.as_slice() else {
        return Err(MalformedEntry::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    };

    let restaurant_id = id
        .parse::<i64>()
        .map_err(|_| MalformedEntry::InvalidId(id.to_string()))?;

    Ok(RestaurantCacheEntry {
        restaurant_id,
        name: name.to_string(),
        region_name: region.to_string(),
        latitude: parse_field("latitude", lat)?,
        longitude: parse_field("longitude", lon)?,
        average_rating: parse_field("average_rating", avg)?,
        rating_count: parse_field("rating_count", count)?,
    })
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, MalformedEntry> {
    value.parse().map_err(|_| MalformedEntry::InvalidField {
        field,
        value: value.to_string(),
    })
}
