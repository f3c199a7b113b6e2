/// 区域(市/郡/区) GEO 索引键前缀
pub const DEFAULT_REGION_KEY_PREFIX: &str = "map:sgg:";

/// 区域分区键规则
///
/// 同一区域的所有读写都必须使用同一个实例生成键，
/// 否则一个逻辑区域会被拆成两个分区。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionKeyScheme {
    prefix: String,
}

impl RegionKeyScheme {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 生成区域 GEO 分区键
    pub fn partition_key(&self, region_name: &str) -> String {
        format!("{}{}", self.prefix, region_name)
    }
}

impl Default for RegionKeyScheme {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_KEY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_is_prefix_plus_region() {
        let keys = RegionKeyScheme::default();
        assert_eq!(keys.partition_key("Gangnam"), "map:sgg:Gangnam");
    }

    #[test]
    fn custom_prefix_is_used_verbatim() {
        let keys = RegionKeyScheme::new("restaurants:geo:");
        assert_eq!(keys.prefix(), "restaurants:geo:");
        assert_eq!(keys.partition_key("수원시"), "restaurants:geo:수원시");
    }
}
