use std::time::Duration;

use thiserror::Error;

/// 缓存后端不可用（连接、超时或协议错误）
///
/// 对当前同步调用是致命的，原样返回给调用方，内部不做重试。
#[derive(Debug, Error)]
pub enum CacheUnavailable {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("cache backend unavailable: {0}")]
    Backend(String),
}

/// GEO 成员无法解码为缓存条目
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEntry {
    #[error("payload is not valid utf-8")]
    NotUtf8,
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid restaurant id: {0:?}")]
    InvalidId(String),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// 评分同步失败
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Unavailable(#[from] CacheUnavailable),
    #[error("{field} contains the reserved delimiter {delimiter:?}")]
    ReservedDelimiter {
        field: &'static str,
        delimiter: char,
    },
}
