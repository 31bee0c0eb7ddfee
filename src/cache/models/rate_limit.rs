use chrono::{DateTime, Utc};
use serde::Serialize;

/// 单个客户端键在当前窗口内的计数
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub key: String,
    pub count: u32,
    // 首次出现时确定，之后的递增不会移动它
    pub reset_at: DateTime<Utc>,
}

/// 一次 `increment` 的结果
///
/// `window` 是计数所在窗口的序号，每次全局重置加一。
/// 退款 (`RateLimitStore::refund`) 只在同一窗口内生效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHit {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
    pub window: u64,
}
