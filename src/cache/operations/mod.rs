/// 缓存操作

// 速率限制计数
pub mod rate_limit;

pub use rate_limit::*;
