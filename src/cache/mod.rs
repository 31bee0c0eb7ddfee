// 缓存模块
// 进程内的速率限制计数表及其窗口重置调度

pub mod models;
pub mod operations;
pub mod scheduler;

// 重新导出常用类型，方便其他模块使用
pub use models::rate_limit::{RateLimitEntry, RateLimitHit};
pub use operations::rate_limit::RateLimitStore;
pub use scheduler::ResetScheduler;
