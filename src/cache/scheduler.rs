use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cache::operations::rate_limit::RateLimitStore;

/// 按窗口长度周期性清空计数表的后台任务
///
/// 周期取自计数表自己的窗口长度，与 `X-RateLimit-Reset` 的计算保持一致。
/// 调用 `shutdown` 停止并等待任务退出；直接 drop 时任务会被中止。
pub struct ResetScheduler {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ResetScheduler {
    pub fn spawn(store: Arc<RateLimitStore>) -> Self {
        let period = store.duration();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            // 第一次重置发生在一个完整窗口之后
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let cleared = store.reset_all();
                        tracing::debug!(cleared, "Rate limit window reset");
                    }
                }
            }
            tracing::debug!("Rate limit reset scheduler stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!("Reset scheduler task ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for ResetScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
