use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::cache::models::rate_limit::{RateLimitEntry, RateLimitHit};

struct WindowState {
    entries: HashMap<String, RateLimitEntry>,
    started_at: DateTime<Utc>,
    window: u64,
}

/// 进程内的速率限制计数表
///
/// 一把锁保护整张表和窗口信息，`increment`、`decrement`、`reset_all`
/// 按获取锁的顺序线性化。与重置并发的递增要么在重置之前拿到锁
/// (计入旧窗口并随之清除)，要么在之后拿到锁 (计入新窗口，从 1 开始)，
/// 返回的 `RateLimitHit::window` 标明实际落入的窗口。
pub struct RateLimitStore {
    state: Mutex<WindowState>,
    duration: Duration,
}

impl RateLimitStore {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: Mutex::new(WindowState {
                entries: HashMap::new(),
                started_at: Utc::now(),
                window: 0,
            }),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 递增并返回递增后的计数，键不存在时以 1 创建
    pub fn increment(&self, key: &str) -> RateLimitHit {
        let mut state = self.state.lock();
        let reset_at = window_end(state.started_at, self.duration);
        let window = state.window;

        let entry = state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                key: key.to_string(),
                count: 0,
                reset_at,
            });
        entry.count = entry.count.saturating_add(1);

        RateLimitHit {
            count: entry.count,
            reset_at: entry.reset_at,
            window,
        }
    }

    /// 递减并返回递减后的计数，键不存在时返回 0，计数不会小于 0
    pub fn decrement(&self, key: &str) -> u32 {
        let mut state = self.state.lock();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.count = entry.count.saturating_sub(1);
                entry.count
            }
            None => 0,
        }
    }

    /// 撤销一次递增，窗口已经切换时不做任何事
    pub fn refund(&self, key: &str, hit: &RateLimitHit) -> Option<u32> {
        let mut state = self.state.lock();
        if state.window != hit.window {
            return None;
        }
        let entry = state.entries.get_mut(key)?;
        entry.count = entry.count.saturating_sub(1);
        Some(entry.count)
    }

    /// 清空所有计数并开始新窗口，只应由重置调度器调用
    pub fn reset_all(&self) -> usize {
        let mut state = self.state.lock();
        let cleared = state.entries.len();
        state.entries.clear();
        state.started_at = Utc::now();
        state.window += 1;
        cleared
    }

    pub fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_window(&self) -> u64 {
        self.state.lock().window
    }
}

fn window_end(started_at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| started_at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
