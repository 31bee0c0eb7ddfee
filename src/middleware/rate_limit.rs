use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{cache::RateLimitStore, config::Config, error::ErrorResponse};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 从请求计算限流键
pub type KeyGenerator = Arc<dyn Fn(&Request<Body>) -> Result<String, BoxError> + Send + Sync>;

/// 返回 true 时请求完全绕过限流
pub type SkipPredicate = Arc<dyn Fn(&Request<Body>) -> Result<bool, BoxError> + Send + Sync>;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const UNKNOWN_KEY: &str = "unknown";

/// 附加到请求扩展中的配额信息，下游处理器可以通过 `Extension<RateLimitInfo>` 读取
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub current: u32,
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RateLimitOptions {
    pub window: Duration,
    /// 0 表示只计数不拒绝
    pub max: u32,
    pub status_code: StatusCode,
    pub message: String,
    pub trust_proxy: bool,
    /// 下游响应状态 >= 400 时退还本次计数
    pub refund_failed: bool,
    pub key_generator: Option<KeyGenerator>,
    pub skip: Option<SkipPredicate>,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RateLimitOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window: config.rate_limit_window(),
            max: config.rate_limit_requests,
            status_code: config.rate_limit_status_code,
            message: config.rate_limit_message.clone(),
            trust_proxy: config.rate_limit_trust_proxy,
            refund_failed: config.rate_limit_refund_failed,
            key_generator: None,
            skip: None,
        }
    }

    pub fn with_key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request<Body>) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(f));
        self
    }

    pub fn with_skip<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request<Body>) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(f));
        self
    }

    /// Retry-After 的秒数，等于窗口长度向上取整
    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_millis().div_ceil(1000) as u64
    }
}

pub struct RateLimiter {
    store: Arc<RateLimitStore>,
    options: RateLimitOptions,
}

impl RateLimiter {
    pub fn new(options: RateLimitOptions) -> Self {
        Self {
            store: Arc::new(RateLimitStore::new(options.window)),
            options,
        }
    }

    pub fn store(&self) -> Arc<RateLimitStore> {
        Arc::clone(&self.store)
    }

    // 判断失败时一律按"不跳过"处理，不能因为谓词出错而绕过限流
    fn should_skip(&self, req: &Request<Body>) -> bool {
        let Some(skip) = &self.options.skip else {
            return false;
        };
        match skip(req) {
            Ok(skip) => skip,
            Err(err) => {
                tracing::warn!("Rate limit skip predicate failed, limiting anyway: {}", err);
                false
            }
        }
    }

    // 自定义键提取失败或为空时回退到默认键
    fn resolve_key(&self, req: &Request<Body>) -> String {
        if let Some(generator) = &self.options.key_generator {
            match generator(req) {
                Ok(key) if !key.trim().is_empty() => return key,
                Ok(_) => tracing::warn!("Rate limit key generator returned an empty key"),
                Err(err) => tracing::warn!("Rate limit key generator failed: {}", err),
            }
        }
        default_key(req, self.options.trust_proxy)
    }

    pub async fn check_rate_limit(self: Arc<Self>, mut req: Request<Body>, next: Next) -> Response {
        if self.should_skip(&req) {
            return next.run(req).await;
        }

        let key = self.resolve_key(&req);
        let hit = self.store.increment(&key);
        let limit = self.options.max;

        let info = RateLimitInfo {
            current: hit.count,
            limit,
            remaining: limit.saturating_sub(hit.count),
            reset: hit.reset_at,
        };
        req.extensions_mut().insert(info.clone());

        if limit > 0 && hit.count > limit {
            tracing::warn!(key = %key, count = hit.count, limit, "Rate limit exceeded");
            let mut response = (
                self.options.status_code,
                Json(ErrorResponse::new(self.options.message.clone())),
            )
                .into_response();
            let headers = response.headers_mut();
            apply_headers(headers, &info);
            headers.insert(
                header::RETRY_AFTER,
                HeaderValue::from(self.options.retry_after_secs()),
            );
            return response;
        }

        let mut response = next.run(req).await;

        let status = response.status();
        if self.options.refund_failed && (status.is_client_error() || status.is_server_error()) {
            if let Some(count) = self.store.refund(&key, &hit) {
                tracing::debug!(key = %key, count, status = status.as_u16(), "Refunded failed request");
            }
        }

        apply_headers(response.headers_mut(), &info);
        response
    }
}

fn apply_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(info.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(info.remaining));
    // 窗口结束时间，Unix 秒
    let reset_secs = info.reset.timestamp_millis().div_euclid(1000)
        + i64::from(info.reset.timestamp_subsec_millis() > 0);
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_secs));
}

/// 默认键：客户端地址
///
/// 只有在 `trust_proxy` 打开时才信任 X-Forwarded-For / X-Real-IP，
/// 否则任何人都可以伪造头部绕过按 IP 的限流。
pub fn default_key(req: &Request<Body>, trust_proxy: bool) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    let forwarded = if trust_proxy {
        req.headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
            .or_else(|| {
                req.headers()
                    .get("x-real-ip")
                    .and_then(|h| h.to_str().ok())
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
            })
    } else {
        None
    };

    forwarded
        .map(str::to_string)
        .or(remote_ip)
        .unwrap_or_else(|| UNKNOWN_KEY.to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
