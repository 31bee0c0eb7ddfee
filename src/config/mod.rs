use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::StatusCode;

const DEFAULT_PORT: u16 = 3555;
const DEFAULT_UPLOAD_DIR: &str = "data/uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
// 墨尔本标准时间 (UTC+10)
const DEFAULT_TZ_OFFSET_MINUTES: i32 = 600;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 30_000;
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 5;
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str = "Too many requests, please slow down.";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub upload_all_or_nothing: bool,
    pub upload_tz_offset_minutes: i32,
    pub rate_limit_window_ms: u64,
    pub rate_limit_requests: u32,
    pub rate_limit_status_code: StatusCode,
    pub rate_limit_message: String,
    pub rate_limit_trust_proxy: bool,
    pub rate_limit_refund_failed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源解析配置，缺失或无法解析的值回退到默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let server_port = parse_or(&lookup, "SERVER_PORT", DEFAULT_PORT);
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));

        let rate_limit_status_code = parse_or(&lookup, "RATE_LIMIT_STATUS_CODE", 429u16);
        let rate_limit_status_code =
            StatusCode::from_u16(rate_limit_status_code).unwrap_or_else(|_| {
                tracing::warn!(
                    value = rate_limit_status_code,
                    "Invalid RATE_LIMIT_STATUS_CODE, falling back to 429"
                );
                StatusCode::TOO_MANY_REQUESTS
            });

        Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            public_base_url,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            upload_all_or_nothing: parse_or(&lookup, "UPLOAD_ALL_OR_NOTHING", false),
            upload_tz_offset_minutes: parse_or(
                &lookup,
                "UPLOAD_TZ_OFFSET_MINUTES",
                DEFAULT_TZ_OFFSET_MINUTES,
            ),
            rate_limit_window_ms: parse_or(
                &lookup,
                "RATE_LIMIT_WINDOW_MS",
                DEFAULT_RATE_LIMIT_WINDOW_MS,
            )
            .max(1),
            rate_limit_requests: parse_or(
                &lookup,
                "RATE_LIMIT_REQUESTS",
                DEFAULT_RATE_LIMIT_REQUESTS,
            ),
            rate_limit_status_code,
            rate_limit_message: lookup("RATE_LIMIT_MESSAGE")
                .unwrap_or_else(|| DEFAULT_RATE_LIMIT_MESSAGE.into()),
            rate_limit_trust_proxy: parse_or(&lookup, "RATE_LIMIT_TRUST_PROXY", false),
            rate_limit_refund_failed: parse_or(&lookup, "RATE_LIMIT_REFUND_FAILED", true),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid config value, using default");
            default
        }),
        None => default,
    }
}
