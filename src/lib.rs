use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use config::Config;
use middleware::{RateLimiter, log_errors, rate_limit};
use storage::Storage;
use utils::FilenameGenerator;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod storage;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub filenames: FilenameGenerator,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            storage: Storage::new(config.upload_dir.clone()),
            filenames: FilenameGenerator::new(config.upload_tz_offset_minutes),
            config: Arc::new(config),
        }
    }
}

// 创建主路由
pub fn create_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/", get(routes::index))
        .route("/upload", post(routes::upload::upload).layer(body_limit))
        .route("/{file}", get(routes::file::download))
        // 添加日志中间件和限流中间件
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("SAMEORIGIN"),
                )),
        )
        .with_state(state)
}
