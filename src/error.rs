use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::storage::StorageError;

#[derive(Debug)]
pub enum AppError {
    /// 请求中没有任何可接收的文件
    NoFiles,
    /// 所有文件都被拒绝，或批量模式下有文件被拒绝
    Rejected(String),
    /// multipart 流解析失败，状态码沿用解析器给出的（超出大小限制为 413）
    Malformed(StatusCode, String),
    InvalidFileName,
    NotFound,
    StorageWrite,
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NoFiles => (StatusCode::BAD_REQUEST, "No files".to_string()),
            AppError::Rejected(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Malformed(status, message) => (status, message),
            AppError::InvalidFileName => {
                (StatusCode::BAD_REQUEST, "Invalid file name".to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "File not found".to_string()),
            AppError::StorageWrite => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded files".to_string(),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

// 存储层的细节只写日志，不返回给客户端
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName => AppError::InvalidFileName,
            StorageError::NotFound => AppError::NotFound,
            StorageError::AlreadyExists | StorageError::Io(_) => {
                tracing::error!("Storage error: {}", err);
                AppError::StorageWrite
            }
        }
    }
}
