use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::{AppState, error::AppError, storage::StorageError};

// 下载已存储的文件
pub async fn download(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let (handle, size) = state.storage.open(&file).await.map_err(|err| match err {
        StorageError::InvalidName => {
            tracing::warn!(file = %file, "Rejected download outside storage root");
            AppError::InvalidFileName
        }
        StorageError::NotFound => AppError::NotFound,
        StorageError::AlreadyExists | StorageError::Io(_) => {
            tracing::error!(file = %file, "Failed to open stored file: {}", err);
            AppError::InternalServerError
        }
    })?;

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));

    tracing::debug!(file = %file, size, "Serving stored file");
    Ok((
        StatusCode::OK,
        headers,
        Body::from_stream(ReaderStream::new(handle)),
    )
        .into_response())
}
