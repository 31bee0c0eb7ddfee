use axum::{
    Json,
    extract::{
        State,
        multipart::{Field, Multipart, MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    error::AppError,
    routes::upload::model::{UploadResponse, UploadedFile},
    storage::StorageError,
    utils::check_extension,
};

pub const FILES_FIELD: &str = "files[]";

// 生成的名字碰巧已存在时重新生成的次数
const NAME_ATTEMPTS: usize = 3;

// 上传文件API
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    // 非 multipart 请求等同于没有文件
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("Upload without multipart body: {}", rejection);
            return Err(AppError::NoFiles);
        }
    };

    let mut stored: Vec<UploadedFile> = Vec::new();
    let mut rejected: Vec<String> = Vec::new();
    let mut saw_field = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // 连一个字段都没有解析出来，按空上传处理；超出大小限制除外
            Err(err) if !saw_field && err.status() != StatusCode::PAYLOAD_TOO_LARGE => {
                tracing::debug!("Empty or unreadable multipart body: {}", err);
                return Err(AppError::NoFiles);
            }
            Err(err) => {
                discard(&state, &stored).await;
                return Err(multipart_error(err));
            }
        };
        saw_field = true;

        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        if let Err(reason) = check_extension(&original_name) {
            tracing::info!(file = %original_name, "Rejected upload: {}", reason);
            if state.config.upload_all_or_nothing {
                discard(&state, &stored).await;
                return Err(AppError::Rejected(reason));
            }
            rejected.push(reason);
            continue;
        }

        match store_field(&state, field, original_name).await {
            Ok(record) => stored.push(record),
            Err(err) => {
                discard(&state, &stored).await;
                return Err(err);
            }
        }
    }

    if stored.is_empty() {
        return Err(if rejected.is_empty() {
            AppError::NoFiles
        } else {
            AppError::Rejected(rejected.join("; "))
        });
    }

    Ok(Json(UploadResponse::new(stored, rejected)))
}

async fn store_field(
    state: &AppState,
    mut field: Field<'_>,
    original_name: String,
) -> Result<UploadedFile, AppError> {
    let mimetype = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut attempt = 0;
    let (filename, mut file) = loop {
        attempt += 1;
        let filename = state.filenames.generate(&original_name);
        match state.storage.create(&filename).await {
            Ok(file) => break (filename, file),
            Err(StorageError::AlreadyExists) if attempt < NAME_ATTEMPTS => {
                tracing::warn!(filename = %filename, "Generated filename already exists, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    };

    // 出错返回时 file 被 drop，已写入的部分会被删除
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write(&chunk).await?;
    }
    let size = file.commit().await?;

    tracing::info!(filename = %filename, original = %original_name, size, "Stored upload");

    Ok(UploadedFile {
        url: format!("{}/{}", state.config.public_base_url, filename),
        filename,
        originalname: original_name,
        mimetype,
        size,
        timestamp: Utc::now().timestamp_millis(),
    })
}

// 请求失败时删除本次已经写入的文件
async fn discard(state: &AppState, stored: &[UploadedFile]) {
    for record in stored {
        if let Err(err) = state.storage.remove(&record.filename).await {
            tracing::warn!(filename = %record.filename, "Failed to discard upload: {}", err);
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    let status = err.status();
    tracing::warn!(%status, "Multipart stream failed: {}", err.body_text());
    AppError::Malformed(status, format!("Malformed upload: {}", err.body_text()))
}
