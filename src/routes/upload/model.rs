use serde::{Deserialize, Serialize};

/// 已存储文件的清单条目，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub originalname: String,
    pub mimetype: String,
    pub size: u64,
    pub url: String,
    // Unix 毫秒
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

impl UploadResponse {
    pub fn new(files: Vec<UploadedFile>, rejected: Vec<String>) -> Self {
        Self {
            message: format!("Successfully uploaded {} files", files.len()),
            files,
            rejected,
        }
    }
}
