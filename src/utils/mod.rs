use std::path::Path;

mod filename;

pub use filename::FilenameGenerator;

/// 禁止上传的扩展名 (小写，含前导点)
pub const BLACKLISTED_EXTENSIONS: [&str; 5] = [".exe", ".bat", ".cmd", ".msi", ".sh"];

/// 原始文件名中可以沿用到存储名的扩展名 (不含点)
///
/// 只接受 ASCII 字母和数字，其它字符组成的扩展名直接丢弃。
pub fn file_extension(original_name: &str) -> Option<&str> {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// 扩展名在黑名单中时返回拒绝原因
pub fn check_extension(original_name: &str) -> Result<(), String> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.trim().to_ascii_lowercase());

    match ext {
        Some(ext) if BLACKLISTED_EXTENSIONS.contains(&format!(".{}", ext).as_str()) => Err(
            format!("The file extension {} is not allowed to be uploaded", ext),
        ),
        _ => Ok(()),
    }
}
