use chrono::{DateTime, FixedOffset, Offset, Utc};
use rand::RngCore;

use crate::utils::file_extension;

// 随机后缀字节数，十六进制后为 16 个字符
const SUFFIX_BYTES: usize = 8;

/// 生成上传文件的存储名：`<DD>-<MM>-<YYYY>-<16 位十六进制><.ext>`
///
/// 日期按固定时区计算，后缀来自线程本地的密码学安全随机数，
/// 不检查目录中是否已有同名文件 (存储层以 `create_new` 兜底)。
#[derive(Debug, Clone, Copy)]
pub struct FilenameGenerator {
    offset: FixedOffset,
}

impl Default for FilenameGenerator {
    fn default() -> Self {
        Self::new(600)
    }
}

impl FilenameGenerator {
    /// `offset_minutes` 超出 ±24 小时时回退到 UTC
    pub fn new(offset_minutes: i32) -> Self {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(offset_minutes, "Invalid timezone offset, using UTC");
                Utc.fix()
            });
        Self { offset }
    }

    pub fn generate(&self, original_name: &str) -> String {
        self.generate_at(Utc::now(), original_name)
    }

    pub fn generate_at(&self, now: DateTime<Utc>, original_name: &str) -> String {
        let date = now.with_timezone(&self.offset).format("%d-%m-%Y");

        let mut bytes = [0u8; SUFFIX_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        let ext = file_extension(original_name)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        format!("{}-{}{}", date, hex::encode(bytes), ext)
    }
}
