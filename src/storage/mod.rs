use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid file name")]
    InvalidName,
    #[error("file not found")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            ErrorKind::AlreadyExists => StorageError::AlreadyExists,
            _ => StorageError::Io(err),
        }
    }
}

/// 扁平的本地上传目录，所有访问都限制在根目录之内
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// 新建文件；同名文件已存在时返回 `AlreadyExists`，不会覆盖
    ///
    /// 其他失败（包括上传目录不存在）都是写入错误，统一为 `Io`。
    pub async fn create(&self, name: &str) -> Result<PartialFile, StorageError> {
        let path = self.child_path(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists,
                _ => StorageError::Io(err),
            })?;
        Ok(PartialFile {
            file: Some(file),
            path,
            written: 0,
            committed: false,
        })
    }

    /// 打开已存储的文件，解析后的真实路径必须仍在根目录之下
    pub async fn open(&self, name: &str) -> Result<(File, u64), StorageError> {
        let path = self.child_path(name)?;
        let root = fs::canonicalize(&self.root).await?;
        let target = fs::canonicalize(&path).await.map_err(StorageError::from_io)?;
        if !target.starts_with(&root) {
            return Err(StorageError::InvalidName);
        }

        let metadata = fs::metadata(&target).await.map_err(StorageError::from_io)?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound);
        }
        let file = File::open(&target).await.map_err(StorageError::from_io)?;
        Ok((file, metadata.len()))
    }

    pub async fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.child_path(name)?;
        fs::remove_file(&path).await.map_err(StorageError::from_io)
    }

    fn child_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_plain_file_name(name) {
            return Err(StorageError::InvalidName);
        }
        Ok(self.root.join(name))
    }
}

/// 名字必须是单个普通路径段：不含分隔符、不是 `.`/`..`、不以点开头
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// 正在写入的文件，未调用 `commit` 就被 drop 时删除已写的部分
pub struct PartialFile {
    file: Option<File>,
    path: PathBuf,
    written: u64,
    committed: bool,
}

impl PartialFile {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
            self.written += chunk.len() as u64;
        }
        Ok(())
    }

    pub async fn commit(mut self) -> Result<u64, StorageError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        self.committed = true;
        Ok(self.written)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "Failed to remove partial upload: {}", err);
            }
        }
    }
}
