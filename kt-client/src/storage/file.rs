// kt-client/src/storage/file.rs
// 文件存储 - 每个 key 一个文件

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::BlobStore;
use crate::error::{KtError, KtResult};

/// File-backed blob store
///
/// Each key maps to `{base}/{hex(key)}.blob`; hex keeps arbitrary keys
/// filesystem-safe without collisions. Writes go through a temp file and a
/// rename so readers never see a partial blob.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    base_path: PathBuf,
}

impl FileBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.blob", hex::encode(key)))
    }

    /// 确保目录存在
    async fn ensure_dir(&self) -> KtResult<()> {
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| KtError::StorageWrite(format!("create {:?}: {}", self.base_path, e)))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get_item(&self, key: &str) -> KtResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KtError::StorageRead(e.to_string())),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> KtResult<()> {
        self.ensure_dir().await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| KtError::StorageWrite(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| KtError::StorageWrite(e.to_string()))
    }

    async fn remove_item(&self, key: &str) -> KtResult<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(KtError::StorageWrite(e.to_string())),
        }
    }
}
