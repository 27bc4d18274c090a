//! Input item - transport から渡される一時ファイル

use std::io;
use std::path::{Path, PathBuf};

/// A stored upload waiting to be transformed.
///
/// transport 層が一時ディレクトリに保存したファイルと、
/// クライアントが申告した元のファイル名の組です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    path: PathBuf,
    original_name: String,
    size_bytes: u64,
}

impl InputItem {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            size_bytes,
        }
    }

    /// Build an item from a file already on disk, measuring its size.
    pub async fn from_path(
        path: impl Into<PathBuf>,
        original_name: impl Into<String>,
    ) -> io::Result<Self> {
        let path = path.into();
        let size_bytes = tokio::fs::metadata(&path).await?.len();
        Ok(Self::new(path, original_name, size_bytes))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_path_measures_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload-1");
        tokio::fs::write(&path, vec![0u8; 1234]).await.unwrap();

        let item = InputItem::from_path(&path, "cat.png").await.unwrap();
        assert_eq!(item.size_bytes(), 1234);
        assert_eq!(item.original_name(), "cat.png");
        assert_eq!(item.path(), path.as_path());
    }

    #[tokio::test]
    async fn from_path_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = InputItem::from_path(dir.path().join("nope"), "nope.png")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
