//! Storage ports - ファイル削除と非ブロッキング待機
//!
//! 削除リトライの状態機械を実時間なしでテストできるよう、
//! ファイル削除（FileRemover）と待機（Sleeper）を差し替え可能にしています。

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// FileRemover はファイルを 1 回だけ削除しようとする
#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Sleeper は非ブロッキングに待機する（スレッドを止めない）
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
