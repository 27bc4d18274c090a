//! Tokio 実装 - FileRemover / Sleeper

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{FileRemover, Sleeper};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRemover;

#[async_trait]
impl FileRemover for TokioFileRemover {
    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// Timer-based wait; `tokio::time::pause` makes it instant in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
