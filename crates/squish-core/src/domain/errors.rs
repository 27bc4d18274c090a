//! Errors - エラー型と分類
//!
//! バッチ受付より下で起きた失敗はアイテム単位に閉じ込め、呼び出し元へは
//! `Validation` だけが同期的に返ります。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::artifact::ArtifactName;
use crate::config::ConfigError;
use crate::ports::codec::CodecError;

/// SquishError はドメインエラー
#[derive(Debug, Error)]
pub enum SquishError {
    /// Empty or malformed batch, rejected before any work is scheduled.
    #[error("invalid batch: {0}")]
    Validation(String),

    #[error("transform failed for {original_name}: {source}")]
    TransformFailed {
        original_name: String,
        #[source]
        source: CodecError,
    },

    /// Cleanup gave up on a file. Logged only, never returned to callers.
    #[error("failed to delete {} after {attempts} attempt(s): {source}", .path.display())]
    DeletionFailed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("artifact not found or has been deleted: {0}")]
    NotFound(String),

    #[error("artifact name already registered: {0}")]
    DuplicateArtifact(ArtifactName),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SquishError {
    /// Whether the error belongs to the caller (bad input) rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SquishError::Validation(_) | SquishError::NotFound(_))
    }
}
