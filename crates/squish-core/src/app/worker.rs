//! TransformWorker - 1 ファイル分の変換
//!
//! codec を呼び出して artifact を書き出し、変換前後のサイズを返します。
//! 失敗は `TransformFailed` としてアイテム単位に閉じ込めます。

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::domain::errors::SquishError;
use crate::domain::input::InputItem;
use crate::domain::report::SizeReport;
use crate::ports::{Codec, CodecError, TransformParams};

pub struct TransformWorker {
    codec: Arc<dyn Codec>,
    params: TransformParams,
}

impl TransformWorker {
    pub fn new(codec: Arc<dyn Codec>, params: TransformParams) -> Self {
        Self { codec, params }
    }

    pub fn params(&self) -> &TransformParams {
        &self.params
    }

    /// Transform `item` into `dest` and measure both files.
    ///
    /// On failure `dest` is removed, so nothing unregistered stays behind.
    pub async fn run(&self, item: &InputItem, dest: &Path) -> Result<SizeReport, SquishError> {
        match self.transform(item, dest).await {
            Ok(compressed_bytes) => Ok(SizeReport::new(item.size_bytes(), compressed_bytes)),
            Err(source) => {
                discard(dest).await;
                Err(SquishError::TransformFailed {
                    original_name: item.original_name().to_string(),
                    source,
                })
            }
        }
    }

    async fn transform(&self, item: &InputItem, dest: &Path) -> Result<u64, CodecError> {
        self.codec.transform(item.path(), dest, &self.params).await?;
        Ok(tokio::fs::metadata(dest).await?.len())
    }
}

async fn discard(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %dest.display(), error = %err, "cannot remove partial artifact"),
    }
}
