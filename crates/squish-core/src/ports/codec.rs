//! Codec port - 画像変換ライブラリの抽象化
//!
//! 「バイト列とパラメータを渡すと変換結果を書き出すか、失敗する」という
//! 契約だけを持つブラックボックスです。

use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Target encoding of derived artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Fixed transformation parameters (configuration constants, not per call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformParams {
    /// Neither side of the output exceeds this many pixels.
    pub max_dimension: u32,
    pub format: OutputFormat,
    /// 1..=100, honoured by lossy encoders only.
    pub quality: u8,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            format: OutputFormat::Webp,
            quality: 80,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("codec i/o: {0}")]
    Io(#[from] io::Error),

    #[error("codec task aborted: {0}")]
    Aborted(String),
}

/// Codec は source を読み、変換結果を dest に書き出す
#[async_trait]
pub trait Codec: Send + Sync {
    async fn transform(
        &self,
        source: &Path,
        dest: &Path,
        params: &TransformParams,
    ) -> Result<(), CodecError>;
}
