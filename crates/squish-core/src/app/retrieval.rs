//! ArtifactLocator - artifact 取得（download）の読み取り側
//!
//! registry から表示用ファイル名を引き、ストレージにファイルがあれば
//! 配信に必要な情報を返します。期限切れや未作成は `NotFound`。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::registry::ArtifactRegistry;
use crate::domain::errors::SquishError;

/// What the transport needs to serve an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDownload {
    pub path: PathBuf,
    pub display_name: String,
    /// Value for a `Content-Disposition` header.
    pub content_disposition: String,
}

pub struct ArtifactLocator {
    output_dir: PathBuf,
    registry: Arc<ArtifactRegistry>,
}

impl ArtifactLocator {
    pub fn new(output_dir: impl Into<PathBuf>, registry: Arc<ArtifactRegistry>) -> Self {
        Self {
            output_dir: output_dir.into(),
            registry,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn locate(&self, name: &str) -> Result<ArtifactDownload, SquishError> {
        if !is_plain_file_name(name) {
            return Err(SquishError::NotFound(name.to_string()));
        }
        let path = self.output_dir.join(name);
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if !exists {
            return Err(SquishError::NotFound(name.to_string()));
        }

        let display_name = self.registry.resolve(name);
        let content_disposition = format!(
            "attachment; filename=\"{}\"",
            encode_uri_component(&display_name)
        );
        Ok(ArtifactDownload {
            path,
            display_name,
            content_disposition,
        })
    }
}

/// Rejects anything that could escape the output directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
