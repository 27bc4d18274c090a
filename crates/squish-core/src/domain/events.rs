//! Events - ドメインイベント
//!
//! EventSink に publish されるイベントです。イベント名と payload の形は
//! リアルタイム配信側（socket など）がそのまま転送できる形にしています。

use serde::Serialize;

use super::artifact::ArtifactName;
use super::ids::BatchId;
use super::report::SizeReport;

/// Per-item completion payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageCompressed {
    #[serde(rename = "originalName")]
    pub original_name: String,
    #[serde(rename = "originalSizeKB")]
    pub original_size_kb: f64,
    #[serde(rename = "compressedSizeKB")]
    pub compressed_size_kb: f64,
    #[serde(rename = "reductionPercent")]
    pub reduction_percent: f64,
    #[serde(rename = "retrievalRef")]
    pub retrieval_ref: String,
    #[serde(skip)]
    pub batch_id: BatchId,
    #[serde(skip)]
    pub artifact: ArtifactName,
}

impl ImageCompressed {
    pub fn new(
        batch_id: BatchId,
        artifact: ArtifactName,
        original_name: impl Into<String>,
        sizes: &SizeReport,
        retrieval_ref: impl Into<String>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            original_size_kb: sizes.original_kb(),
            compressed_size_kb: sizes.compressed_kb(),
            reduction_percent: sizes.reduction_percent(),
            retrieval_ref: retrieval_ref.into(),
            batch_id,
            artifact,
        }
    }
}

/// Emitted once every item of a batch has resolved.
///
/// counts は診断用で、配信 payload には含めない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCompleted {
    pub batch_id: BatchId,
    pub succeeded: usize,
    pub failed: usize,
}

/// DomainEvent はドメインで発生したイベント
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    ImageCompressed(ImageCompressed),
    AllImagesCompressed(BatchCompleted),
}

impl DomainEvent {
    pub const IMAGE_COMPRESSED: &'static str = "imageCompressed";
    pub const ALL_IMAGES_COMPRESSED: &'static str = "allImagesCompressed";

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ImageCompressed(_) => Self::IMAGE_COMPRESSED,
            DomainEvent::AllImagesCompressed(_) => Self::ALL_IMAGES_COMPRESSED,
        }
    }

    /// Wire payload of the event. Batch completion carries none.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            DomainEvent::ImageCompressed(item) => {
                serde_json::to_value(item).unwrap_or(serde_json::Value::Null)
            }
            DomainEvent::AllImagesCompressed(_) => serde_json::Value::Null,
        }
    }

    pub fn batch_id(&self) -> BatchId {
        match self {
            DomainEvent::ImageCompressed(item) => item.batch_id,
            DomainEvent::AllImagesCompressed(done) => done.batch_id,
        }
    }
}
