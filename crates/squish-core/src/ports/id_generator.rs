//! IdGenerator port - ID と artifact 名の生成
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::artifact::ArtifactName;
use crate::domain::ids::{BatchId, UploadId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_batch_id(&self) -> BatchId;

    fn generate_upload_id(&self) -> UploadId;

    /// Storage name for the `index`-th item of a batch.
    fn artifact_name(&self, index: usize, extension: &str) -> ArtifactName;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock の現在時刻を timestamp 部分に使うので、FixedClock を渡すと
/// timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_batch_id(&self) -> BatchId {
        BatchId::from(self.next_ulid())
    }

    fn generate_upload_id(&self) -> UploadId {
        UploadId::from(self.next_ulid())
    }

    fn artifact_name(&self, index: usize, extension: &str) -> ArtifactName {
        ArtifactName::new(format!("compressed_{}_{index}.{extension}", self.next_ulid()))
    }
}
