//! BatchOrchestrator - バッチの受付と並行処理
//!
//! # フロー
//! 1. `submit()` が同期的にバリデーションし、受付 receipt を返す
//! 2. バッチごとの supervisor タスクが `JoinSet` でアイテムを並行実行
//! 3. 各アイテム: 生成名の予約 → transform → registry 登録 → 元ファイル削除 → expiry → イベント
//! 4. 解決済みカウンタが N に達したら `allImagesCompressed` を 1 回だけ publish
//!
//! アイテムの完了順は入力順と一致しないので、「最後の index か」ではなく
//! カウンタで完了を判定します。

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{error, info, warn};

use super::deleter::{DeletionOutcome, RetrySafeDeleter};
use super::expiry::ExpiryScheduler;
use super::registry::ArtifactRegistry;
use super::worker::TransformWorker;
use crate::domain::artifact::{ArtifactName, ArtifactRecord};
use crate::domain::errors::SquishError;
use crate::domain::events::{BatchCompleted, DomainEvent, ImageCompressed};
use crate::domain::ids::BatchId;
use crate::domain::input::InputItem;
use crate::ports::{Clock, EventSink, IdGenerator};

/// Resolution of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed,
}

/// Final tally of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Counts resolved items; reports completion exactly once.
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    succeeded: usize,
    failed: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn resolved(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Returns true only for the resolution that brings the count to `total`.
    pub fn record(&mut self, outcome: ItemOutcome) -> bool {
        if self.resolved() >= self.total {
            return false;
        }
        match outcome {
            ItemOutcome::Succeeded => self.succeeded += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
        self.resolved() == self.total
    }

    fn summary(&self, batch_id: BatchId) -> BatchSummary {
        BatchSummary {
            batch_id,
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

/// Handle to a running batch. Dropping it does not cancel the batch.
pub struct BatchHandle {
    join: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Wait until every item has resolved and the sources of successful
    /// items have been cleaned up.
    pub async fn wait(self) -> Result<BatchSummary, JoinError> {
        self.join.await
    }
}

/// "Accepted" acknowledgment returned by `submit`.
pub struct BatchReceipt {
    pub batch_id: BatchId,
    pub accepted: usize,
    pub handle: BatchHandle,
}

/// Everything a single item needs; shared by all items of all batches.
pub(crate) struct ItemPipeline {
    pub(crate) worker: TransformWorker,
    pub(crate) deleter: Arc<RetrySafeDeleter>,
    pub(crate) registry: Arc<ArtifactRegistry>,
    pub(crate) expiry: Arc<ExpiryScheduler>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retention: Duration,
    pub(crate) output_dir: PathBuf,
    pub(crate) public_base_url: String,
}

impl ItemPipeline {
    fn retrieval_ref(&self, name: &ArtifactName) -> String {
        format!("{}/download/{}", self.public_base_url.trim_end_matches('/'), name)
    }

    fn expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|window| created_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn process(&self, batch_id: BatchId, index: usize, item: InputItem) -> ItemResolution {
        let name = self
            .ids
            .artifact_name(index, self.worker.params().format.extension());
        let dest = self.output_dir.join(name.as_str());

        // 生成名の予約。既存の artifact を上書きしない
        if let Err(err) = claim_destination(&dest).await {
            if err.kind() == io::ErrorKind::AlreadyExists {
                error!(%batch_id, index, artifact = %name, "artifact name already taken");
            } else {
                warn!(%batch_id, index, artifact = %name, error = %err, "cannot create artifact");
            }
            return ItemResolution::failed();
        }

        let sizes = match self.worker.run(&item, &dest).await {
            Ok(sizes) => sizes,
            Err(err) => {
                warn!(%batch_id, index, error = %err, "error compressing image");
                return ItemResolution::failed();
            }
        };

        let created_at = self.clock.now();
        let record = ArtifactRecord::new(
            item.original_name(),
            sizes.compressed_bytes,
            created_at,
            self.expires_at(created_at),
        );
        if let Err(err) = self.registry.register(name.clone(), record) {
            error!(%batch_id, index, artifact = %name, error = %err, "artifact registration failed");
            self.deleter.delete(&dest).await;
            return ItemResolution::failed();
        }

        // 元ファイルの削除は best-effort。busy リトライでイベントを遅らせない
        let deleter = Arc::clone(&self.deleter);
        let source = item.path().to_path_buf();
        let cleanup = tokio::spawn(async move { deleter.delete(&source).await });

        self.expiry.arm(name.clone(), dest, self.retention);

        let event = ImageCompressed::new(
            batch_id,
            name.clone(),
            item.original_name(),
            &sizes,
            self.retrieval_ref(&name),
        );
        info!(
            %batch_id,
            index,
            artifact = %name,
            reduction_percent = event.reduction_percent,
            "image compressed"
        );
        self.sink.publish(DomainEvent::ImageCompressed(event));
        ItemResolution {
            outcome: ItemOutcome::Succeeded,
            cleanup: Some(cleanup),
        }
    }
}

/// Outcome of one item plus its pending source cleanup.
struct ItemResolution {
    outcome: ItemOutcome,
    cleanup: Option<JoinHandle<DeletionOutcome>>,
}

impl ItemResolution {
    fn failed() -> Self {
        Self {
            outcome: ItemOutcome::Failed,
            cleanup: None,
        }
    }
}

/// Create `dest` only if nothing is there yet.
async fn claim_destination(dest: &Path) -> io::Result<()> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
        .map(drop)
}

pub struct BatchOrchestrator {
    pipeline: Arc<ItemPipeline>,
    max_batch_size: usize,
}

impl BatchOrchestrator {
    pub(crate) fn new(pipeline: ItemPipeline, max_batch_size: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_batch_size,
        }
    }

    /// Check a batch without scheduling anything.
    pub fn validate(&self, items: &[InputItem]) -> Result<(), SquishError> {
        if items.is_empty() {
            return Err(SquishError::Validation("no images uploaded".into()));
        }
        if items.len() > self.max_batch_size {
            return Err(SquishError::Validation(format!(
                "batch of {} exceeds the limit of {}",
                items.len(),
                self.max_batch_size
            )));
        }
        if let Some(index) = items
            .iter()
            .position(|item| item.original_name().trim().is_empty())
        {
            return Err(SquishError::Validation(format!(
                "item {index} has no original file name"
            )));
        }
        Ok(())
    }

    /// Accept a batch and process it in the background.
    ///
    /// Returns as soon as the batch is accepted. Must be called from within
    /// a tokio runtime.
    pub fn submit(&self, items: Vec<InputItem>) -> Result<BatchReceipt, SquishError> {
        self.validate(&items)?;

        let batch_id = self.pipeline.ids.generate_batch_id();
        let accepted = items.len();
        info!(%batch_id, items = accepted, "batch accepted");

        let pipeline = Arc::clone(&self.pipeline);
        let join = tokio::spawn(supervise(pipeline, batch_id, items));

        Ok(BatchReceipt {
            batch_id,
            accepted,
            handle: BatchHandle { join },
        })
    }
}

async fn supervise(pipeline: Arc<ItemPipeline>, batch_id: BatchId, items: Vec<InputItem>) -> BatchSummary {
    let mut progress = BatchProgress::new(items.len());
    let mut tasks = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move { pipeline.process(batch_id, index, item).await });
    }

    let mut cleanups = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let resolution = joined.unwrap_or_else(|err| {
            error!(%batch_id, error = %err, "item task aborted");
            ItemResolution::failed()
        });
        cleanups.extend(resolution.cleanup);
        if progress.record(resolution.outcome) {
            let summary = progress.summary(batch_id);
            info!(
                %batch_id,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "all images compressed"
            );
            pipeline
                .sink
                .publish(DomainEvent::AllImagesCompressed(BatchCompleted {
                    batch_id,
                    succeeded: summary.succeeded,
                    failed: summary.failed,
                }));
        }
    }

    // 完了イベントの後で、元ファイルの削除が終わるのを待つ
    for cleanup in cleanups {
        if let Err(err) = cleanup.await {
            error!(%batch_id, error = %err, "source cleanup task aborted");
        }
    }

    progress.summary(batch_id)
}
