//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! ports の実装を差し替えられる Builder です。`build()` で設定を検証し
//! （Fail-fast）、ストレージのディレクトリを作成します。

use std::sync::Arc;

use tokio::sync::broadcast;

use super::deleter::RetrySafeDeleter;
use super::expiry::ExpiryScheduler;
use super::orchestrator::{BatchOrchestrator, ItemPipeline};
use super::registry::ArtifactRegistry;
use super::retrieval::ArtifactLocator;
use super::worker::TransformWorker;
use crate::config::SquishConfig;
use crate::domain::errors::SquishError;
use crate::domain::events::DomainEvent;
use crate::impls::{BroadcastEventSink, ImageCodec, TokioFileRemover, TokioSleeper};
use crate::ports::{
    Clock, Codec, EventSink, FanoutEventSink, FileRemover, IdGenerator, Sleeper, SystemClock,
    UlidGenerator,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(SquishConfig::load()?)
///     .with_event_sink(Arc::new(MySocketSink::new()))
///     .build()
///     .await?;
/// let mut events = app.subscribe();
/// app.orchestrator().submit(items)?;
/// ```
pub struct AppBuilder {
    config: SquishConfig,
    codec: Arc<dyn Codec>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    remover: Arc<dyn FileRemover>,
    extra_sinks: Vec<Arc<dyn EventSink>>,
}

impl AppBuilder {
    pub fn new(config: SquishConfig) -> Self {
        Self {
            config,
            codec: Arc::new(ImageCodec::new()),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            remover: Arc::new(TokioFileRemover),
            extra_sinks: Vec::new(),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_remover(mut self, remover: Arc<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    /// Publish events to `sink` in addition to the built-in broadcast channel.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    pub async fn build(self) -> Result<App, SquishError> {
        let config = self.config;
        config.validate()?;
        tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
        tokio::fs::create_dir_all(&config.storage.output_dir).await?;

        let broadcast = Arc::new(BroadcastEventSink::new(config.batch.event_buffer));
        let mut sinks: Vec<Arc<dyn EventSink>> = vec![broadcast.clone() as Arc<dyn EventSink>];
        sinks.extend(self.extra_sinks);
        let sink: Arc<dyn EventSink> = Arc::new(FanoutEventSink::new(sinks));

        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&self.clock)));
        let registry = Arc::new(ArtifactRegistry::new());
        let deleter = Arc::new(RetrySafeDeleter::new(
            self.remover,
            Arc::clone(&self.sleeper),
            config.deletion.clone(),
        ));
        let expiry = Arc::new(ExpiryScheduler::new(
            Arc::clone(&deleter),
            Arc::clone(&registry),
            self.sleeper,
        ));

        let pipeline = ItemPipeline {
            worker: TransformWorker::new(self.codec, config.transform.clone()),
            deleter,
            registry: Arc::clone(&registry),
            expiry: Arc::clone(&expiry),
            sink,
            ids: Arc::clone(&ids),
            clock: self.clock,
            retention: config.retention.window,
            output_dir: config.storage.output_dir.clone(),
            public_base_url: config.public_base_url.clone(),
        };
        let orchestrator = BatchOrchestrator::new(pipeline, config.batch.max_batch_size);
        let locator = ArtifactLocator::new(config.storage.output_dir.clone(), Arc::clone(&registry));

        Ok(App {
            config,
            orchestrator,
            registry,
            expiry,
            locator,
            ids,
            broadcast,
        })
    }
}

/// App はアプリケーションのランタイム
pub struct App {
    config: SquishConfig,
    orchestrator: BatchOrchestrator,
    registry: Arc<ArtifactRegistry>,
    expiry: Arc<ExpiryScheduler>,
    locator: ArtifactLocator,
    ids: Arc<dyn IdGenerator>,
    broadcast: Arc<BroadcastEventSink>,
}

impl App {
    pub fn config(&self) -> &SquishConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn expiry(&self) -> &ExpiryScheduler {
        &self.expiry
    }

    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Real-time event feed (every event published after this call).
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.broadcast.subscribe()
    }
}
