//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **BatchOrchestrator**: バッチの受付、並行変換、完了通知
//! - **TransformWorker**: 1 ファイル分の変換とサイズ計測
//! - **RetrySafeDeleter**: busy 時に backoff で再試行する削除
//! - **ArtifactRegistry**: artifact 名 → 元ファイル名
//! - **ExpiryScheduler**: retention window 経過後の削除
//! - **ArtifactLocator**: download 用の解決

pub mod builder;
pub mod deleter;
pub mod expiry;
pub mod orchestrator;
pub mod registry;
pub mod retrieval;
pub mod retry;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder};
pub use self::deleter::{DeletionOutcome, RetrySafeDeleter};
pub use self::expiry::ExpiryScheduler;
pub use self::orchestrator::{BatchHandle, BatchOrchestrator, BatchReceipt, BatchSummary};
pub use self::registry::ArtifactRegistry;
pub use self::retrieval::{ArtifactDownload, ArtifactLocator};
pub use self::retry::RetryPolicy;
pub use self::worker::TransformWorker;
