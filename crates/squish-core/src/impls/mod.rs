//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ImageCodec**: `image` クレートによる変換
//! - **BroadcastEventSink**: リアルタイム配信（tokio broadcast）
//! - **MemoryEventSink**: テスト・診断用
//! - **TokioFileRemover / TokioSleeper**: tokio の fs / timer

pub mod broadcast_sink;
pub mod image_codec;
pub mod memory_sink;
pub mod tokio_fs;

pub use self::broadcast_sink::BroadcastEventSink;
pub use self::image_codec::ImageCodec;
pub use self::memory_sink::MemoryEventSink;
pub use self::tokio_fs::{TokioFileRemover, TokioSleeper};
