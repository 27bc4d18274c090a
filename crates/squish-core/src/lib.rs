//! squish-core
//!
//! Ephemeral image compression: uploads are transformed into small
//! artifacts that live for a short retention window and are then removed.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, input, artifact, report, events, errors）
//! - **ports**: 抽象化レイヤー（Codec, EventSink, FileRemover, Sleeper, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, orchestrator, worker, deleter, registry, expiry）
//! - **impls**: 実装（ImageCodec, BroadcastEventSink, tokio fs）
//! - **config**: figment による設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
