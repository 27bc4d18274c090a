//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 画像 codec、イベント配信、ファイルシステム、時刻は外部の協力者で、
//! コアはこれらの trait 越しにしか触りません。

pub mod clock;
pub mod codec;
pub mod event_sink;
pub mod id_generator;
pub mod storage;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::codec::{Codec, CodecError, OutputFormat, TransformParams};
pub use self::event_sink::{EventSink, FanoutEventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::storage::{FileRemover, Sleeper};
