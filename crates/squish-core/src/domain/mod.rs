//! Domain model (入力・成果物・イベント・エラー).

pub mod artifact;
pub mod errors;
pub mod events;
pub mod ids;
pub mod input;
pub mod report;

pub use self::artifact::{ArtifactName, ArtifactRecord};
pub use self::errors::SquishError;
pub use self::events::{BatchCompleted, DomainEvent, ImageCompressed};
pub use self::ids::{BatchId, UploadId};
pub use self::input::InputItem;
pub use self::report::SizeReport;
