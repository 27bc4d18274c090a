//! Artifact - 変換後のファイルとそのメタ情報

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Generated storage name of a derived artifact.
///
/// 形式: `compressed_<ULID>_<index>.<ext>`。ULID の timestamp 部分と
/// バッチ内の index を組み合わせて衝突を避けます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// HashMap<ArtifactName, _> を &str で引くため
impl Borrow<str> for ArtifactName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registry entry for a live artifact. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub original_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(
        original_name: impl Into<String>,
        size_bytes: u64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            size_bytes,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_expires_at_its_deadline() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let expires = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 50).unwrap();
        let record = ArtifactRecord::new("cat.png", 10, created, expires);

        assert!(!record.is_expired_at(created));
        assert!(record.is_expired_at(expires));
    }

    #[test]
    fn name_serializes_as_plain_string() {
        let name = ArtifactName::new("compressed_01J_0.webp");
        assert_eq!(
            serde_json::to_value(&name).unwrap(),
            serde_json::json!("compressed_01J_0.webp")
        );
    }
}
