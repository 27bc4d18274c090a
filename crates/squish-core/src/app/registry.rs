//! ArtifactRegistry - 生成名 → 元ファイル名 の対応表
//!
//! エントリは 1 回だけ登録され、ExpiryScheduler によって 1 回だけ削除されます。
//! 単一の Mutex で守り、ロックを `.await` 越しに保持しません。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::artifact::{ArtifactName, ArtifactRecord};
use crate::domain::errors::SquishError;

#[derive(Default)]
pub struct ArtifactRegistry {
    entries: Mutex<HashMap<ArtifactName, ArtifactRecord>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ArtifactName, ArtifactRecord>> {
        // 書き込み途中で panic しても HashMap 自体は壊れないので継続する
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new entry. An existing entry is left untouched.
    pub fn register(&self, name: ArtifactName, record: ArtifactRecord) -> Result<(), SquishError> {
        let mut entries = self.entries();
        if entries.contains_key(&name) {
            return Err(SquishError::DuplicateArtifact(name));
        }
        entries.insert(name, record);
        Ok(())
    }

    /// Display name for `name`, falling back to the generated name itself.
    pub fn resolve(&self, name: &str) -> String {
        self.entries()
            .get(name)
            .map(|record| record.original_name.clone())
            .unwrap_or_else(|| name.to_string())
    }

    pub fn get(&self, name: &str) -> Option<ArtifactRecord> {
        self.entries().get(name).cloned()
    }

    /// Remove the entry. Evicting an absent name is a no-op.
    pub fn evict(&self, name: &str) -> Option<ArtifactRecord> {
        self.entries().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn record(original: &str) -> ArtifactRecord {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        ArtifactRecord::new(original, 100, created, created + chrono::Duration::seconds(50))
    }

    #[test]
    fn register_then_resolve() {
        let registry = ArtifactRegistry::new();
        registry
            .register(ArtifactName::new("compressed_a_0.webp"), record("cat.png"))
            .unwrap();

        assert_eq!(registry.resolve("compressed_a_0.webp"), "cat.png");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("compressed_a_0.webp"));
    }

    #[test]
    fn resolve_falls_back_to_generated_name() {
        let registry = ArtifactRegistry::new();
        assert_eq!(registry.resolve("compressed_x_3.webp"), "compressed_x_3.webp");

        registry
            .register(ArtifactName::new("compressed_x_3.webp"), record("dog.jpg"))
            .unwrap();
        registry.evict("compressed_x_3.webp");
        assert_eq!(registry.resolve("compressed_x_3.webp"), "compressed_x_3.webp");
    }

    #[test]
    fn duplicate_register_keeps_the_first_entry() {
        let registry = ArtifactRegistry::new();
        let name = ArtifactName::new("compressed_a_0.webp");
        registry.register(name.clone(), record("first.png")).unwrap();

        let err = registry.register(name.clone(), record("second.png")).unwrap_err();
        assert!(matches!(err, SquishError::DuplicateArtifact(n) if n == name));
        assert_eq!(registry.resolve(name.as_str()), "first.png");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn evict_is_idempotent() {
        let registry = ArtifactRegistry::new();
        registry
            .register(ArtifactName::new("a.webp"), record("a.png"))
            .unwrap();

        assert!(registry.evict("a.webp").is_some());
        assert!(registry.evict("a.webp").is_none());
        assert!(registry.evict("never.webp").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_registration_loses_no_entries() {
        let registry = Arc::new(ArtifactRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let name = ArtifactName::new(format!("compressed_{t}_{i}.webp"));
                        registry.register(name, record("x.png")).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.len(), 8 * 250);
        assert_eq!(registry.resolve("compressed_7_249.webp"), "x.png");
    }
}
