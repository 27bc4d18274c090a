//! ExpiryScheduler - 保持期間が過ぎた artifact の削除
//!
//! artifact ごとに one-shot のタイマーを張り、期限が来たら
//! ファイル削除 → registry から evict の順に実行します。
//! タイマーは生成名で管理しているので個別に cancel できます。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::deleter::RetrySafeDeleter;
use super::registry::ArtifactRegistry;
use crate::domain::artifact::ArtifactName;
use crate::ports::Sleeper;

struct PendingExpiry {
    generation: u64,
    handle: JoinHandle<()>,
}

type PendingMap = HashMap<ArtifactName, PendingExpiry>;

pub struct ExpiryScheduler {
    deleter: Arc<RetrySafeDeleter>,
    registry: Arc<ArtifactRegistry>,
    sleeper: Arc<dyn Sleeper>,
    pending: Arc<Mutex<PendingMap>>,
    generation: AtomicU64,
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExpiryScheduler {
    pub fn new(
        deleter: Arc<RetrySafeDeleter>,
        registry: Arc<ArtifactRegistry>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            deleter,
            registry,
            sleeper,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// After `window`, delete `path` and evict `name`. Fires exactly once.
    ///
    /// Arming a name that is already armed replaces the earlier timer.
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, name: ArtifactName, path: PathBuf, window: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let deleter = Arc::clone(&self.deleter);
        let registry = Arc::clone(&self.registry);
        let sleeper = Arc::clone(&self.sleeper);
        let pending = Arc::clone(&self.pending);
        let task_name = name.clone();

        // spawn と insert の間にタスクが自分を外そうとしても、ロックで順序が保たれる
        let mut guard = lock(&self.pending);
        let handle = tokio::spawn(async move {
            sleeper.sleep(window).await;
            {
                // ここから先は cancel できない
                let mut pending = lock(&pending);
                if pending
                    .get(&task_name)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    pending.remove(&task_name);
                }
            }
            let outcome = deleter.delete(&path).await;
            registry.evict(task_name.as_str());
            debug!(
                artifact = %task_name,
                clean = outcome.is_clean(),
                "artifact expired"
            );
        });
        if let Some(previous) = guard.insert(name, PendingExpiry { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Abort a pending timer. The file and registry entry stay in place.
    pub fn cancel(&self, name: &str) -> bool {
        match lock(&self.pending).remove(name) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, name: &str) -> bool {
        lock(&self.pending).contains_key(name)
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}
