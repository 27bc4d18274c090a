//! Retry-safe file deleter.
//!
//! 削除の再試行を明示的な状態機械（`DeletionAttempts`）として表現し、
//! `Sleeper` で非ブロッキングに待機します。削除は best-effort で、
//! 失敗してもログに残すだけで呼び出し元へは返しません。

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::retry::RetryPolicy;
use crate::domain::errors::SquishError;
use crate::ports::{FileRemover, Sleeper};

/// Terminal result of one deletion.
#[derive(Debug)]
pub enum DeletionOutcome {
    Removed { attempts: u32 },
    /// The file was not there (someone else removed it first).
    AlreadyGone { attempts: u32 },
    /// Failed for a non-busy reason; not retried.
    Abandoned { attempts: u32, error: io::Error },
    /// Still busy after the last allowed attempt.
    Exhausted { attempts: u32, error: io::Error },
}

impl DeletionOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DeletionOutcome::Removed { attempts }
            | DeletionOutcome::AlreadyGone { attempts }
            | DeletionOutcome::Abandoned { attempts, .. }
            | DeletionOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The file is no longer on storage.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            DeletionOutcome::Removed { .. } | DeletionOutcome::AlreadyGone { .. }
        )
    }

    pub fn into_error(self, path: &Path) -> Option<SquishError> {
        match self {
            DeletionOutcome::Removed { .. } | DeletionOutcome::AlreadyGone { .. } => None,
            DeletionOutcome::Abandoned { attempts, error }
            | DeletionOutcome::Exhausted { attempts, error } => Some(SquishError::DeletionFailed {
                path: path.to_path_buf(),
                attempts,
                source: error,
            }),
        }
    }
}

/// What the driver should do after feeding an attempt result.
#[derive(Debug)]
pub enum DeletionStep {
    RetryAfter(Duration),
    Finished(DeletionOutcome),
}

/// State machine over removal attempts: attempt count, next delay, terminal outcome.
#[derive(Debug, Clone)]
pub struct DeletionAttempts {
    policy: RetryPolicy,
    attempts: u32,
}

impl DeletionAttempts {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record the result of one removal attempt.
    pub fn observe(&mut self, result: io::Result<()>) -> DeletionStep {
        self.attempts += 1;
        let attempts = self.attempts;
        match result {
            Ok(()) => DeletionStep::Finished(DeletionOutcome::Removed { attempts }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                DeletionStep::Finished(DeletionOutcome::AlreadyGone { attempts })
            }
            Err(error) if is_busy(&error) => {
                if attempts >= self.policy.max_attempts {
                    DeletionStep::Finished(DeletionOutcome::Exhausted { attempts, error })
                } else {
                    DeletionStep::RetryAfter(self.policy.next_delay(attempts))
                }
            }
            Err(error) => DeletionStep::Finished(DeletionOutcome::Abandoned { attempts, error }),
        }
    }
}

/// Whether the error means "another handle holds this file".
pub fn is_busy(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::ResourceBusy {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(error.raw_os_error(), Some(32) | Some(33))
}

/// Removes files, retrying with backoff while they are busy.
///
/// 呼び出しごとの状態しか持たないので、別パスへの並行呼び出しは安全です。
pub struct RetrySafeDeleter {
    remover: Arc<dyn FileRemover>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RetrySafeDeleter {
    pub fn new(remover: Arc<dyn FileRemover>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            remover,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delete `path`. Failures are logged, never returned as errors.
    pub async fn delete(&self, path: &Path) -> DeletionOutcome {
        let mut machine = DeletionAttempts::new(self.policy.clone());
        loop {
            let result = self.remover.remove(path).await;
            match machine.observe(result) {
                DeletionStep::RetryAfter(delay) => {
                    warn!(
                        path = %path.display(),
                        attempt = machine.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "file busy, retrying deletion"
                    );
                    self.sleeper.sleep(delay).await;
                }
                DeletionStep::Finished(outcome) => {
                    log_outcome(path, &outcome);
                    return outcome;
                }
            }
        }
    }
}

fn log_outcome(path: &Path, outcome: &DeletionOutcome) {
    match outcome {
        DeletionOutcome::Removed { attempts } => {
            info!(path = %path.display(), attempts, "deleted file");
        }
        DeletionOutcome::AlreadyGone { attempts } => {
            debug!(path = %path.display(), attempts, "file already gone");
        }
        DeletionOutcome::Abandoned { attempts, error } => {
            error!(path = %path.display(), attempts, %error, "error deleting file");
        }
        DeletionOutcome::Exhausted { attempts, error } => {
            error!(path = %path.display(), attempts, %error, "failed to delete file after retries");
        }
    }
}
