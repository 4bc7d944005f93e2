//! Bounded retry around storage operations.
//!
//! Every backend call made by the record store goes through [`with_retry`].
//! A [`RetryBudget`] bounds the work either by attempt count (joins, leaves,
//! autosaves) or by an absolute deadline (shutdown flush). Only transient
//! errors are retried; permanent errors return immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::StorageError;

/// Default number of attempts per storage operation.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Attempt-count retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// How much work a single storage operation may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    /// Retry up to a fixed number of attempts.
    Attempts(RetryPolicy),
    /// Retry until an absolute deadline passes.
    Deadline {
        /// No attempt starts or continues past this instant.
        deadline: Instant,
        /// Pause between consecutive attempts.
        delay: Duration,
    },
}

impl From<RetryPolicy> for RetryBudget {
    fn from(policy: RetryPolicy) -> Self {
        Self::Attempts(policy)
    }
}

/// Run `op` under `budget`, retrying transient failures.
///
/// `op_name` and `key` are only used for log fields. Returns the first
/// success, the first permanent error, or the last transient error once the
/// budget is spent.
pub async fn with_retry<T, F, Fut>(
    budget: RetryBudget,
    op_name: &str,
    key: &str,
    mut op: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);

        let result = match budget {
            RetryBudget::Attempts(_) => op().await,
            RetryBudget::Deadline { deadline, .. } => {
                let started = Instant::now();
                match tokio::time::timeout_at(deadline, op()).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(StorageError::Timeout {
                        elapsed_ms: u64::try_from(started.elapsed().as_millis())
                            .unwrap_or(u64::MAX),
                    }),
                }
            }
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            tracing::error!(op = op_name, key, attempt, error = %err, "Permanent storage error");
            return Err(err);
        }

        let delay = match budget {
            RetryBudget::Attempts(policy) => {
                if attempt >= policy.attempts.max(1) {
                    tracing::warn!(op = op_name, key, attempt, error = %err, "Retries exhausted");
                    return Err(err);
                }
                policy.delay
            }
            RetryBudget::Deadline { deadline, delay } => {
                if Instant::now().checked_add(delay).is_none_or(|next| next >= deadline) {
                    tracing::warn!(op = op_name, key, attempt, error = %err, "Deadline reached");
                    return Err(err);
                }
                delay
            }
        };

        tracing::warn!(
            op = op_name,
            key,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Transient storage error, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
