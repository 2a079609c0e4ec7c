//! Bounded wait for an item to become consistent

use std::time::{Duration, Instant};

use imgserver_core::{AppError, ItemKey, ItemStatus};
use imgserver_db::ItemRepository;

const DEFAULT_MAX_RETRIES: u32 = 10;
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How long to poll for another writer to finish: `max_retries` sleeps of `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl ConsistencyPolicy {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Consistent,
    /// Still `Inconsistent` after the last poll
    TimedOut,
    /// The record disappeared while waiting
    Missing,
}

/// Poll `key` until its status is `Ok`, the record vanishes, or the policy is exhausted.
///
/// A timeout is not an error: callers proceed optimistically, so it is only logged.
pub async fn wait_for_status_ok(
    repository: &dyn ItemRepository,
    key: &ItemKey,
    policy: &ConsistencyPolicy,
) -> Result<WaitOutcome, AppError> {
    let started = Instant::now();
    let mut status = repository.find_status(key).await?;
    let mut attempts = 0;

    while attempts < policy.max_retries && status == Some(ItemStatus::Inconsistent) {
        tokio::time::sleep(policy.interval).await;
        status = repository.find_status(key).await?;
        attempts += 1;
    }

    let outcome = match status {
        Some(ItemStatus::Ok) => WaitOutcome::Consistent,
        Some(ItemStatus::Inconsistent) => WaitOutcome::TimedOut,
        None => WaitOutcome::Missing,
    };

    if outcome == WaitOutcome::TimedOut {
        tracing::warn!(
            item = %key,
            attempts,
            waited_ms = started.elapsed().as_millis() as u64,
            "Item still inconsistent after waiting, proceeding optimistically"
        );
    } else if attempts > 0 {
        tracing::debug!(item = %key, attempts, outcome = ?outcome, "Finished waiting for item");
    }

    Ok(outcome)
}
