//! Retry wrapper for DDL blocks
//!
//! Every block gets a fixed attempt budget and a shared deadline. Failures are
//! retried regardless of their class; only the log records what went wrong.

use sea_orm_migration::prelude::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{error, info, warn};

use crate::error::MigrationError;

/// Attempt budget, backoff base and deadline for one block
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub deadline: Duration,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(5),
            deadline: Duration::from_secs(90 * 60),
        }
    }

    pub fn with_config(max_attempts: u32, base_delay: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            deadline,
        }
    }

    /// Backoff after the zero-based `attempt`: `base * 2^attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `operation` until it succeeds, the attempt budget is spent or the deadline passes.
///
/// `operation` receives the time left before the deadline so it can pass it on to
/// the server. The attempt in flight when the deadline expires is dropped.
/// `query` is only used for the operational log.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    query: &str,
    mut operation: F,
) -> Result<T, MigrationError>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let deadline = Instant::now() + policy.deadline;

    for attempt in 0..policy.max_attempts {
        let now = Instant::now();
        if now >= deadline {
            error!("{} exceeded its deadline of {:?}. Query: {}", label, policy.deadline, query);
            return Err(MigrationError::DeadlineExceeded {
                label: label.to_string(),
                deadline: policy.deadline,
            });
        }

        match timeout_at(deadline, operation(deadline - now)).await {
            Ok(Ok(result)) => {
                if attempt > 0 {
                    info!("{} succeeded after {} retries", label, attempt);
                }
                return Ok(result);
            }
            Ok(Err(e)) => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    label,
                    attempt + 1,
                    policy.max_attempts,
                    MigrationError::classify(&e)
                );
            }
            Err(_) => {
                error!(
                    "{} cancelled at its deadline of {:?} (attempt {}/{}). Query: {}",
                    label,
                    policy.deadline,
                    attempt + 1,
                    policy.max_attempts,
                    query
                );
                return Err(MigrationError::DeadlineExceeded {
                    label: label.to_string(),
                    deadline: policy.deadline,
                });
            }
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay(attempt);
            info!("Retrying {} in {:?}", label, delay);
            sleep(delay).await;
        }
    }

    error!(
        "{} failed after {} attempts. Query: {}",
        label, policy.max_attempts, query
    );
    Err(MigrationError::RetryExhausted {
        label: label.to_string(),
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure() -> DbErr {
        DbErr::Custom("deadlock detected".to_string())
    }

    #[test]
    fn backoff_doubles_from_five_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..10).map(|i| policy.delay(i).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560]);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_fourth_attempt_after_backoff() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result = execute_with_retry(&RetryPolicy::default(), "block", "SELECT 1", |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(failure())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_secs(5 + 10 + 20));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_ten_attempts() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> =
            execute_with_retry(&RetryPolicy::default(), "block", "SELECT 1", |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(failure()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(MigrationError::RetryExhausted { attempts: 10, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_deadline_between_attempts() {
        let policy =
            RetryPolicy::with_config(10, Duration::from_secs(5), Duration::from_secs(60));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = execute_with_retry(&policy, "block", "SELECT 1", |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(failure()) }
        })
        .await;

        assert!(matches!(
            result,
            Err(MigrationError::DeadlineExceeded { .. })
        ));
        // attempts at t = 0, 5, 15, 35; the next backoff ends past 60s
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancels_attempt_still_running_at_deadline() {
        let policy =
            RetryPolicy::with_config(10, Duration::from_secs(5), Duration::from_secs(60));

        let result: Result<(), _> = execute_with_retry(&policy, "block", "SELECT 1", |_| {
            std::future::pending::<Result<(), DbErr>>()
        })
        .await;

        assert!(matches!(
            result,
            Err(MigrationError::DeadlineExceeded { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn passes_remaining_time_to_operation() {
        let policy = RetryPolicy::default();

        let remaining = execute_with_retry(&policy, "block", "SELECT 1", |left| async move {
            Ok::<_, DbErr>(left)
        })
        .await
        .unwrap();

        assert!(remaining <= policy.deadline);
        assert!(remaining > Duration::from_secs(89 * 60));
    }
}
