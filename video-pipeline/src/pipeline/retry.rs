use std::{
    future::Future,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use common::error::AppError;
use tokio_retry::{strategy::FixedInterval, RetryIf};

use super::config::PipelineTuning;

/// Fixed-delay retry budget shared by every stage operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_tuning(&PipelineTuning::default())
    }
}

impl RetryPolicy {
    pub fn from_tuning(tuning: &PipelineTuning) -> Self {
        Self {
            max_attempts: tuning.max_attempts.max(1),
            delay: tuning.retry_delay,
            attempt_timeout: tuning.attempt_timeout,
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error, or
    /// the attempt budget is spent.
    ///
    /// `on_retry` fires with the 1-based attempt number after every transient
    /// failure that will be followed by another attempt.
    pub async fn run<T, Op, Fut, N>(&self, mut operation: Op, on_retry: N) -> Result<T, AppError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
        N: Fn(u32, &AppError),
    {
        let max_attempts = self.max_attempts.max(1);
        let attempt_timeout = self.attempt_timeout;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let on_retry = &on_retry;

        let strategy = FixedInterval::new(self.delay).take(max_attempts.saturating_sub(1) as usize);

        RetryIf::spawn(
            strategy,
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                let fut = operation();
                async move {
                    let result = match attempt_timeout {
                        Some(limit) => tokio::time::timeout(limit, fut)
                            .await
                            .unwrap_or_else(|_| Err(AppError::Timeout(limit))),
                        None => fut.await,
                    };
                    if let Err(err) = &result {
                        if err.is_transient() && attempt < max_attempts {
                            on_retry(attempt, err);
                        }
                    }
                    result
                }
            },
            |err: &AppError| err.is_transient(),
        )
        .await
    }
}
