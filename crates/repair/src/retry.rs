//! Exponential-backoff retry for flaky repair invocations.
//!
//! Useful when connectivity between datacenters is unreliable: every
//! failed `repair` call can be retried with multiplicatively growing
//! sleeps. The cap applies to each individual sleep only; the nominal
//! sleep keeps growing across attempts, so once the cap is hit every
//! following sleep is exactly the cap.

use std::future::Future;

use async_trait::async_trait;

/// Immutable retry parameters.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_tries: u32,
    /// Seconds to sleep after the first failure.
    pub initial_sleep: f64,
    /// Multiplier applied to the nominal sleep after each failure.
    pub sleep_factor: f64,
    /// Per-sleep cap in seconds; zero or negative disables capping.
    pub max_sleep: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_tries: 1,
            initial_sleep: 1.0,
            sleep_factor: 2.0,
            max_sleep: 1800.0,
        }
    }
}

/// Sleeping seam, injected so tests can record sleeps instead of waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, seconds: f64);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, seconds: f64) {
        tokio::time::sleep(std::time::Duration::from_secs_f64(seconds)).await;
    }
}

/// Retries an operation until it succeeds or attempts are exhausted.
pub struct ExponentialBackoffRetryer<S = TokioSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl ExponentialBackoffRetryer<TokioSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        ExponentialBackoffRetryer {
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl<S: Sleeper> ExponentialBackoffRetryer<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        ExponentialBackoffRetryer { policy, sleeper }
    }

    /// Invokes `execute` until `succeeded` accepts its result or
    /// `max_tries` attempts have been made; returns the last result
    /// either way.
    pub async fn run<T, F, Fut, P>(&self, mut execute: F, succeeded: P) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        P: Fn(&T) -> bool,
    {
        let mut next_sleep = self.policy.initial_sleep;
        let mut attempt = 1u32;
        loop {
            let result = execute().await;
            if succeeded(&result) {
                return result;
            }
            tracing::warn!(attempt, max_tries = self.policy.max_tries, "execution failed");
            if attempt >= self.policy.max_tries {
                tracing::warn!("giving up execution, failed too many times");
                return result;
            }
            let seconds = if self.policy.max_sleep > 0.0 {
                next_sleep.min(self.policy.max_sleep)
            } else {
                next_sleep
            };
            tracing::info!(seconds, "sleeping until retrying again");
            self.sleeper.sleep(seconds).await;
            next_sleep *= self.policy.sleep_factor;
            attempt += 1;
        }
    }
}
