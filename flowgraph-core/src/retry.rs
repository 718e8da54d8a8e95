use crate::error::GraphError;
use anyhow::Result;
use flowgraph_context::NodeContext;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// How the wait between two execute attempts grows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Same wait before every retry.
    #[default]
    Fixed,
    /// Wait grows by `increment_ms` per failed attempt.
    Linear { increment_ms: u64 },
    /// Wait is multiplied by `multiplier` per failed attempt.
    Exponential { multiplier: f64 },
}

/// Retry settings of a node's execute phase.
///
/// `max_attempts` counts the first attempt, so `1` means no retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    max_attempts: usize,
    #[serde(rename = "wait_ms", with = "millis", default)]
    wait: Duration,
    #[serde(default)]
    strategy: RetryStrategy,
}

fn default_max_attempts() -> usize {
    1
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            wait: Duration::ZERO,
            strategy: RetryStrategy::Fixed,
        }
    }
}

impl RetryPolicy {
    /// A fixed-delay policy. `max_attempts` below one is raised to one.
    pub fn new(max_attempts: usize, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            strategy: RetryStrategy::Fixed,
        }
    }

    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Checks values that may have come from a config file.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.max_attempts == 0 {
            return Err(GraphError::InvalidRetryPolicy(
                "max_attempts must be at least 1".into(),
            ));
        }
        if let RetryStrategy::Exponential { multiplier } = self.strategy {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(GraphError::InvalidRetryPolicy(format!(
                    "exponential multiplier must be a finite value >= 1, got {multiplier}"
                )));
            }
        }
        Ok(())
    }

    /// Wait applied after the zero-based attempt `failed_attempt` failed.
    pub fn delay_after(&self, failed_attempt: usize) -> Duration {
        match self.strategy {
            RetryStrategy::Fixed => self.wait,
            RetryStrategy::Linear { increment_ms } => {
                let extra = increment_ms.saturating_mul(failed_attempt as u64);
                self.wait.saturating_add(Duration::from_millis(extra))
            }
            RetryStrategy::Exponential { multiplier } => {
                let factor = multiplier.powi(failed_attempt as i32);
                let secs = self.wait.as_secs_f64() * factor;
                if secs.is_nan() || secs <= 0.0 {
                    Duration::ZERO
                } else {
                    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
                }
            }
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Runs `execute` under `policy`, blocking the thread between attempts.
///
/// A failure on the last attempt hands the input and the error to
/// `fallback`, whose result is returned as is.
pub fn execute_with_retry<I: ?Sized, T>(
    policy: &RetryPolicy,
    ctx: &NodeContext,
    input: &I,
    mut execute: impl FnMut(&I, &NodeContext) -> Result<T>,
    fallback: impl FnOnce(&I, anyhow::Error, &NodeContext) -> Result<T>,
) -> Result<T> {
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;
    loop {
        let attempt_ctx = ctx.for_attempt(attempt);
        match execute(input, &attempt_ctx) {
            Ok(value) => return Ok(value),
            Err(error) if attempt + 1 >= max_attempts => {
                warn!(
                    trace_id = %ctx.trace_id(),
                    node = %ctx.node(),
                    attempts = max_attempts,
                    error = %error,
                    "retries exhausted, invoking fallback"
                );
                return fallback(input, error, &attempt_ctx);
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    trace_id = %ctx.trace_id(),
                    node = %ctx.node(),
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "execute failed, retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}

/// Suspending counterpart of [`execute_with_retry`]; waits with
/// `tokio::time::sleep` so other tasks keep running between attempts.
pub async fn execute_with_retry_async<'a, I, T, E, F>(
    policy: &RetryPolicy,
    ctx: &NodeContext,
    input: &'a I,
    execute: E,
    fallback: F,
) -> Result<T>
where
    I: ?Sized + Sync,
    E: Fn(&'a I, NodeContext) -> BoxFuture<'a, Result<T>>,
    F: FnOnce(&'a I, anyhow::Error, NodeContext) -> BoxFuture<'a, Result<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;
    loop {
        let attempt_ctx = ctx.for_attempt(attempt);
        match execute(input, attempt_ctx.clone()).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt + 1 >= max_attempts => {
                warn!(
                    trace_id = %ctx.trace_id(),
                    node = %ctx.node(),
                    attempts = max_attempts,
                    error = %error,
                    "retries exhausted, invoking fallback"
                );
                return fallback(input, error, attempt_ctx).await;
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    trace_id = %ctx.trace_id(),
                    node = %ctx.node(),
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "execute failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
