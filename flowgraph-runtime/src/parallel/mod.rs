use anyhow::Result;
use futures::future::{join_all, try_join_all};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;

#[cfg(test)]
mod tests;

/// Configuration for parallel execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Maximum number of items in flight (None for unlimited)
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Stop awaiting the remaining items once one fails
    #[serde(default)]
    pub fail_fast: bool,
}

impl ParallelConfig {
    /// Create a config with maximum concurrency limit
    pub fn with_max_concurrency(concurrency: usize) -> Self {
        Self {
            max_concurrency: Some(concurrency),
            ..Default::default()
        }
    }

    /// Create a config that fails fast on first error
    pub fn fail_fast() -> Self {
        Self {
            fail_fast: true,
            ..Default::default()
        }
    }

    /// Set maximum concurrency
    pub fn max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = Some(concurrency);
        self
    }

    /// Enable fail fast mode
    pub fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    fn limit(&self) -> Option<usize> {
        if cfg!(feature = "parallel") {
            self.max_concurrency.map(|limit| limit.max(1))
        } else {
            Some(1)
        }
    }
}

/// Awaits `futures` together on the current task and returns their outputs
/// in input order.
///
/// Without fail-fast every future runs to completion and the first error in
/// input order is returned. With fail-fast the first error to happen drops
/// the futures still pending.
pub async fn join_ordered<T, F, I>(config: &ParallelConfig, futures: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    match (config.limit(), config.fail_fast) {
        (None, false) => join_all(futures).await.into_iter().collect(),
        (None, true) => try_join_all(futures).await,
        (Some(limit), false) => stream::iter(futures)
            .buffered(limit)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect(),
        (Some(limit), true) => stream::iter(futures).buffered(limit).try_collect().await,
    }
}
