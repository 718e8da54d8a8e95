use crate::parallel::{join_ordered, ParallelConfig};
use anyhow::Result;
use async_trait::async_trait;
use flowgraph_context::{NodeContext, Params, SharedStore};
use flowgraph_core::{execute_item, Action, AsyncBatchNode, GraphError, RetryPolicy, Runnable};
use futures::FutureExt;
use tracing::debug;

/// Drives an [`AsyncBatchNode`] with every item's execute, retries
/// included, awaited together. Outputs reach finalize in item order.
pub struct ParallelBatchRunner<B> {
    node: B,
    retry: RetryPolicy,
    params: Params,
    config: ParallelConfig,
}

impl<B: AsyncBatchNode> ParallelBatchRunner<B> {
    pub fn new(node: B) -> Self {
        Self {
            node,
            retry: RetryPolicy::default(),
            params: Params::new(),
            config: ParallelConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParallelConfig) -> Self {
        self.config = config;
        self
    }

    flowgraph_core::runner_builders!();

    pub fn node(&self) -> &B {
        &self.node
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }
}

#[async_trait]
impl<B: AsyncBatchNode> Runnable for ParallelBatchRunner<B> {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn is_async(&self) -> bool {
        true
    }

    fn run_with(&self, _: &SharedStore, _: &Params) -> Result<Option<Action>> {
        Err(GraphError::AsyncOnly {
            node: self.node.name().to_string(),
        }
        .into())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(node = %self.node.name(), trace_id = %shared.trace_id()))]
    async fn run_async_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        let ctx = NodeContext::new(
            self.node.name(),
            shared.trace_id(),
            params.clone(),
            self.retry.max_attempts(),
        );
        let items = self.node.prepare(shared, &ctx).await?;
        debug!(items = items.len(), "executing batch concurrently");

        let pending: Vec<_> = items
            .iter()
            .map(|item| execute_item(&self.node, &self.retry, &ctx, item).boxed())
            .collect();
        let outputs = join_ordered(&self.config, pending).await?;

        self.node.finalize(shared, items, outputs, &ctx).await
    }
}
