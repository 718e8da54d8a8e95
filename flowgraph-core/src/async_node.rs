//! Suspending node definitions and their sequential runners.

use crate::action::Action;
use crate::error::GraphError;
use crate::retry::{execute_with_retry_async, RetryPolicy};
use crate::runnable::{short_type_name, Runnable};
use anyhow::Result;
use async_trait::async_trait;
use flowgraph_context::{NodeContext, Params, SharedStore};
use futures::FutureExt;
use tracing::debug;

/// Async counterpart of [`crate::Node`]; every phase may await.
#[async_trait]
pub trait AsyncNode: Send + Sync {
    type Prep: Send + Sync;
    type Exec: Send;

    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    async fn prepare(
        &self,
        shared: &SharedStore,
        ctx: &NodeContext,
    ) -> Result<Self::Prep>;

    async fn execute(
        &self,
        prep: &Self::Prep,
        ctx: &NodeContext,
    ) -> Result<Self::Exec>;

    async fn fallback(
        &self,
        _prep: &Self::Prep,
        error: anyhow::Error,
        _ctx: &NodeContext,
    ) -> Result<Self::Exec> {
        Err(error)
    }

    async fn finalize(
        &self,
        _shared: &SharedStore,
        _prep: Self::Prep,
        _exec: Self::Exec,
        _ctx: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(None)
    }
}

/// Async counterpart of [`crate::BatchNode`].
///
/// Run through [`AsyncBatchRunner`] the items are awaited one at a time;
/// the parallel runner of `flowgraph-runtime` awaits them together.
#[async_trait]
pub trait AsyncBatchNode: Send + Sync {
    type Item: Send + Sync;
    type Output: Send;

    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    async fn prepare(
        &self,
        shared: &SharedStore,
        ctx: &NodeContext,
    ) -> Result<Vec<Self::Item>>;

    async fn execute(
        &self,
        item: &Self::Item,
        ctx: &NodeContext,
    ) -> Result<Self::Output>;

    async fn fallback(
        &self,
        _item: &Self::Item,
        error: anyhow::Error,
        _ctx: &NodeContext,
    ) -> Result<Self::Output> {
        Err(error)
    }

    async fn finalize(
        &self,
        _shared: &SharedStore,
        _items: Vec<Self::Item>,
        _outputs: Vec<Self::Output>,
        _ctx: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(None)
    }
}

/// Executes one item of an async batch node under `retry`.
///
/// Shared by the sequential runner here and the concurrent one in
/// `flowgraph-runtime`.
pub async fn execute_item<B: AsyncBatchNode + ?Sized>(
    node: &B,
    retry: &RetryPolicy,
    ctx: &NodeContext,
    item: &B::Item,
) -> Result<B::Output> {
    execute_with_retry_async(
        retry,
        ctx,
        item,
        move |item, ctx| async move { node.execute(item, &ctx).await }.boxed(),
        move |item, error, ctx| {
            async move { node.fallback(item, error, &ctx).await }.boxed()
        },
    )
    .await
}

/// Drives an [`AsyncNode`]; only usable from async flows or `run_async`.
pub struct AsyncNodeRunner<N> {
    node: N,
    retry: RetryPolicy,
    params: Params,
}

impl<N: AsyncNode> AsyncNodeRunner<N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            retry: RetryPolicy::default(),
            params: Params::new(),
        }
    }

    crate::runner_builders!();

    pub fn node(&self) -> &N {
        &self.node
    }
}

#[async_trait]
impl<N: AsyncNode> Runnable for AsyncNodeRunner<N> {
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
        debug!(trace_id = %ctx.trace_id(), node = %ctx.node(), "prepare");
        let prep = self.node.prepare(shared, &ctx).await?;

        let node = &self.node;
        let exec = execute_with_retry_async(
            &self.retry,
            &ctx,
            &prep,
            move |prep, ctx| async move { node.execute(prep, &ctx).await }.boxed(),
            move |prep, error, ctx| {
                async move { node.fallback(prep, error, &ctx).await }.boxed()
            },
        )
        .await?;

        let action = self.node.finalize(shared, prep, exec, &ctx).await?;
        debug!(
            trace_id = %ctx.trace_id(),
            node = %ctx.node(),
            action = ?action,
            "finalized"
        );
        Ok(action)
    }
}

/// Drives an [`AsyncBatchNode`], awaiting its items strictly in order.
pub struct AsyncBatchRunner<B> {
    node: B,
    retry: RetryPolicy,
    params: Params,
}

impl<B: AsyncBatchNode> AsyncBatchRunner<B> {
    pub fn new(node: B) -> Self {
        Self {
            node,
            retry: RetryPolicy::default(),
            params: Params::new(),
        }
    }

    crate::runner_builders!();

    pub fn node(&self) -> &B {
        &self.node
    }
}

#[async_trait]
impl<B: AsyncBatchNode> Runnable for AsyncBatchRunner<B> {
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
        debug!(
            trace_id = %ctx.trace_id(),
            node = %ctx.node(),
            items = items.len(),
            "executing batch sequentially"
        );

        let mut outputs = Vec::with_capacity(items.len());
        for item in &items {
            outputs.push(execute_item(&self.node, &self.retry, &ctx, item).await?);
        }

        self.node.finalize(shared, items, outputs, &ctx).await
    }
}
