//! Blocking node definitions and the runners that drive their lifecycle.

use crate::action::Action;
use crate::retry::{execute_with_retry, RetryPolicy};
use crate::runnable::{short_type_name, Runnable};
use anyhow::Result;
use flowgraph_context::{NodeContext, Params, SharedStore};
use tracing::debug;

/// A unit of work with a prepare, execute and finalize phase.
///
/// Only `execute` is retried, so it should not touch the shared store.
/// `prepare` reads what it needs from the store and `finalize` writes the
/// results back and picks the next action.
pub trait Node: Send + Sync {
    type Prep: Send + Sync;
    type Exec: Send;

    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    fn prepare(&self, shared: &SharedStore, ctx: &NodeContext)
        -> Result<Self::Prep>;

    fn execute(&self, prep: &Self::Prep, ctx: &NodeContext)
        -> Result<Self::Exec>;

    /// Called once after the last attempt failed. Returning `Ok` turns the
    /// value into the execute result.
    fn fallback(
        &self,
        _prep: &Self::Prep,
        error: anyhow::Error,
        _ctx: &NodeContext,
    ) -> Result<Self::Exec> {
        Err(error)
    }

    fn finalize(
        &self,
        _shared: &SharedStore,
        _prep: Self::Prep,
        _exec: Self::Exec,
        _ctx: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(None)
    }
}

/// A node whose prepare phase yields a list of items, each executed on its
/// own with the full retry policy.
pub trait BatchNode: Send + Sync {
    type Item: Send + Sync;
    type Output: Send;

    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    fn prepare(
        &self,
        shared: &SharedStore,
        ctx: &NodeContext,
    ) -> Result<Vec<Self::Item>>;

    fn execute(&self, item: &Self::Item, ctx: &NodeContext)
        -> Result<Self::Output>;

    fn fallback(
        &self,
        _item: &Self::Item,
        error: anyhow::Error,
        _ctx: &NodeContext,
    ) -> Result<Self::Output> {
        Err(error)
    }

    /// Receives the outputs in item order.
    fn finalize(
        &self,
        _shared: &SharedStore,
        _items: Vec<Self::Item>,
        _outputs: Vec<Self::Output>,
        _ctx: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(None)
    }
}

/// Generates the retry and parameter builders every runner shares.
///
/// Expects `retry: RetryPolicy` and `params: Params` fields.
#[doc(hidden)]
#[macro_export]
macro_rules! runner_builders {
    () => {
        pub fn with_retry(mut self, retry: $crate::retry::RetryPolicy) -> Self {
            self.retry = retry;
            self
        }

        /// Total execute attempts, the first one included.
        pub fn max_attempts(mut self, max_attempts: usize) -> Self {
            self.retry = self.retry.with_max_attempts(max_attempts);
            self
        }

        /// Fixed wait between attempts.
        pub fn wait(mut self, wait: std::time::Duration) -> Self {
            self.retry = self.retry.with_wait(wait);
            self
        }

        pub fn with_params(mut self, params: $crate::prelude::Params) -> Self {
            self.params = params;
            self
        }

        pub fn set_params(&mut self, params: $crate::prelude::Params) {
            self.params = params;
        }

        pub fn retry_policy(&self) -> &$crate::retry::RetryPolicy {
            &self.retry
        }
    };
}

/// Drives a [`Node`] through one lifecycle per run.
pub struct NodeRunner<N> {
    node: N,
    retry: RetryPolicy,
    params: Params,
}

impl<N: Node> NodeRunner<N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            retry: RetryPolicy::default(),
            params: Params::new(),
        }
    }

    runner_builders!();

    pub fn node(&self) -> &N {
        &self.node
    }
}

impl<N: Node> Runnable for NodeRunner<N> {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn run_with(
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
        let prep = self.node.prepare(shared, &ctx)?;

        let exec = execute_with_retry(
            &self.retry,
            &ctx,
            &prep,
            |prep, ctx| self.node.execute(prep, ctx),
            |prep, error, ctx| self.node.fallback(prep, error, ctx),
        )?;

        let action = self.node.finalize(shared, prep, exec, &ctx)?;
        debug!(
            trace_id = %ctx.trace_id(),
            node = %ctx.node(),
            action = ?action,
            "finalized"
        );
        Ok(action)
    }
}

/// Drives a [`BatchNode`], executing its items one after another.
pub struct BatchRunner<B> {
    node: B,
    retry: RetryPolicy,
    params: Params,
}

impl<B: BatchNode> BatchRunner<B> {
    pub fn new(node: B) -> Self {
        Self {
            node,
            retry: RetryPolicy::default(),
            params: Params::new(),
        }
    }

    runner_builders!();

    pub fn node(&self) -> &B {
        &self.node
    }
}

impl<B: BatchNode> Runnable for BatchRunner<B> {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn run_with(
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
        let items = self.node.prepare(shared, &ctx)?;
        debug!(
            trace_id = %ctx.trace_id(),
            node = %ctx.node(),
            items = items.len(),
            "executing batch"
        );

        let outputs = items
            .iter()
            .map(|item| {
                execute_with_retry(
                    &self.retry,
                    &ctx,
                    item,
                    |item, ctx| self.node.execute(item, ctx),
                    |item, error, ctx| self.node.fallback(item, error, ctx),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        self.node.finalize(shared, items, outputs, &ctx)
    }
}
