use crate::action::Action;
use crate::error::GraphError;
use crate::graph::{Graph, NodeId};
use crate::runnable::Runnable;
use anyhow::Result;
use async_trait::async_trait;
use flowgraph_context::{Params, SharedStore};
use std::fmt;
use tracing::{debug, info};

/// Async counterpart of [`crate::FlowHooks`].
#[async_trait]
pub trait AsyncFlowHooks: Send + Sync {
    async fn prepare(&self, _shared: &SharedStore, _params: &Params) -> Result<()> {
        Ok(())
    }

    async fn finalize(
        &self,
        _shared: &SharedStore,
        _params: &Params,
        last: Option<Action>,
    ) -> Result<Option<Action>> {
        Ok(last)
    }
}

struct NoHooks;

impl AsyncFlowHooks for NoHooks {}

/// Walks a [`Graph`] awaiting each node; blocking nodes run inline.
pub struct AsyncFlow {
    name: String,
    graph: Graph,
    start: NodeId,
    params: Params,
    hooks: Box<dyn AsyncFlowHooks>,
    max_steps: Option<usize>,
}

impl fmt::Debug for AsyncFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFlow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("params", &self.params)
            .field("max_steps", &self.max_steps)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl AsyncFlow {
    pub fn new(graph: Graph, start: NodeId) -> Self {
        Self {
            name: "AsyncFlow".to_string(),
            graph,
            start,
            params: Params::new(),
            hooks: Box::new(NoHooks),
            max_steps: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn with_hooks(mut self, hooks: impl AsyncFlowHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn start(&self) -> NodeId {
        self.start
    }
}

#[async_trait]
impl Runnable for AsyncFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn is_async(&self) -> bool {
        true
    }

    fn run_with(&self, _: &SharedStore, _: &Params) -> Result<Option<Action>> {
        Err(GraphError::AsyncOnly {
            node: self.name.clone(),
        }
        .into())
    }

    #[tracing::instrument(level = "info", skip_all, fields(flow = %self.name, trace_id = %shared.trace_id()))]
    async fn run_async_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        self.hooks.prepare(shared, params).await?;
        let last = self
            .graph
            .traverse_async(&self.name, self.start, shared, params, self.max_steps)
            .await?;
        info!(action = ?last, "flow finished");
        self.hooks.finalize(shared, params, last).await
    }
}

/// Async counterpart of [`crate::BatchParams`].
#[async_trait]
pub trait AsyncBatchParams: Send + Sync {
    async fn prepare(&self, shared: &SharedStore, params: &Params) -> Result<Vec<Params>>;

    async fn finalize(
        &self,
        _shared: &SharedStore,
        _params: &Params,
        _param_sets: Vec<Params>,
    ) -> Result<Option<Action>> {
        Ok(None)
    }
}

#[async_trait]
impl<F> AsyncBatchParams for F
where
    F: Fn(&SharedStore, &Params) -> Result<Vec<Params>> + Send + Sync,
{
    async fn prepare(&self, shared: &SharedStore, params: &Params) -> Result<Vec<Params>> {
        self(shared, params)
    }
}

/// Awaits one traversal per parameter set, strictly in order.
pub struct AsyncBatchFlow {
    name: String,
    graph: Graph,
    start: NodeId,
    params: Params,
    source: Box<dyn AsyncBatchParams>,
    max_steps: Option<usize>,
}

impl fmt::Debug for AsyncBatchFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncBatchFlow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("params", &self.params)
            .field("max_steps", &self.max_steps)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl AsyncBatchFlow {
    pub fn new(
        graph: Graph,
        start: NodeId,
        source: impl AsyncBatchParams + 'static,
    ) -> Self {
        Self {
            name: "AsyncBatchFlow".to_string(),
            graph,
            start,
            params: Params::new(),
            source: Box::new(source),
            max_steps: None,
        }
    }

    pub fn from_fn<F>(graph: Graph, start: NodeId, source: F) -> Self
    where
        F: Fn(&SharedStore, &Params) -> Result<Vec<Params>> + Send + Sync + 'static,
    {
        Self::new(graph, start, source)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn start(&self) -> NodeId {
        self.start
    }
}

#[async_trait]
impl Runnable for AsyncBatchFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn is_async(&self) -> bool {
        true
    }

    fn run_with(&self, _: &SharedStore, _: &Params) -> Result<Option<Action>> {
        Err(GraphError::AsyncOnly {
            node: self.name.clone(),
        }
        .into())
    }

    #[tracing::instrument(level = "info", skip_all, fields(flow = %self.name, trace_id = %shared.trace_id()))]
    async fn run_async_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        let param_sets = self.source.prepare(shared, params).await?;
        info!(sets = param_sets.len(), "running async batch flow");
        for (index, set) in param_sets.iter().enumerate() {
            debug!(index, "traversing parameter set");
            let effective = params.merged(set);
            self.graph
                .traverse_async(&self.name, self.start, shared, &effective, self.max_steps)
                .await?;
        }
        self.source.finalize(shared, params, param_sets).await
    }
}
