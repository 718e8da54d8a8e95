use crate::parallel::{join_ordered, ParallelConfig};
use anyhow::Result;
use async_trait::async_trait;
use flowgraph_context::{Params, SharedStore};
use flowgraph_core::{Action, AsyncBatchParams, Graph, GraphError, NodeId, Runnable};
use futures::FutureExt;
use std::fmt;
use tracing::info;

/// Runs one traversal of its graph per parameter set, all awaited together
/// on the current task.
///
/// Traversals share the store but never each other's parameters. Writes
/// from concurrent traversals should go to keys derived from their own set.
pub struct ParallelBatchFlow {
    name: String,
    graph: Graph,
    start: NodeId,
    params: Params,
    source: Box<dyn AsyncBatchParams>,
    config: ParallelConfig,
    max_steps: Option<usize>,
}

impl fmt::Debug for ParallelBatchFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelBatchFlow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("params", &self.params)
            .field("max_steps", &self.max_steps)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl ParallelBatchFlow {
    pub fn new(
        graph: Graph,
        start: NodeId,
        source: impl AsyncBatchParams + 'static,
    ) -> Self {
        Self {
            name: "ParallelBatchFlow".to_string(),
            graph,
            start,
            params: Params::new(),
            source: Box::new(source),
            config: ParallelConfig::default(),
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

    pub fn with_config(mut self, config: ParallelConfig) -> Self {
        self.config = config;
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
impl Runnable for ParallelBatchFlow {
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
        info!(sets = param_sets.len(), "running parallel batch flow");

        let effective: Vec<Params> =
            param_sets.iter().map(|set| params.merged(set)).collect();
        let traversals: Vec<_> = effective
            .iter()
            .map(|set| {
                self.graph
                    .traverse_async(&self.name, self.start, shared, set, self.max_steps)
                    .boxed()
            })
            .collect();
        join_ordered(&self.config, traversals).await?;

        self.source.finalize(shared, params, param_sets).await
    }
}
