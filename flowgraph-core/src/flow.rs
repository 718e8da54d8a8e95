use crate::action::Action;
use crate::graph::{Graph, NodeId};
use crate::runnable::Runnable;
use anyhow::Result;
use flowgraph_context::{Params, SharedStore};
use std::fmt;
use tracing::{debug, info};

/// The flow's own prepare and finalize phases, run around the traversal.
pub trait FlowHooks: Send + Sync {
    fn prepare(&self, _shared: &SharedStore, _params: &Params) -> Result<()> {
        Ok(())
    }

    /// Receives the last node's action; the default passes it through.
    fn finalize(
        &self,
        _shared: &SharedStore,
        _params: &Params,
        last: Option<Action>,
    ) -> Result<Option<Action>> {
        Ok(last)
    }
}

struct NoHooks;

impl FlowHooks for NoHooks {}

/// Walks a [`Graph`] from its start node, blocking the calling thread.
///
/// A flow is itself [`Runnable`], so it can be added to another graph and
/// run as a single step there.
pub struct Flow {
    name: String,
    graph: Graph,
    start: NodeId,
    params: Params,
    hooks: Box<dyn FlowHooks>,
    max_steps: Option<usize>,
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("params", &self.params)
            .field("max_steps", &self.max_steps)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl Flow {
    pub fn new(graph: Graph, start: NodeId) -> Self {
        Self {
            name: "Flow".to_string(),
            graph,
            start,
            params: Params::new(),
            hooks: Box::new(NoHooks),
            max_steps: None,
        }
    }

    /// Name used in logs and diagnostics when nested.
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

    pub fn with_hooks(mut self, hooks: impl FlowHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Fails the run with `StepLimitExceeded` once more than `max_steps`
    /// nodes would run. Unbounded by default.
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

impl Runnable for Flow {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    #[tracing::instrument(level = "info", skip_all, fields(flow = %self.name, trace_id = %shared.trace_id()))]
    fn run_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        self.hooks.prepare(shared, params)?;
        let last = self.graph.traverse(
            &self.name,
            self.start,
            shared,
            params,
            self.max_steps,
        )?;
        info!(action = ?last, "flow finished");
        self.hooks.finalize(shared, params, last)
    }
}

/// Produces the parameter sets a batch flow runs its graph over.
pub trait BatchParams: Send + Sync {
    fn prepare(&self, shared: &SharedStore, params: &Params) -> Result<Vec<Params>>;

    fn finalize(
        &self,
        _shared: &SharedStore,
        _params: &Params,
        _param_sets: Vec<Params>,
    ) -> Result<Option<Action>> {
        Ok(None)
    }
}

impl<F> BatchParams for F
where
    F: Fn(&SharedStore, &Params) -> Result<Vec<Params>> + Send + Sync,
{
    fn prepare(&self, shared: &SharedStore, params: &Params) -> Result<Vec<Params>> {
        self(shared, params)
    }
}

/// Runs its whole graph once per parameter set, one set after another.
///
/// Each traversal sees the flow's parameters overlaid with its own set.
pub struct BatchFlow {
    name: String,
    graph: Graph,
    start: NodeId,
    params: Params,
    source: Box<dyn BatchParams>,
    max_steps: Option<usize>,
}

impl fmt::Debug for BatchFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchFlow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("params", &self.params)
            .field("max_steps", &self.max_steps)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl BatchFlow {
    pub fn new(graph: Graph, start: NodeId, source: impl BatchParams + 'static) -> Self {
        Self {
            name: "BatchFlow".to_string(),
            graph,
            start,
            params: Params::new(),
            source: Box::new(source),
            max_steps: None,
        }
    }

    /// Like [`BatchFlow::new`] with the parameter sets produced by a closure.
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

    /// Step limit applied to each traversal separately.
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

impl Runnable for BatchFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    #[tracing::instrument(level = "info", skip_all, fields(flow = %self.name, trace_id = %shared.trace_id()))]
    fn run_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        let param_sets = self.source.prepare(shared, params)?;
        info!(sets = param_sets.len(), "running batch flow");
        for (index, set) in param_sets.iter().enumerate() {
            debug!(index, "traversing parameter set");
            let effective = params.merged(set);
            self.graph.traverse(
                &self.name,
                self.start,
                shared,
                &effective,
                self.max_steps,
            )?;
        }
        self.source.finalize(shared, params, param_sets)
    }
}
