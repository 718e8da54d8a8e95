use crate::action::Action;
use crate::async_node::{AsyncBatchNode, AsyncBatchRunner, AsyncNode, AsyncNodeRunner};
use crate::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
use crate::error::GraphError;
use crate::node::{BatchNode, BatchRunner, Node, NodeRunner};
use crate::runnable::Runnable;
use anyhow::Result;
use flowgraph_context::{Params, SharedStore};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handle of a node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outgoing transitions of one node, keyed by action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Successors(BTreeMap<Action, NodeId>);

impl Successors {
    /// Wires `action` to `target`, returning the target it replaced.
    pub fn insert(&mut self, action: Action, target: NodeId) -> Option<NodeId> {
        self.0.insert(action, target)
    }

    pub fn get(&self, action: &Action) -> Option<NodeId> {
        self.0.get(action).copied()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.0.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Action, NodeId)> {
        self.0.iter().map(|(action, target)| (action, *target))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Slot {
    node: Box<dyn Runnable>,
    successors: Successors,
}

/// Arena of nodes and the action-labelled transitions between them.
///
/// Nodes are referenced by [`NodeId`], so cycles need no shared ownership.
/// A graph is wired up front and then handed to a flow, which only reads it.
pub struct Graph {
    slots: Vec<Slot>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes = f.debug_map();
        for (index, slot) in self.slots.iter().enumerate() {
            nodes.entry(
                &format_args!("{} {}", NodeId(index), slot.node.name()),
                &slot.successors,
            );
        }
        nodes.finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replaces the sink that receives this graph's diagnostics.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn add(&mut self, node: impl Runnable + 'static) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn Runnable>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node,
            successors: Successors::default(),
        });
        id
    }

    pub fn node<N: Node + 'static>(&mut self, node: N) -> NodeId {
        self.add(NodeRunner::new(node))
    }

    pub fn batch<B: BatchNode + 'static>(&mut self, node: B) -> NodeId {
        self.add(BatchRunner::new(node))
    }

    pub fn async_node<N: AsyncNode + 'static>(&mut self, node: N) -> NodeId {
        self.add(AsyncNodeRunner::new(node))
    }

    pub fn async_batch<B: AsyncBatchNode + 'static>(&mut self, node: B) -> NodeId {
        self.add(AsyncBatchRunner::new(node))
    }

    /// Wires `from` to `to` under the default action.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.connect_on(from, Action::default(), to)
    }

    /// Wires `from` to `to` under `action`. Re-wiring an action replaces the
    /// previous target and reports [`Diagnostic::SuccessorOverwritten`].
    pub fn connect_on(
        &mut self,
        from: NodeId,
        action: impl Into<Action>,
        to: NodeId,
    ) -> Result<(), GraphError> {
        self.slot(to)?;
        let action = Action::resolve(Some(&action.into()));
        let slot = self
            .slots
            .get_mut(from.0)
            .ok_or(GraphError::UnknownNode(from))?;
        if slot.successors.insert(action.clone(), to).is_some() {
            let diagnostic = Diagnostic::SuccessorOverwritten {
                node: slot.node.name().to_string(),
                action,
            };
            self.diagnostics.report(&diagnostic);
        }
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&dyn Runnable> {
        self.slots.get(id.0).map(|slot| slot.node.as_ref())
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(|node| node.name())
    }

    pub fn successors(&self, id: NodeId) -> Option<&Successors> {
        self.slots.get(id.0).map(|slot| &slot.successors)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.slots.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.slots.len()).map(NodeId)
    }

    /// Every wired transition as `(from, action, to)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, &Action, NodeId)> {
        self.slots.iter().enumerate().flat_map(|(index, slot)| {
            slot.successors
                .iter()
                .map(move |(action, to)| (NodeId(index), action, to))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs a single node with its own parameters, without following any
    /// transition.
    pub fn run_node(&self, id: NodeId, shared: &SharedStore) -> Result<Option<Action>> {
        let slot = self.slot(id)?;
        self.report_ignored(slot);
        slot.node.run(shared)
    }

    /// Async counterpart of [`Graph::run_node`].
    pub async fn run_node_async(
        &self,
        id: NodeId,
        shared: &SharedStore,
    ) -> Result<Option<Action>> {
        let slot = self.slot(id)?;
        self.report_ignored(slot);
        slot.node.run_async(shared).await
    }

    /// Walks the graph from `start`, running each node with `params` until
    /// a node's action has no successor. Returns that last action.
    pub fn traverse(
        &self,
        flow: &str,
        start: NodeId,
        shared: &SharedStore,
        params: &Params,
        max_steps: Option<usize>,
    ) -> Result<Option<Action>> {
        let mut current = Some(start);
        let mut last = None;
        let mut steps = 0;
        while let Some(id) = current {
            let slot = self.slot(id)?;
            steps += 1;
            check_step_limit(flow, steps, max_steps)?;
            debug!(
                trace_id = %shared.trace_id(),
                flow,
                node = slot.node.name(),
                step = steps,
                "running node"
            );
            last = slot.node.run_with(shared, params)?;
            current = self.next(slot, last.as_ref());
        }
        Ok(last)
    }

    /// Async counterpart of [`Graph::traverse`]. Blocking nodes run inline.
    pub async fn traverse_async(
        &self,
        flow: &str,
        start: NodeId,
        shared: &SharedStore,
        params: &Params,
        max_steps: Option<usize>,
    ) -> Result<Option<Action>> {
        let mut current = Some(start);
        let mut last = None;
        let mut steps = 0;
        while let Some(id) = current {
            let slot = self.slot(id)?;
            steps += 1;
            check_step_limit(flow, steps, max_steps)?;
            debug!(
                trace_id = %shared.trace_id(),
                flow,
                node = slot.node.name(),
                step = steps,
                "running node"
            );
            last = slot.node.run_async_with(shared, params).await?;
            current = self.next(slot, last.as_ref());
        }
        Ok(last)
    }

    fn slot(&self, id: NodeId) -> Result<&Slot, GraphError> {
        self.slots.get(id.0).ok_or(GraphError::UnknownNode(id))
    }

    fn next(&self, slot: &Slot, action: Option<&Action>) -> Option<NodeId> {
        let action = Action::resolve(action);
        let next = slot.successors.get(&action);
        if next.is_none() && !slot.successors.is_empty() {
            self.diagnostics.report(&Diagnostic::UnmatchedAction {
                node: slot.node.name().to_string(),
                action,
                registered: slot.successors.actions(),
            });
        }
        next
    }

    fn report_ignored(&self, slot: &Slot) {
        if !slot.successors.is_empty() {
            self.diagnostics.report(&Diagnostic::SuccessorsIgnored {
                node: slot.node.name().to_string(),
                registered: slot.successors.actions(),
            });
        }
    }
}

fn check_step_limit(
    flow: &str,
    steps: usize,
    max_steps: Option<usize>,
) -> Result<(), GraphError> {
    match max_steps {
        Some(limit) if steps > limit => Err(GraphError::StepLimitExceeded {
            flow: flow.to_string(),
            limit,
        }),
        _ => Ok(()),
    }
}
