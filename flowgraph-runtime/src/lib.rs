//! # FlowGraph Runtime
//!
//! Concurrent batch variants for flowgraph: a batch node whose items are
//! awaited together and a batch flow whose traversals are awaited together.
//! Both keep results in input order.

mod batch_flow;
mod batch_node;
mod parallel;


pub use batch_flow::ParallelBatchFlow;
pub use batch_node::ParallelBatchRunner;
pub use parallel::{join_ordered, ParallelConfig};

use flowgraph_core::{AsyncBatchNode, Graph, NodeId};

/// Runtime extensions for [`Graph`]
pub trait GraphExt {
    /// Add an async batch node whose items run concurrently
    fn parallel_batch<B: AsyncBatchNode + 'static>(&mut self, node: B) -> NodeId;

    /// Add an async batch node with a custom parallel configuration
    fn parallel_batch_with_config<B: AsyncBatchNode + 'static>(
        &mut self,
        node: B,
        config: ParallelConfig,
    ) -> NodeId;
}

impl GraphExt for Graph {
    fn parallel_batch<B: AsyncBatchNode + 'static>(&mut self, node: B) -> NodeId {
        self.add(ParallelBatchRunner::new(node))
    }

    fn parallel_batch_with_config<B: AsyncBatchNode + 'static>(
        &mut self,
        node: B,
        config: ParallelConfig,
    ) -> NodeId {
        self.add(ParallelBatchRunner::new(node).with_config(config))
    }
}
