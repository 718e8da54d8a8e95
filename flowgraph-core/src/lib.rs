//! # FlowGraph Core
//!
//! Nodes with a prepare, execute and finalize lifecycle, wired into a
//! [`Graph`] by action labels and walked by a [`Flow`].
//!
//! ```rust,no_run
//! use flowgraph_core::prelude::*;
//!
//! struct Greet;
//!
//! impl Node for Greet {
//!     type Prep = String;
//!     type Exec = String;
//!
//!     fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> anyhow::Result<String> {
//!         Ok(shared.get_str("name").unwrap_or_default())
//!     }
//!
//!     fn execute(&self, name: &String, _: &NodeContext) -> anyhow::Result<String> {
//!         Ok(format!("hello {name}"))
//!     }
//!
//!     fn finalize(
//!         &self,
//!         shared: &SharedStore,
//!         _: String,
//!         greeting: String,
//!         _: &NodeContext,
//!     ) -> anyhow::Result<Option<Action>> {
//!         shared.set("greeting", greeting);
//!         Ok(None)
//!     }
//! }
//!
//! let mut graph = Graph::new();
//! let start = graph.node(Greet);
//! let flow = Flow::new(graph, start);
//! flow.run(&SharedStore::new())?;
//! # anyhow::Ok(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod action;
mod async_flow;
mod async_node;
mod diagnostics;
mod error;
mod flow;
mod graph;
mod node;
pub mod retry;
mod runnable;


pub use action::Action;
pub use async_flow::{AsyncBatchFlow, AsyncBatchParams, AsyncFlow, AsyncFlowHooks};
pub use async_node::{
    execute_item, AsyncBatchNode, AsyncBatchRunner, AsyncNode, AsyncNodeRunner,
};
pub use diagnostics::{
    Diagnostic, Diagnostics, RecordingDiagnostics, TracingDiagnostics,
};
pub use error::GraphError;
pub use flow::{BatchFlow, BatchParams, Flow, FlowHooks};
pub use graph::{Graph, NodeId, Successors};
pub use node::{BatchNode, BatchRunner, Node, NodeRunner};
pub use retry::{RetryPolicy, RetryStrategy};
pub use runnable::Runnable;

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        Action, AsyncBatchFlow, AsyncBatchNode, AsyncFlow, AsyncNode, BatchFlow,
        BatchNode, Flow, Graph, GraphError, Node, NodeId, RetryPolicy, Runnable,
    };
    pub use flowgraph_context::{NodeContext, Params, SharedStore};
}
