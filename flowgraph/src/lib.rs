//! # FlowGraph - Minimal Graph Execution Engine
//!
//! FlowGraph runs small units of work ("nodes") wired into a directed graph
//! by action labels. Each node prepares from a shared store, executes with
//! retry and fallback, and finalizes by writing results back and choosing
//! the next action.
//!
//! ## Features
//!
//! - `runtime`: Batch nodes and batch flows whose work is awaited concurrently
//! - `parallel` (default through `runtime`): Real concurrency in the runtime variants
//! - `yaml`: Declarative flow wiring from YAML/JSON
//! - `yaml-runtime` (default): `yaml` plus parallel node kinds in config
//! - `logger`: Tracing subscriber setup and a trace-aware logger
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph::prelude::*;
//!
//! struct LoadData;
//!
//! impl Node for LoadData {
//!     type Prep = ();
//!     type Exec = &'static str;
//!
//!     fn prepare(&self, _: &SharedStore, _: &NodeContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn execute(&self, _: &(), _: &NodeContext) -> anyhow::Result<&'static str> {
//!         Ok("abc")
//!     }
//!
//!     fn finalize(
//!         &self,
//!         shared: &SharedStore,
//!         _: (),
//!         data: &'static str,
//!         _: &NodeContext,
//!     ) -> anyhow::Result<Option<Action>> {
//!         shared.set("data", data);
//!         Ok(None)
//!     }
//! }
//!
//! let mut graph = Graph::new();
//! let start = graph.node(LoadData);
//! let shared = SharedStore::new();
//! Flow::new(graph, start).run(&shared)?;
//! assert_eq!(shared.get_str("data").as_deref(), Some("abc"));
//! # anyhow::Ok(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export core functionality
pub use flowgraph_context as context;
pub use flowgraph_core::*;

// Needed by every implementor of the node traits
pub use anyhow;
pub use async_trait::async_trait;

#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use flowgraph_runtime as runtime;

#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub use flowgraph_yaml as yaml;

#[cfg(feature = "logger")]
#[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
pub mod logger;

/// Prelude module for easy imports
pub mod prelude {
    pub use flowgraph_core::prelude::*;
    pub use flowgraph_core::{AsyncBatchParams, BatchParams, Diagnostics, RecordingDiagnostics};

    #[cfg(feature = "runtime")]
    #[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
    pub use flowgraph_runtime::{GraphExt, ParallelBatchFlow, ParallelBatchRunner, ParallelConfig};

    #[cfg(feature = "yaml")]
    #[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
    pub use flowgraph_yaml::prelude::*;

    #[cfg(feature = "logger")]
    #[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
    pub use crate::logger::Logger;
}
