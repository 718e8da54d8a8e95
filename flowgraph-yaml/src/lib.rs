//! # FlowGraph YAML
//!
//! Declarative flow wiring from YAML/JSON configuration. Node kinds are
//! registered in a [`NodeRegistry`]; a [`FlowAssembler`] turns a
//! [`FlowConfig`] into a runnable flow.
//!
//! ```yaml
//! flow:
//!   name: research
//!   start: decide
//!   nodes:
//!     - id: decide
//!       kind: decide
//!       on:
//!         search: search
//!         answer: answer
//!     - id: search
//!       kind: web_search
//!       retry: { max_attempts: 3, wait_ms: 500 }
//!       on:
//!         decide: decide
//!     - id: answer
//!       kind: answer
//! ```

mod assembler;
mod config;
mod loader;
mod registry;

pub use assembler::FlowAssembler;
pub use config::{FlowConfig, FlowDefinition, NodeConfig};
pub use loader::FlowLoader;
pub use registry::{NodeFactory, NodeRegistry};

/// Prelude module for YAML functionality
pub mod prelude {
    pub use crate::{FlowAssembler, FlowConfig, FlowLoader, NodeConfig, NodeRegistry};
}
