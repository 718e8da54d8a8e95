use crate::graph::NodeId;
use thiserror::Error;

/// Failures raised by the engine itself rather than by node code.
///
/// Node errors travel as plain [`anyhow::Error`]; these can be recovered from
/// one with `downcast_ref::<GraphError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} is not part of this graph")]
    UnknownNode(NodeId),

    #[error("'{node}' is asynchronous; run it through an async flow or run_async")]
    AsyncOnly { node: String },

    #[error("flow '{flow}' exceeded its limit of {limit} steps")]
    StepLimitExceeded { flow: String, limit: usize },

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
}
