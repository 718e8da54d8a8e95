//! Tracing setup and a logger that stamps every line with a trace id.

use flowgraph_context::SharedStore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Logger for flowgraph runs
#[derive(Debug, Clone)]
pub struct Logger {
    pub trace_id: String,
}

impl Logger {
    /// Create a logger with a fresh trace ID
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
        }
    }

    /// Share the trace ID of a store so log lines match node spans.
    pub fn for_store(shared: &SharedStore) -> Self {
        Self::with_trace_id(shared.trace_id())
    }

    /// Install a human readable subscriber filtered by `RUST_LOG`.
    ///
    /// Fails if a global subscriber is already set.
    pub fn init_tracing() -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
    }

    /// Install a JSON subscriber filtered by `RUST_LOG`.
    pub fn init_json() -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
    }

    pub fn info(&self, message: &str) {
        info!(trace_id = %self.trace_id, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(trace_id = %self.trace_id, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(trace_id = %self.trace_id, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        debug!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log the keys left in the shared store after a run
    pub fn log_store_summary(&self, shared: &SharedStore) {
        let mut keys: Vec<String> = shared.read(|map| map.keys().cloned().collect());
        keys.sort_unstable();
        info!(
            trace_id = %self.trace_id,
            entries = keys.len(),
            keys = ?keys,
            "Shared store summary"
        );
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
