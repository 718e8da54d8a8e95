//! Non-fatal conditions noticed while wiring or traversing a graph.

use crate::action::Action;
use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A node returned an action with no successor while other actions
    /// were wired; the flow ends at this node.
    UnmatchedAction {
        node: String,
        action: Action,
        registered: Vec<Action>,
    },
    /// A transition was wired twice; the later target replaced the earlier.
    SuccessorOverwritten { node: String, action: Action },
    /// A node was run on its own although it has successors, which are not
    /// followed outside a flow.
    SuccessorsIgnored {
        node: String,
        registered: Vec<Action>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmatchedAction {
                node,
                action,
                registered,
            } => write!(
                f,
                "flow ends: action '{action}' of '{node}' not found in {}",
                join(registered)
            ),
            Diagnostic::SuccessorOverwritten { node, action } => write!(
                f,
                "overwriting successor of '{node}' for action '{action}'"
            ),
            Diagnostic::SuccessorsIgnored { node, registered } => write!(
                f,
                "'{node}' has successors {} that are not run outside a flow",
                join(registered)
            ),
        }
    }
}

fn join(actions: &[Action]) -> String {
    let labels: Vec<&str> = actions.iter().map(Action::as_str).collect();
    format!("[{}]", labels.join(", "))
}

/// Sink for [`Diagnostic`]s, injected per graph.
pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F> Diagnostics for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Default sink: every diagnostic becomes a `warn` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::UnmatchedAction { node, action, .. } => tracing::warn!(
                node = %node,
                action = %action,
                "{diagnostic}"
            ),
            Diagnostic::SuccessorOverwritten { node, action } => {
                tracing::warn!(node = %node, action = %action, "{diagnostic}")
            }
            Diagnostic::SuccessorsIgnored { node, .. } => {
                tracing::warn!(node = %node, "{diagnostic}")
            }
        }
    }
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything recorded so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}
