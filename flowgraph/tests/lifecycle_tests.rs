// End-to-end behavior of single nodes and flows: retries, fallback and routing
use anyhow::{anyhow, Result};
use flowgraph::prelude::*;
use flowgraph::{Diagnostic, NodeRunner};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Counters {
    calls: AtomicUsize,
    fallbacks: AtomicUsize,
    attempts: Mutex<Vec<usize>>,
}

/// Fails every attempt before `succeed_on`, counted from zero.
struct Flaky {
    succeed_on: Option<usize>,
    counters: Arc<Counters>,
}

impl Node for Flaky {
    type Prep = ();
    type Exec = String;

    fn prepare(&self, _: &SharedStore, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn execute(&self, _: &(), ctx: &NodeContext) -> Result<String> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.counters.attempts.lock().unwrap().push(ctx.attempt());
        match self.succeed_on {
            Some(attempt) if ctx.attempt() >= attempt => Ok(format!("ok on {attempt}")),
            _ => Err(anyhow!("boom")),
        }
    }

    fn fallback(&self, _: &(), error: anyhow::Error, _: &NodeContext) -> Result<String> {
        self.counters.fallbacks.fetch_add(1, Ordering::SeqCst);
        Ok(format!("fallback: {error}"))
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: (),
        outcome: String,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.set("outcome", outcome);
        Ok(None)
    }
}

#[test]
fn test_retry_exhaustion_calls_fallback_once() {
    let counters = Arc::new(Counters::default());
    let node = NodeRunner::new(Flaky {
        succeed_on: None,
        counters: counters.clone(),
    })
    .max_attempts(4)
    .wait(Duration::from_millis(1));

    let shared = SharedStore::new();
    let action = node.run(&shared).unwrap();

    assert_eq!(action, None);
    assert_eq!(counters.calls.load(Ordering::SeqCst), 4);
    assert_eq!(counters.fallbacks.load(Ordering::SeqCst), 1);
    assert_eq!(*counters.attempts.lock().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(shared.get_str("outcome").as_deref(), Some("fallback: boom"));
}

#[test]
fn test_retry_success_skips_fallback() {
    let counters = Arc::new(Counters::default());
    let node = NodeRunner::new(Flaky {
        succeed_on: Some(2),
        counters: counters.clone(),
    })
    .max_attempts(5);

    let shared = SharedStore::new();
    node.run(&shared).unwrap();

    assert_eq!(counters.calls.load(Ordering::SeqCst), 3);
    assert_eq!(counters.fallbacks.load(Ordering::SeqCst), 0);
    assert_eq!(shared.get_str("outcome").as_deref(), Some("ok on 2"));
}

struct Strict;

impl Node for Strict {
    type Prep = ();
    type Exec = ();

    fn prepare(&self, _: &SharedStore, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn execute(&self, _: &(), _: &NodeContext) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

#[test]
fn test_error_without_fallback_reaches_caller() {
    let mut graph = Graph::new();
    let start = graph.node(Strict);
    let flow = Flow::new(graph, start);

    let err = flow.run(&SharedStore::new()).unwrap_err();
    assert_eq!(err.to_string(), "disk full");
}

/// Writes its label under `key` and returns `action`.
struct Mark {
    key: &'static str,
    action: Option<&'static str>,
}

impl Mark {
    fn new(key: &'static str, action: Option<&'static str>) -> Self {
        Self { key, action }
    }
}

impl Node for Mark {
    type Prep = ();
    type Exec = ();

    fn prepare(&self, _: &SharedStore, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn execute(&self, _: &(), _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: (),
        _: (),
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.set(self.key, true);
        Ok(self.action.map(Action::from))
    }
}

#[test]
fn test_missing_action_follows_default_edge() {
    let mut graph = Graph::new();
    let first = graph.node(Mark::new("first", None));
    let second = graph.node(Mark::new("second", None));
    graph.connect_on(first, "default", second).unwrap();

    let shared = SharedStore::new();
    let result = Flow::new(graph, first).run(&shared).unwrap();

    assert_eq!(result, None);
    assert!(shared.contains_key("first"));
    assert!(shared.contains_key("second"));
}

#[test]
fn test_unmatched_action_ends_flow_with_warning() {
    let recorder = Arc::new(RecordingDiagnostics::new());
    let mut graph = Graph::new().with_diagnostics(recorder.clone());
    let first = graph.node(Mark::new("first", Some("X")));
    let second = graph.node(Mark::new("second", None));
    graph.connect_on(first, "Y", second).unwrap();

    let shared = SharedStore::new();
    let result = Flow::new(graph, first).run(&shared).unwrap();

    assert_eq!(result, Some(Action::from("X")));
    assert!(!shared.contains_key("second"));
    assert_eq!(
        recorder.events(),
        vec![Diagnostic::UnmatchedAction {
            node: "Mark".to_string(),
            action: Action::from("X"),
            registered: vec![Action::from("Y")],
        }]
    );
}

#[test]
fn test_leaf_node_ends_flow_silently() {
    let recorder = Arc::new(RecordingDiagnostics::new());
    let mut graph = Graph::new().with_diagnostics(recorder.clone());
    let first = graph.node(Mark::new("first", None));
    let leaf = graph.node(Mark::new("leaf", Some("done")));
    graph.connect(first, leaf).unwrap();

    let result = Flow::new(graph, first).run(&SharedStore::new()).unwrap();

    assert_eq!(result, Some(Action::from("done")));
    assert!(recorder.is_empty());
}

struct LoadData;

impl Node for LoadData {
    type Prep = ();
    type Exec = &'static str;

    fn prepare(&self, _: &SharedStore, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn execute(&self, _: &(), _: &NodeContext) -> Result<&'static str> {
        Ok("abc")
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: (),
        data: &'static str,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.set("data", data);
        Ok(None)
    }
}

struct Summarize;

impl Node for Summarize {
    type Prep = String;
    type Exec = String;

    fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> Result<String> {
        shared.get_str("data").ok_or_else(|| anyhow!("no data loaded"))
    }

    fn execute(&self, data: &String, _: &NodeContext) -> Result<String> {
        Ok(format!("processed:{data}"))
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: String,
        summary: String,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.set("summary", summary);
        Ok(None)
    }
}

#[test]
fn test_load_then_summarize() {
    let mut graph = Graph::new();
    let load = graph.node(LoadData);
    let summarize = graph.node(Summarize);
    graph.connect(load, summarize).unwrap();

    let shared = SharedStore::new();
    Flow::new(graph, load).run(&shared).unwrap();

    assert_eq!(shared.get_str("data").as_deref(), Some("abc"));
    assert_eq!(shared.get_str("summary").as_deref(), Some("processed:abc"));
}

struct Decide {
    visits: Arc<AtomicUsize>,
}

impl Node for Decide {
    type Prep = usize;
    type Exec = ();

    fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> Result<usize> {
        self.visits.fetch_add(1, Ordering::SeqCst);
        Ok(shared
            .get("searches")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    fn execute(&self, _: &usize, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn finalize(
        &self,
        _: &SharedStore,
        searches: usize,
        _: (),
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(Some(if searches < 3 { "search" } else { "answer" }.into()))
    }
}

struct Search;

impl Node for Search {
    type Prep = ();
    type Exec = ();

    fn prepare(&self, _: &SharedStore, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn execute(&self, _: &(), _: &NodeContext) -> Result<()> {
        Ok(())
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: (),
        _: (),
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.update("searches", |n| {
            *n = (n.as_u64().unwrap_or(0) + 1).into();
        });
        Ok(Some("decide".into()))
    }
}

#[test]
fn test_decide_loop_runs_until_answer() {
    let visits = Arc::new(AtomicUsize::new(0));
    let mut graph = Graph::new();
    let decide = graph.node(Decide {
        visits: visits.clone(),
    });
    let search = graph.node(Search);
    let answer = graph.node(Mark::new("answered", None));
    graph.connect_on(decide, "search", search).unwrap();
    graph.connect_on(decide, "answer", answer).unwrap();
    graph.connect_on(search, "decide", decide).unwrap();

    let shared = SharedStore::new();
    let result = Flow::new(graph, decide).run(&shared).unwrap();

    assert_eq!(result, None);
    assert_eq!(shared.get("searches"), Some(serde_json::json!(3)));
    assert_eq!(visits.load(Ordering::SeqCst), 4);
    assert!(shared.contains_key("answered"));
}

#[test]
fn test_flow_as_node_of_outer_flow() {
    let mut inner = Graph::new();
    let load = inner.node(LoadData);
    let summarize = inner.node(Summarize);
    inner.connect(load, summarize).unwrap();

    let mut outer = Graph::new();
    let pipeline = outer.add(Flow::new(inner, load).named("pipeline"));
    let done = outer.node(Mark::new("done", None));
    outer.connect(pipeline, done).unwrap();

    let shared = SharedStore::new();
    Flow::new(outer, pipeline).run(&shared).unwrap();

    assert_eq!(shared.get_str("summary").as_deref(), Some("processed:abc"));
    assert!(shared.contains_key("done"));
}

struct Remote;

#[flowgraph::async_trait]
impl AsyncNode for Remote {
    type Prep = ();
    type Exec = ();

    async fn prepare(&self, _: &SharedStore, _: &NodeContext) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, _: &(), _: &NodeContext) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_sync_flow_refuses_async_node() {
    let mut graph = Graph::new();
    let start = graph.async_node(Remote);
    let err = Flow::new(graph, start).run(&SharedStore::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::AsyncOnly { .. })
    ));
}

#[tokio::test]
async fn test_async_flow_runs_sync_nodes_inline() {
    let mut graph = Graph::new();
    let load = graph.node(LoadData);
    let remote = graph.async_node(Remote);
    let summarize = graph.node(Summarize);
    graph.connect(load, remote).unwrap();
    graph.connect(remote, summarize).unwrap();

    let shared = SharedStore::new();
    AsyncFlow::new(graph, load).run_async(&shared).await.unwrap();

    assert_eq!(shared.get_str("summary").as_deref(), Some("processed:abc"));
}
