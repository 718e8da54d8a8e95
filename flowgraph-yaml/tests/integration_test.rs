// Integration tests for loading, validating and assembling flows from config
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use flowgraph_context::{NodeContext, SharedStore};
use flowgraph_core::{Action, AsyncNode, Node, RecordingDiagnostics, Runnable};
use flowgraph_yaml::{FlowAssembler, FlowLoader, NodeConfig, NodeRegistry};
use serde_json::json;
use std::sync::Arc;

const RESEARCH_FLOW: &str = r#"
flow:
  name: research
  start: decide
  params:
    topic: rust
  nodes:
    - id: decide
      kind: decide
      on:
        search: search
        answer: answer
    - id: search
      kind: search
      retry:
        max_attempts: 2
        wait_ms: 1
      on:
        decide: decide
    - id: answer
      kind: answer
      settings:
        prefix: "Answer"
"#;

/// Searches until two results are collected, then answers.
struct Decide;

impl Node for Decide {
    type Prep = usize;
    type Exec = &'static str;

    fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> Result<usize> {
        Ok(shared
            .get("results")
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or(0))
    }

    fn execute(&self, found: &usize, _: &NodeContext) -> Result<&'static str> {
        Ok(if *found < 2 { "search" } else { "answer" })
    }

    fn finalize(
        &self,
        _: &SharedStore,
        _: usize,
        action: &'static str,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(Some(Action::from(action)))
    }
}

/// Fails on every first attempt to exercise the configured retry.
struct Search;

impl Node for Search {
    type Prep = String;
    type Exec = String;

    fn prepare(&self, _: &SharedStore, ctx: &NodeContext) -> Result<String> {
        Ok(ctx.params().get_str("topic").unwrap_or_default().to_string())
    }

    fn execute(&self, topic: &String, ctx: &NodeContext) -> Result<String> {
        if ctx.attempt() == 0 {
            return Err(anyhow!("rate limited"));
        }
        Ok(format!("result about {topic}"))
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: String,
        result: String,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.update("results", |results| {
            let mut items = results.as_array().cloned().unwrap_or_default();
            items.push(json!(result));
            *results = json!(items);
        });
        Ok(Some(Action::from("decide")))
    }
}

struct Answer {
    prefix: String,
}

impl Node for Answer {
    type Prep = usize;
    type Exec = String;

    fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> Result<usize> {
        Ok(shared
            .get("results")
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or(0))
    }

    fn execute(&self, count: &usize, _: &NodeContext) -> Result<String> {
        Ok(format!("{}: {count} sources", self.prefix))
    }

    fn finalize(
        &self,
        shared: &SharedStore,
        _: usize,
        answer: String,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.set("answer", answer);
        Ok(None)
    }
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry
        .register_node("decide", |_| Ok(Decide))
        .register_node("search", |_| Ok(Search))
        .register_node("answer", |config: &NodeConfig| {
            let prefix = config.settings["prefix"]
                .as_str()
                .ok_or_else(|| anyhow!("answer needs a prefix"))?;
            Ok(Answer {
                prefix: prefix.to_string(),
            })
        });
    registry
}

#[test]
fn test_yaml_flow_loops_until_answer() {
    let config = FlowLoader::from_yaml_str(RESEARCH_FLOW).expect("Failed to load flow");
    let registry = registry();
    let flow = FlowAssembler::new(&registry)
        .build_flow(&config)
        .expect("Failed to assemble flow");

    let shared = SharedStore::new();
    let result = flow.run(&shared).unwrap();

    assert_eq!(result, None);
    assert_eq!(
        shared.get("results"),
        Some(json!(["result about rust", "result about rust"]))
    );
    assert_eq!(shared.get_str("answer").as_deref(), Some("Answer: 2 sources"));
    assert_eq!(flow.graph().edges().count(), 3);
}

#[test]
fn test_validation_errors() {
    let duplicate = r#"
flow:
  name: dup
  start: a
  nodes:
    - { id: a, kind: decide }
    - { id: a, kind: search }
"#;
    let config = FlowLoader::from_yaml_str(duplicate).unwrap();
    let err = FlowLoader::validate(&config).unwrap_err();
    assert!(err.to_string().contains("Duplicate node ID: a"));

    let dangling = r#"
flow:
  name: dangling
  start: a
  nodes:
    - { id: a, kind: decide, on: { search: nowhere } }
"#;
    let config = FlowLoader::from_yaml_str(dangling).unwrap();
    let err = FlowLoader::validate(&config).unwrap_err();
    assert!(err.to_string().contains("unknown node 'nowhere'"));

    let missing_start = r#"
flow:
  name: missing
  start: b
  nodes:
    - { id: a, kind: decide }
"#;
    let config = FlowLoader::from_yaml_str(missing_start).unwrap();
    assert!(FlowLoader::validate(&config).is_err());

    let bad_retry = r#"
flow:
  name: retry
  start: a
  nodes:
    - { id: a, kind: decide, retry: { max_attempts: 0 } }
"#;
    let config = FlowLoader::from_yaml_str(bad_retry).unwrap();
    assert!(FlowLoader::validate(&config).is_err());
}

#[test]
fn test_unknown_kind_is_reported() {
    let config = FlowLoader::from_json_str(
        r#"{"flow": {"name": "json", "start": "a", "nodes": [{"id": "a", "kind": "mystery"}]}}"#,
    )
    .unwrap();
    let registry = registry();
    let err = FlowAssembler::new(&registry).build_flow(&config).unwrap_err();
    assert!(format!("{err:#}").contains("Unknown node kind 'mystery'"));
}

#[test]
fn test_unmatched_action_reaches_injected_diagnostics() {
    let yaml = r#"
flow:
  name: short
  start: decide
  nodes:
    - id: decide
      kind: decide
      on:
        answer: answer
    - id: answer
      kind: answer
      settings: { prefix: "A" }
"#;
    let config = FlowLoader::from_yaml_str(yaml).unwrap();
    let registry = registry();
    let recorder = Arc::new(RecordingDiagnostics::new());
    let flow = FlowAssembler::new(&registry)
        .with_diagnostics(recorder.clone())
        .build_flow(&config)
        .unwrap();

    let result = flow.run(&SharedStore::new()).unwrap();
    assert_eq!(result, Some(Action::from("search")));
    assert_eq!(recorder.len(), 1);
}

struct Echo;

#[async_trait]
impl AsyncNode for Echo {
    type Prep = String;
    type Exec = String;

    async fn prepare(&self, _: &SharedStore, ctx: &NodeContext) -> Result<String> {
        Ok(ctx.params().get_str("message").unwrap_or_default().to_string())
    }

    async fn execute(&self, message: &String, _: &NodeContext) -> Result<String> {
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        Ok(message.to_uppercase())
    }

    async fn finalize(
        &self,
        shared: &SharedStore,
        _: String,
        echoed: String,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.set("echo", echoed);
        Ok(None)
    }
}

#[tokio::test]
async fn test_async_flow_from_config() {
    let yaml = r#"
flow:
  name: echo
  start: echo
  params:
    message: hello
  nodes:
    - { id: echo, kind: echo }
"#;
    let config = FlowLoader::from_yaml_str(yaml).unwrap();
    let mut registry = NodeRegistry::new();
    registry.register_async_node("echo", |_| Ok(Echo));

    let assembler = FlowAssembler::new(&registry);
    assert!(assembler.build_flow(&config).is_err());

    let flow = assembler.build_async_flow(&config).unwrap();
    let shared = SharedStore::new();
    flow.run_async(&shared).await.unwrap();
    assert_eq!(shared.get_str("echo").as_deref(), Some("HELLO"));
}

#[test]
fn test_save_and_reload_yaml() {
    let config = FlowLoader::from_yaml_str(RESEARCH_FLOW).unwrap();
    let path = std::env::temp_dir().join(format!("flowgraph-{}.yaml", uuid::Uuid::new_v4()));

    FlowLoader::save_to_yaml(&config, &path).unwrap();
    let reloaded = FlowLoader::from_yaml_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(reloaded.flow.nodes.len(), 3);
    assert_eq!(reloaded.flow.nodes[1].retry_policy().max_attempts(), 2);
    assert_eq!(reloaded.flow.nodes[0].on.get("answer").map(String::as_str), Some("answer"));
    assert_eq!(reloaded.flow.params.get_str("topic"), Some("rust"));
}
