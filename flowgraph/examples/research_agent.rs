//! A small research agent: decide whether to search or answer, fan out the
//! searches concurrently, loop until enough material is collected.
//!
//! Run with `RUST_LOG=info cargo run --example research_agent --features logger`.

use flowgraph::anyhow::{anyhow, Result};
use flowgraph::async_trait;
use flowgraph::logger::Logger;
use flowgraph::prelude::*;
use serde_json::json;
use std::time::Duration;

const AGENT: &str = r#"
flow:
  name: research_agent
  start: decide
  params:
    question: "What makes Rust memory safe?"
  max_steps: 20
  nodes:
    - id: decide
      kind: decide
      settings: { rounds: 2 }
      on:
        search: search
        answer: answer
    - id: search
      kind: search
      retry: { max_attempts: 3, wait_ms: 20, strategy: { type: exponential, multiplier: 2.0 } }
      parallel: { max_concurrency: 3 }
      on:
        decide: decide
    - id: answer
      kind: answer
"#;

struct Decide {
    rounds: u64,
}

impl Node for Decide {
    type Prep = u64;
    type Exec = &'static str;

    fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> Result<u64> {
        Ok(shared.get("round").and_then(|v| v.as_u64()).unwrap_or(0))
    }

    fn execute(&self, round: &u64, _: &NodeContext) -> Result<&'static str> {
        Ok(if *round < self.rounds { "search" } else { "answer" })
    }

    fn finalize(
        &self,
        _: &SharedStore,
        _: u64,
        action: &'static str,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        Ok(Some(action.into()))
    }
}

/// Queries several sources at once; the first attempt of each query is
/// throttled to show retries.
struct Search;

#[async_trait]
impl AsyncBatchNode for Search {
    type Item = String;
    type Output = String;

    async fn prepare(&self, shared: &SharedStore, ctx: &NodeContext) -> Result<Vec<String>> {
        let question = ctx
            .params()
            .get_str("question")
            .ok_or_else(|| anyhow!("question parameter missing"))?;
        let round = shared.get("round").and_then(|v| v.as_u64()).unwrap_or(0);
        Ok(["docs", "forum", "book"]
            .iter()
            .map(|source| format!("{source}#{round}: {question}"))
            .collect())
    }

    async fn execute(&self, query: &String, ctx: &NodeContext) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(15)).await;
        if ctx.attempt() == 0 {
            return Err(anyhow!("throttled"));
        }
        Ok(format!("notes for {query}"))
    }

    async fn finalize(
        &self,
        shared: &SharedStore,
        _: Vec<String>,
        notes: Vec<String>,
        _: &NodeContext,
    ) -> Result<Option<Action>> {
        shared.update("notes", |all| {
            let mut merged = all.as_array().cloned().unwrap_or_default();
            merged.extend(notes.into_iter().map(|note| json!(note)));
            *all = json!(merged);
        });
        shared.update("round", |round| {
            *round = json!(round.as_u64().unwrap_or(0) + 1);
        });
        Ok(Some("decide".into()))
    }
}

struct Answer;

impl Node for Answer {
    type Prep = usize;
    type Exec = String;

    fn prepare(&self, shared: &SharedStore, _: &NodeContext) -> Result<usize> {
        Ok(shared
            .get("notes")
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or(0))
    }

    fn execute(&self, notes: &usize, ctx: &NodeContext) -> Result<String> {
        let question = ctx.params().get_str("question").unwrap_or("?");
        Ok(format!("{question} Answered from {notes} notes."))
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

#[tokio::main]
async fn main() -> Result<()> {
    Logger::init_tracing()?;

    let mut registry = NodeRegistry::new();
    registry
        .register_node("decide", |config: &NodeConfig| {
            let rounds = config.settings["rounds"].as_u64().unwrap_or(1);
            Ok(Decide { rounds })
        })
        .register_parallel_batch("search", |_| Ok(Search))
        .register_node("answer", |_| Ok(Answer));

    let config = FlowLoader::from_yaml_str(AGENT)?;
    let flow = FlowAssembler::new(&registry).build_async_flow(&config)?;

    let shared = SharedStore::new();
    let logger = Logger::for_store(&shared);
    logger.info("starting research agent");

    flow.run_async(&shared).await?;

    logger.info(&shared.get_str("answer").unwrap_or_default());
    logger.log_store_summary(&shared);
    Ok(())
}
