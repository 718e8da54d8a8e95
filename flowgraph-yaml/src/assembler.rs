use crate::config::FlowConfig;
use crate::loader::FlowLoader;
use crate::registry::NodeRegistry;
use anyhow::{Context, Result};
use flowgraph_core::{AsyncFlow, Diagnostics, Flow, Graph, NodeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// 根据配置和注册表组装流程
pub struct FlowAssembler<'a> {
    registry: &'a NodeRegistry,
    diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl<'a> FlowAssembler<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self {
            registry,
            diagnostics: None,
        }
    }

    /// 组装出的图使用该诊断接收器
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// 验证配置、创建节点并连接转移，返回图和起始节点
    pub fn build_graph(&self, config: &FlowConfig) -> Result<(Graph, NodeId)> {
        FlowLoader::validate(config)?;
        let flow = &config.flow;

        let mut graph = match &self.diagnostics {
            Some(diagnostics) => Graph::new().with_diagnostics(diagnostics.clone()),
            None => Graph::new(),
        };

        let mut ids = HashMap::with_capacity(flow.nodes.len());
        for node in &flow.nodes {
            let runnable = self
                .registry
                .create(node)
                .with_context(|| format!("Failed to create node '{}'", node.id))?;
            ids.insert(node.id.as_str(), graph.add_boxed(runnable));
        }

        for node in &flow.nodes {
            let from = ids[node.id.as_str()];
            for (action, target) in node.transitions() {
                graph
                    .connect_on(from, action, ids[target])
                    .with_context(|| format!("Failed to wire node '{}'", node.id))?;
            }
        }

        let start = ids[flow.start.as_str()];
        info!(flow = %flow.name, nodes = graph.len(), "assembled flow graph");
        Ok((graph, start))
    }

    /// 组装同步流程；包含异步节点时报错
    pub fn build_flow(&self, config: &FlowConfig) -> Result<Flow> {
        let (graph, start) = self.build_graph(config)?;
        if let Some(id) = graph
            .node_ids()
            .find(|id| graph.get(*id).is_some_and(|node| node.is_async()))
        {
            let node = &config.flow.nodes[id.index()];
            return Err(anyhow::anyhow!(
                "Node '{}' of kind '{}' is asynchronous; build an async flow instead",
                node.id,
                node.kind
            ));
        }

        let flow = &config.flow;
        let mut built = Flow::new(graph, start)
            .named(flow.name.clone())
            .with_params(flow.params.clone());
        if let Some(max_steps) = flow.max_steps {
            built = built.with_max_steps(max_steps);
        }
        Ok(built)
    }

    /// 组装异步流程，同步节点在其中内联运行
    pub fn build_async_flow(&self, config: &FlowConfig) -> Result<AsyncFlow> {
        let (graph, start) = self.build_graph(config)?;
        let flow = &config.flow;
        let mut built = AsyncFlow::new(graph, start)
            .named(flow.name.clone())
            .with_params(flow.params.clone());
        if let Some(max_steps) = flow.max_steps {
            built = built.with_max_steps(max_steps);
        }
        Ok(built)
    }
}
