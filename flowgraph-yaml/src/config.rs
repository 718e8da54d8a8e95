use flowgraph_context::Params;
use flowgraph_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 完整的流程配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub flow: FlowDefinition,
}

/// 流程定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    /// 起始节点 ID
    pub start: String,
    /// 流程自身参数，传递给每个节点
    #[serde(default)]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
    pub nodes: Vec<NodeConfig>,
}

/// 节点定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    /// 在 `NodeRegistry` 中注册的节点类型
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    /// 节点作为入口单独运行时使用的参数
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    /// 交给节点工厂的任意配置
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub settings: serde_json::Value,
    #[cfg(feature = "runtime")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<flowgraph_runtime::ParallelConfig>,
    /// 默认动作的后继节点
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// 具名动作到后继节点的映射
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, String>,
}

impl NodeConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default()
    }

    /// 所有出边：`(动作, 目标节点)`
    pub fn transitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.next
            .iter()
            .map(|to| (flowgraph_core::Action::DEFAULT, to.as_str()))
            .chain(self.on.iter().map(|(action, to)| (action.as_str(), to.as_str())))
    }
}
