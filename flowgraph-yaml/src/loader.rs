use crate::config::FlowConfig;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// 流程加载器，支持从文件或字符串加载配置
pub struct FlowLoader;

impl FlowLoader {
    /// 从 YAML 文件加载流程配置
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<FlowConfig> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read YAML file: {:?}", path.as_ref())
        })?;
        Self::from_yaml_str(&content)
    }

    /// 从 YAML 字符串加载流程配置
    pub fn from_yaml_str(content: &str) -> Result<FlowConfig> {
        serde_yaml::from_str(content)
            .with_context(|| "Failed to parse YAML content")
    }

    /// 从 JSON 文件加载流程配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<FlowConfig> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read JSON file: {:?}", path.as_ref())
        })?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串加载流程配置
    pub fn from_json_str(content: &str) -> Result<FlowConfig> {
        serde_json::from_str(content)
            .with_context(|| "Failed to parse JSON content")
    }

    /// 保存流程配置到 YAML 文件
    pub fn save_to_yaml<P: AsRef<Path>>(config: &FlowConfig, path: P) -> Result<()> {
        let yaml_content = serde_yaml::to_string(config)
            .with_context(|| "Failed to serialize config to YAML")?;

        fs::write(&path, yaml_content).with_context(|| {
            format!("Failed to write YAML file: {:?}", path.as_ref())
        })?;

        Ok(())
    }

    /// 保存流程配置到 JSON 文件
    pub fn save_to_json<P: AsRef<Path>>(config: &FlowConfig, path: P) -> Result<()> {
        let json_content = serde_json::to_string_pretty(config)
            .with_context(|| "Failed to serialize config to JSON")?;

        fs::write(&path, json_content).with_context(|| {
            format!("Failed to write JSON file: {:?}", path.as_ref())
        })?;

        Ok(())
    }

    /// 验证流程配置的基本有效性
    pub fn validate(config: &FlowConfig) -> Result<()> {
        let flow = &config.flow;

        if flow.name.is_empty() {
            return Err(anyhow::anyhow!("Flow name cannot be empty"));
        }

        if flow.nodes.is_empty() {
            return Err(anyhow::anyhow!("Flow must contain at least one node"));
        }

        // 检查节点 ID 的唯一性
        let mut node_ids = HashSet::new();
        for node in &flow.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(anyhow::anyhow!("Duplicate node ID: {}", node.id));
            }
            if let Some(retry) = &node.retry {
                retry
                    .validate()
                    .with_context(|| format!("Invalid retry policy on node '{}'", node.id))?;
            }
        }

        if !node_ids.contains(flow.start.as_str()) {
            return Err(anyhow::anyhow!("Start node '{}' is not defined", flow.start));
        }

        // 检查转移目标
        for node in &flow.nodes {
            for (action, target) in node.transitions() {
                if action.is_empty() {
                    return Err(anyhow::anyhow!(
                        "Node '{}' has a transition with an empty action",
                        node.id
                    ));
                }
                if !node_ids.contains(target) {
                    return Err(anyhow::anyhow!(
                        "Node '{}' routes action '{}' to unknown node '{}'",
                        node.id,
                        action,
                        target
                    ));
                }
            }
        }

        Ok(())
    }
}
