use crate::config::NodeConfig;
use anyhow::{anyhow, Result};
use flowgraph_core::{
    AsyncBatchNode, AsyncBatchRunner, AsyncNode, AsyncNodeRunner, BatchNode, BatchRunner, Node,
    NodeRunner, Runnable,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 根据节点配置创建可运行节点的工厂
pub type NodeFactory = Arc<dyn Fn(&NodeConfig) -> Result<Box<dyn Runnable>> + Send + Sync>;

/// 节点类型注册表，`kind` 到工厂的映射
#[derive(Clone, Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册原始工厂，返回的节点按原样加入图中
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&NodeConfig) -> Result<Box<dyn Runnable>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(kind = %kind, "node kind registered twice, keeping the latest");
        }
        self
    }

    /// 注册同步节点；重试策略和参数取自节点配置
    pub fn register_node<N, F>(&mut self, kind: impl Into<String>, make: F) -> &mut Self
    where
        N: Node + 'static,
        F: Fn(&NodeConfig) -> Result<N> + Send + Sync + 'static,
    {
        self.register(kind, move |config| {
            let runner = NodeRunner::new(make(config)?)
                .with_retry(config.retry_policy())
                .with_params(config.params.clone());
            Ok(Box::new(runner) as Box<dyn Runnable>)
        })
    }

    pub fn register_batch<B, F>(&mut self, kind: impl Into<String>, make: F) -> &mut Self
    where
        B: BatchNode + 'static,
        F: Fn(&NodeConfig) -> Result<B> + Send + Sync + 'static,
    {
        self.register(kind, move |config| {
            let runner = BatchRunner::new(make(config)?)
                .with_retry(config.retry_policy())
                .with_params(config.params.clone());
            Ok(Box::new(runner) as Box<dyn Runnable>)
        })
    }

    pub fn register_async_node<N, F>(&mut self, kind: impl Into<String>, make: F) -> &mut Self
    where
        N: AsyncNode + 'static,
        F: Fn(&NodeConfig) -> Result<N> + Send + Sync + 'static,
    {
        self.register(kind, move |config| {
            let runner = AsyncNodeRunner::new(make(config)?)
                .with_retry(config.retry_policy())
                .with_params(config.params.clone());
            Ok(Box::new(runner) as Box<dyn Runnable>)
        })
    }

    pub fn register_async_batch<B, F>(&mut self, kind: impl Into<String>, make: F) -> &mut Self
    where
        B: AsyncBatchNode + 'static,
        F: Fn(&NodeConfig) -> Result<B> + Send + Sync + 'static,
    {
        self.register(kind, move |config| {
            let runner = AsyncBatchRunner::new(make(config)?)
                .with_retry(config.retry_policy())
                .with_params(config.params.clone());
            Ok(Box::new(runner) as Box<dyn Runnable>)
        })
    }

    /// 注册并行批处理节点；并行配置取自节点的 `parallel` 字段
    #[cfg(feature = "runtime")]
    pub fn register_parallel_batch<B, F>(&mut self, kind: impl Into<String>, make: F) -> &mut Self
    where
        B: AsyncBatchNode + 'static,
        F: Fn(&NodeConfig) -> Result<B> + Send + Sync + 'static,
    {
        self.register(kind, move |config| {
            let runner = flowgraph_runtime::ParallelBatchRunner::new(make(config)?)
                .with_config(config.parallel.clone().unwrap_or_default())
                .with_retry(config.retry_policy())
                .with_params(config.params.clone());
            Ok(Box::new(runner) as Box<dyn Runnable>)
        })
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// 已注册的类型，按字母排序
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// 按配置中的 `kind` 创建节点
    pub fn create(&self, config: &NodeConfig) -> Result<Box<dyn Runnable>> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            anyhow!(
                "Unknown node kind '{}' for node '{}' (registered: {:?})",
                config.kind,
                config.id,
                self.kinds()
            )
        })?;
        factory(config)
    }
}
