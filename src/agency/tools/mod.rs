//! 工具层：推理引擎可调度的外部能力
//!
//! 统一契约：name / description / parameters_schema / execute -> ToolResult。
//! 引擎只看契约，不关心工具内部实现。

pub mod twitter;
pub mod web_search;

pub use twitter::TwitterPostTool;
pub use web_search::WebSearchTool;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// 工具执行结果：成功标志 + 数据 + 错误 + 元数据
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: None,
        }
    }

    pub fn ok_with_metadata(data: Value, metadata: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: Some(metadata),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            metadata: None,
        }
    }

    /// 用于推理历史的一行摘要
    pub fn summary(&self) -> String {
        if self.success {
            let text = self.data.to_string();
            if text.chars().count() > 120 {
                format!("{}...", text.chars().take(120).collect::<String>())
            } else {
                text
            }
        } else {
            format!("error: {}", self.error.as_deref().unwrap_or("unknown"))
        }
    }
}

/// 工具契约
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 参数的 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, args: &Map<String, Value>) -> ToolResult;
}

/// 按名索引的工具注册表
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tools(tools: &[Arc<dyn Tool>]) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(Arc::clone(tool));
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 注册顺序的 (name, description) 列表，用于拼决策提示词
    pub fn listing(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes its input back"
        }

        async fn execute(&self, args: &Map<String, Value>) -> ToolResult {
            ToolResult::ok(Value::Object(args.clone()))
        }
    }

    #[tokio::test]
    async fn test_registry_lookup_and_listing() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.listing()[0].0, "echo");

        let mut args = Map::new();
        args.insert("k".into(), json!("v"));
        let result = registry.get("echo").unwrap().execute(&args).await;
        assert!(result.success);
        assert_eq!(result.data["k"], json!("v"));
    }
}
