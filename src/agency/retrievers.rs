//! 检索器层：Agent 可携带的外部知识源（向量库、文档库）
//!
//! 与工具契约同形：name / description / query -> RetrievalResult。
//! Agent 按注册顺序逐个查询，取第一个成功结果补充提示词上下文。

use async_trait::async_trait;
use serde_json::Value;

/// 检索结果：成功标志 + 数据 + 错误
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl RetrievalResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// 检索器契约
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn query(&self, query: &str) -> RetrievalResult;
}
