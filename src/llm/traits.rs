//! LLM 客户端抽象
//!
//! 每个后端（OpenAI 兼容 / DeepSeek / Ollama / Mock）实现 LlmClient。
//! 后端在构造时由配置显式选择，调用方不做任何基于模型名前缀的运行时分派。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::memory::Message;

/// LLM 层错误：配置类错误快速失败，传输类错误由通信协议统一归一
#[derive(Error, Debug)]
pub enum LlmError {
    /// 缺凭证、后端不支持请求的能力等——不可重试，直接上抛
    #[error("LLM config error: {0}")]
    Config(String),

    /// 网络 / HTTP / 提供商侧错误
    #[error("LLM API error: {0}")]
    Api(String),
}

/// 单次补全的选项
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// 联网增强模式（仅部分后端支持；不支持时为配置错误而非静默忽略）
    pub web_search: bool,
    /// 结构化输出提示（仅 Ollama 等支持 format 参数的后端使用）
    pub format: Option<Value>,
}

/// LLM 客户端 trait：接受消息列表与选项，返回生成文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// 是否支持联网增强补全
    fn supports_web_search(&self) -> bool {
        false
    }
}
