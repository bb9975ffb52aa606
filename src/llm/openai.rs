//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。
//! 可选配置一个带联网检索能力的模型名（如 gpt-4o-search-preview），启用增强模式时切换到该模型。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, LlmError};
use crate::memory::{Message, Role};

/// OpenAI 兼容客户端：持有 Client 与模型名，complete 时转 Message 为 API 格式并取首条 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 联网检索模型名；为 None 时该客户端不支持增强模式
    search_model: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            search_model: None,
        }
    }

    /// 配置联网检索模型，启用增强模式支持
    pub fn with_search_model(mut self, model: impl Into<String>) -> Self {
        self.search_model = Some(model.into());
        self
    }

    fn to_openai_messages(&self, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn supports_web_search(&self) -> bool {
        self.search_model.is_some()
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let model = if options.web_search {
            self.search_model
                .as_deref()
                .ok_or_else(|| {
                    LlmError::Config("web search not supported by this backend".to_string())
                })?
        } else {
            self.model.as_str()
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(self.to_openai_messages(messages))
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let message = response.choices.first().map(|c| &c.message);

        // 回复没有纯文本时（只有 tool call 载荷），序列化载荷作为返回串而不是报错
        let content = message
            .and_then(|m| m.content.clone())
            .or_else(|| {
                message
                    .and_then(|m| m.tool_calls.as_ref())
                    .and_then(|calls| serde_json::to_string(calls).ok())
            })
            .unwrap_or_default();

        Ok(content)
    }
}
