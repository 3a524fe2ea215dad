//! OpenAI 兼容网关
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 聊天接口只返回文本，请求图片时把文本包装成单个片段

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::infrastructure::gateway::{AiGateway, GatewayResponse};

const SYSTEM_MESSAGE: &str = "You are an attending physician writing realistic, \
    internally consistent teaching cases for medical students.";

/// OpenAI 兼容网关
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model_name: String,
    has_credentials: bool,
    timeout: Duration,
}

impl OpenAiGateway {
    /// 创建新的网关
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            has_credentials: !config.llm_api_key.trim().is_empty(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    async fn chat(&self, user_message: &str) -> Result<String, GatewayError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_MESSAGE)
            .build()
            .map_err(|e| GatewayError::request_failed(&self.model_name, e))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| GatewayError::request_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.7)
            .build()
            .map_err(|e| GatewayError::request_failed(&self.model_name, e))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|e| GatewayError::request_failed(&self.model_name, e))?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                GatewayError::request_failed(&self.model_name, e)
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GatewayError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

impl AiGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        wants_images: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        if !self.has_credentials {
            return Err(GatewayError::not_configured("openai", "缺少 LLM_API_KEY"));
        }

        debug!(
            "调用 LLM API，模型: {}，提示词长度: {} 字符",
            self.model_name,
            prompt.len()
        );

        let text = self.chat(prompt).await?;

        if wants_images {
            Ok(GatewayResponse::Parts(vec![crate::models::RawPart::text(text)]))
        } else {
            Ok(GatewayResponse::Text(text))
        }
    }
}
