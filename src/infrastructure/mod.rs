//! 基础设施层
//!
//! 持有外部资源（HTTP 客户端、预设脚本），只暴露 `AiGateway` 能力。

pub mod gateway;
pub mod gemini_gateway;
pub mod openai_gateway;
pub mod scripted_gateway;

pub use gateway::{AiGateway, GatewayResponse};
pub use gemini_gateway::GeminiGateway;
pub use openai_gateway::OpenAiGateway;
pub use scripted_gateway::ScriptedGateway;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{Config, GatewayProvider};
use crate::error::{AppResult, GatewayError};

/// 按配置选择的网关
pub enum AnyGateway {
    Scripted(ScriptedGateway),
    OpenAi(OpenAiGateway),
    Gemini(GeminiGateway),
}

impl AiGateway for AnyGateway {
    fn name(&self) -> &str {
        match self {
            AnyGateway::Scripted(g) => g.name(),
            AnyGateway::OpenAi(g) => g.name(),
            AnyGateway::Gemini(g) => g.name(),
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        wants_images: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        match self {
            AnyGateway::Scripted(g) => g.generate(prompt, wants_images).await,
            AnyGateway::OpenAi(g) => g.generate(prompt, wants_images).await,
            AnyGateway::Gemini(g) => g.generate(prompt, wants_images).await,
        }
    }
}

/// 根据配置创建网关
///
/// 脚本网关会额外加载 `case_library_dir` 中的病例脚本。
/// 目录不存在或无法读取时返回 `AppError::File`，单个脚本解析失败只记录警告。
pub async fn build_gateway(config: &Config) -> AppResult<AnyGateway> {
    match config.gateway_provider {
        GatewayProvider::Mock => {
            let mut gateway = ScriptedGateway::new().with_latency(Duration::from_millis(300));
            if let Some(dir) = &config.case_library_dir {
                let scripts = crate::models::load_case_library(dir).await?;
                if scripts.is_empty() {
                    warn!("⚠️ 病例脚本目录中没有可用的脚本: {}", dir);
                }
                info!("📁 已加载 {} 个外部病例脚本", scripts.len());
                gateway = gateway.with_scripts(scripts);
            }
            Ok(AnyGateway::Scripted(gateway))
        }
        GatewayProvider::OpenAi => Ok(AnyGateway::OpenAi(OpenAiGateway::new(config))),
        GatewayProvider::Gemini => Ok(AnyGateway::Gemini(GeminiGateway::new(config)?)),
    }
}
