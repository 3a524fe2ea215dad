//! Gemini generateContent 网关
//!
//! 直接使用 `reqwest` 调用 REST 接口。请求图片时打开
//! `TEXT` + `IMAGE` 两种输出模态，返回图文混排的片段。

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::infrastructure::gateway::{AiGateway, GatewayResponse};
use crate::models::part::RawPart;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<JsonValue>,
}

/// Gemini 网关
pub struct GeminiGateway {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiGateway {
    /// 创建新的网关
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::request_failed(&config.llm_model_name, e))?;

        Ok(Self {
            http,
            api_key: config.llm_api_key.clone(),
            api_base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
            text_model: config.llm_model_name.clone(),
            image_model: config.image_model_name.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base_url, model)
    }

    fn build_body(prompt: &str, wants_images: bool) -> JsonValue {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        });
        if wants_images {
            body["generationConfig"] = json!({ "responseModalities": ["TEXT", "IMAGE"] });
        }
        body
    }
}

/// 从响应体中取出第一个候选的片段
///
/// 不认识的片段（例如思考签名）直接跳过。
fn parse_parts(body: &str) -> Result<Vec<RawPart>, GatewayError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;

    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    Ok(parts
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawPart>(value).ok())
        .collect())
}

impl AiGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        wants_images: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::not_configured("gemini", "缺少 LLM_API_KEY"));
        }

        let model = if wants_images {
            &self.image_model
        } else {
            &self.text_model
        };
        debug!("调用 Gemini API，模型: {}，请求图片: {}", model, wants_images);

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_body(prompt, wants_images))
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini API 调用失败: {}", e);
                GatewayError::request_failed(model, e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::request_failed(model, e))?;

        if !status.is_success() {
            warn!("Gemini API 返回错误状态: {}", status);
            return Err(GatewayError::BadStatus {
                model: model.clone(),
                status: status.as_u16(),
                body: crate::utils::truncate_text(&body, 300),
            });
        }

        let parts = parse_parts(&body)?;
        if parts.is_empty() {
            return Err(GatewayError::EmptyContent {
                model: model.clone(),
            });
        }

        debug!("Gemini API 调用成功，返回 {} 个片段", parts.len());

        if wants_images {
            Ok(GatewayResponse::Parts(parts))
        } else {
            Ok(GatewayResponse::Text(GatewayResponse::Parts(parts).into_text()))
        }
    }
}
