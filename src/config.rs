use std::str::FromStr;

use crate::error::ConfigError;

/// 使用哪一种 AI 网关
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayProvider {
    /// 离线脚本网关，按提示词关键字返回预设内容
    Mock,
    /// OpenAI 兼容的聊天接口（只返回文本）
    OpenAi,
    /// Gemini generateContent 接口（可返回图文混排）
    Gemini,
}

impl FromStr for GatewayProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" | "scripted" => Ok(GatewayProvider::Mock),
            "openai" => Ok(GatewayProvider::OpenAi),
            "gemini" => Ok(GatewayProvider::Gemini),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 网关类型
    pub gateway_provider: GatewayProvider,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 生成病例时使用的图文模型（仅 Gemini 网关）
    pub image_model_name: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 按核心主题生成病例的概率
    pub topic_probability: f64,
    /// 随机数种子，None 表示使用系统熵
    pub rng_seed: Option<u64>,
    /// 额外病例脚本（TOML）所在目录
    pub case_library_dir: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_provider: GatewayProvider::Mock,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            image_model_name: "gemini-2.0-flash-preview-image-generation".to_string(),
            request_timeout_secs: 120,
            topic_probability: 0.7,
            rng_seed: None,
            case_library_dir: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            gateway_provider: std::env::var("GATEWAY_PROVIDER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.gateway_provider),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            image_model_name: std::env::var("IMAGE_MODEL_NAME").unwrap_or(default.image_model_name),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            topic_probability: std::env::var("TOPIC_PROBABILITY").ok().and_then(|v| v.parse().ok()).map(clamp_probability).unwrap_or(default.topic_probability),
            rng_seed: std::env::var("RNG_SEED").ok().and_then(|v| v.parse().ok()).or(default.rng_seed),
            case_library_dir: std::env::var("CASE_LIBRARY_DIR").ok().filter(|v| !v.trim().is_empty()).or(default.case_library_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}
