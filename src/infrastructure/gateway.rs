//! AI 网关抽象 - 基础设施层
//!
//! 网关只暴露"给一段提示词，返回文本或图文片段"的能力，
//! 不认识病例、阶段或医嘱。

use crate::error::GatewayError;
use crate::models::part::RawPart;

/// 网关返回内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    /// 有序的图文片段（请求图片时）
    Parts(Vec<RawPart>),
    /// 纯文本
    Text(String),
}

impl GatewayResponse {
    /// 统一转换为片段序列
    pub fn into_parts(self) -> Vec<RawPart> {
        match self {
            GatewayResponse::Parts(parts) => parts,
            GatewayResponse::Text(text) => vec![RawPart::text(text)],
        }
    }

    /// 统一转换为文本，图片片段被忽略
    pub fn into_text(self) -> String {
        match self {
            GatewayResponse::Text(text) => text,
            GatewayResponse::Parts(parts) => parts
                .iter()
                .filter_map(RawPart::as_text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// AI 网关
///
/// 职责：
/// - 发送一次生成请求
/// - 把传输错误转换为 `GatewayError`
/// - 不重试，不缓存
#[allow(async_fn_in_trait)]
pub trait AiGateway {
    /// 网关名称（用于日志）
    fn name(&self) -> &str;

    /// 生成内容
    ///
    /// `wants_images` 为 true 时返回 `GatewayResponse::Parts`，否则返回文本。
    async fn generate(
        &self,
        prompt: &str,
        wants_images: bool,
    ) -> Result<GatewayResponse, GatewayError>;
}
