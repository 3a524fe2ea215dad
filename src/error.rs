use thiserror::Error;

use crate::workflow::case_state::{CaseStage, RequestKind};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// AI 网关相关错误
    #[error("网关错误: {0}")]
    Gateway(#[from] GatewayError),
    /// 病例会话状态错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 终端命令错误
    #[error("命令错误: {0}")]
    Command(#[from] CommandError),
}

/// AI 网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 缺少凭据或模型配置
    #[error("网关未配置 ({provider}): {reason}")]
    NotConfigured { provider: String, reason: String },
    /// 网络请求失败
    #[error("网关请求失败 (模型: {model}): {source}")]
    RequestFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务返回非成功状态码
    #[error("网关返回错误状态 (模型: {model}): status={status}, body={body}")]
    BadStatus {
        model: String,
        status: u16,
        body: String,
    },
    /// 返回结果为空
    #[error("网关返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 响应解析失败
    #[error("网关响应解析失败: {source}")]
    ParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 病例会话状态错误
///
/// 这些错误表示调用方在错误的阶段触发了操作，会话本身保持不变。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// 已有请求在途，拒绝并发请求
    #[error("已有请求在途 ({0:?})，请等待完成")]
    RequestInFlight(RequestKind),
    /// 当前阶段不允许此操作
    #[error("当前阶段 {stage:?} 不允许操作: {action}")]
    InvalidStage { stage: CaseStage, action: String },
    /// 病例尚未结束，不能揭晓诊断
    #[error("病例尚未全部展示 ({revealed}/{total})，不能揭晓诊断")]
    CaseNotComplete { revealed: usize, total: usize },
    /// 鉴别诊断索引越界
    #[error("鉴别诊断索引 {index} 超出范围 (共 {len} 项)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未知的网关类型
    #[error("未知的网关类型: {0}")]
    UnknownProvider(String),
}

/// 终端命令解析错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// 未知命令
    #[error("未知命令: {0}（输入 help 查看帮助）")]
    Unknown(String),
    /// 参数缺失或格式错误
    #[error("用法: {0}")]
    Usage(&'static str),
    /// 找不到对应的专科
    #[error("未知专科: {0}（输入 specialties 查看列表）")]
    UnknownSpecialty(String),
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::ParseFailed {
            source: Box::new(err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl GatewayError {
    /// 创建网关请求失败错误
    pub fn request_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        GatewayError::RequestFailed {
            model: model.into(),
            source: Box::new(source),
        }
    }

    /// 创建网关未配置错误
    pub fn not_configured(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::NotConfigured {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

impl SessionError {
    pub fn invalid_stage(stage: CaseStage, action: impl Into<String>) -> Self {
        SessionError::InvalidStage {
            stage,
            action: action.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
