//! # Case Simulator
//!
//! 一个用于临床病例教学的 Rust 应用程序：AI 生成病例，逐步展示，
//! 学生开具医嘱、维护鉴别诊断，最后揭晓诊断并获得复盘。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露 `AiGateway` 能力
//! - `OpenAiGateway` / `GeminiGateway` / `ScriptedGateway`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 无 I/O 的业务能力
//! - `segmenter` - 把网关输出切分为阶段并提取诊断
//! - `prompt_builder` - 病例 / 医嘱 / 复盘提示词
//! - `OrderCache` - 医嘱结果缓存
//! - `BoardState` - 教学白板
//!
//! ### ③ 流程层（Workflow）
//! - `CaseSession` - 会话状态（单槽在途令牌）
//! - `CaseFlow` - 流程编排（生成 → 展示 → 医嘱 → 复盘）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 终端命令循环
//!
//! ## 模块结构
//!
//! ```text
//! config / error / logger / utils   环境配置、错误类型、日志
//! models                            阶段、医嘱、专科、病例脚本
//! infrastructure → services → workflow → orchestrator
//! ```

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, GatewayProvider};
pub use error::{AppError, AppResult};
pub use infrastructure::{build_gateway, AiGateway, AnyGateway, GatewayResponse, ScriptedGateway};
pub use models::{OrderCategory, Part, Phase, RawPart, Specialty, TrustedHtml};
pub use orchestrator::App;
pub use services::{segment, BoardCategory, BoardState, Segmentation};
pub use workflow::{Advance, CaseFlow, CaseSession, CaseStage, OrderOutcome};
