//! 流程层（Workflow Layer）
//!
//! 定义"一个病例"从生成到复盘的完整流程。
//!
//! - `case_state` - 会话状态与纯状态转换
//! - `case_flow` - 围绕网关请求的异步编排

pub mod case_flow;
pub mod case_state;

pub use case_flow::{CaseFlow, CaseStart, OrderOutcome};
pub use case_state::{Advance, CaseSession, CaseStage, InFlight, OrderStart, RequestKind};
