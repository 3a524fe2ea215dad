//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 管理应用生命周期，把终端输入调度到流程层和白板。
//!
//! ### `app` - 终端应用
//! - 初始化网关
//! - 命令循环与结果展示
//!
//! ### `command` - 命令解析
//! - 把一行输入解析为 `Command`
//!
//! ## 层次关系
//!
//! ```text
//! app (命令循环)
//!     ↓
//! workflow::CaseFlow (一个病例的完整流程)
//!     ↓
//! services (切分 / 提示词 / 缓存 / 白板)
//!     ↓
//! infrastructure (AI 网关)
//! ```

pub mod app;
pub mod command;

pub use app::App;
pub use command::{parse_command, Command};
