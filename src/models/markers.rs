//! 提示词与网关输出中的带内标记

/// 阶段分隔标记
pub const PAUSE_MARKER: &str = "[PAUSE]";

/// 最终诊断标记，其后第一行为诊断内容
pub const FINAL_DIAGNOSIS_MARKER: &str = "FINAL_DIAGNOSIS:";

/// 医嘱结果提示词中的固定指令
pub const ORDER_PROMPT_MARKER: &str = "Provide realistic results for these orders";

/// 复盘提示词中的固定指令
pub const DEBRIEF_PROMPT_MARKER: &str = "Provide a detailed case debrief";

/// 缺少诊断标记时使用的诊断
pub const DIAGNOSIS_NOT_PROVIDED: &str = "Not provided";
