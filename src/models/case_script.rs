use serde::{Deserialize, Serialize};

use crate::models::part::RawPart;

/// 预设病例脚本
///
/// 离线网关的数据来源，`parts` 与网关原始输出的结构完全一致，
/// 可以包含 `[PAUSE]` 与 `FINAL_DIAGNOSIS:` 标记。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseScript {
    /// 最终诊断，用于按提示词中的主题选择脚本
    pub diagnosis: String,
    /// 适用的专科名称（可选）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    pub parts: Vec<RawPart>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl CaseScript {
    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}
