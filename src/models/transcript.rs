//! 已展示给学生的病例记录

use serde::{Deserialize, Serialize};

use crate::models::order::OrderCategory;
use crate::models::part::Phase;

/// 记录条目：病例阶段或医嘱结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Phase(Phase),
    OrderResult {
        category: OrderCategory,
        content: String,
    },
}

impl TranscriptEntry {
    /// 条目的文字内容
    pub fn text(&self) -> String {
        match self {
            TranscriptEntry::Phase(phase) => phase.text(),
            TranscriptEntry::OrderResult { content, .. } => content.clone(),
        }
    }
}

/// 将整个记录拼成一段文字，作为提示词中的病例摘要
///
/// 只包含文字；图片不进入提示词。
pub fn transcript_text(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(TranscriptEntry::text)
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
