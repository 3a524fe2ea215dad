//! 教学白板 - 业务能力层
//!
//! 老师带学生分析外部病例时使用的四个有序列表：
//! 鉴别诊断、检查、辅助诊断、处置。各列表互相独立。

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// 白板列表类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardCategory {
    Differential,
    Labs,
    Diagnostics,
    Management,
}

impl BoardCategory {
    pub const ALL: [BoardCategory; 4] = [
        BoardCategory::Differential,
        BoardCategory::Labs,
        BoardCategory::Diagnostics,
        BoardCategory::Management,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BoardCategory::Differential => "differential",
            BoardCategory::Labs => "labs",
            BoardCategory::Diagnostics => "diagnostics",
            BoardCategory::Management => "management",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            BoardCategory::Differential => "Differential Diagnosis",
            BoardCategory::Labs => "Lab Investigations",
            BoardCategory::Diagnostics => "Diagnostic Tests",
            BoardCategory::Management => "Management Plan",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            BoardCategory::Differential => "Add a diagnosis...",
            BoardCategory::Labs => "Add a lab test...",
            BoardCategory::Diagnostics => "Add an imaging or procedure...",
            BoardCategory::Management => "Add a treatment step...",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "differential" | "ddx" => Some(BoardCategory::Differential),
            "labs" | "lab" => Some(BoardCategory::Labs),
            "diagnostics" | "dx" => Some(BoardCategory::Diagnostics),
            "management" | "mgmt" => Some(BoardCategory::Management),
            _ => None,
        }
    }
}

impl fmt::Display for BoardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 白板条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl BoardItem {
    fn new(label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            created_at: Utc::now(),
        }
    }
}

const AWAITING_INPUT: &str = "Awaiting input";

/// 白板状态
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    lists: HashMap<BoardCategory, Vec<BoardItem>>,
    /// 病例最终诊断（老师填写）
    pub case_dx: String,
    /// 教学笔记
    pub teaching_notes: String,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self, category: BoardCategory) -> &[BoardItem] {
        self.lists.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 追加条目，空白文本返回 None
    pub fn add(&mut self, category: BoardCategory, text: &str) -> Option<Uuid> {
        let label = text.trim();
        if label.is_empty() {
            return None;
        }
        let item = BoardItem::new(label.to_string());
        let id = item.id;
        self.lists.entry(category).or_default().push(item);
        debug!("白板 [{}] 新增: {}", category, label);
        Some(id)
    }

    /// 删除条目，返回是否删除成功
    pub fn remove(&mut self, category: BoardCategory, id: Uuid) -> bool {
        let Some(list) = self.lists.get_mut(&category) else {
            return false;
        };
        let before = list.len();
        list.retain(|item| item.id != id);
        list.len() != before
    }

    /// 把 `moved_id` 移到 `target_id` 所在的位置
    ///
    /// 任一条目不存在或两者相同时不做任何改变。
    pub fn reorder(&mut self, category: BoardCategory, moved_id: Uuid, target_id: Uuid) -> bool {
        if moved_id == target_id {
            return false;
        }
        let Some(list) = self.lists.get_mut(&category) else {
            return false;
        };
        let from = list.iter().position(|item| item.id == moved_id);
        let to = list.iter().position(|item| item.id == target_id);
        match (from, to) {
            (Some(from), Some(to)) => {
                let item = list.remove(from);
                list.insert(to, item);
                true
            }
            _ => false,
        }
    }

    /// 诊断把握度：鉴别诊断越多越低
    pub fn certainty_score(&self) -> u32 {
        let count = self.items(BoardCategory::Differential).len();
        if count == 0 {
            return 0;
        }
        100u32.saturating_sub(8 * (count as u32 - 1))
    }

    pub fn leading_diagnosis(&self) -> &str {
        self.items(BoardCategory::Differential)
            .first()
            .map(|item| item.label.as_str())
            .unwrap_or(AWAITING_INPUT)
    }

    pub fn reset(&mut self) {
        self.lists.clear();
        self.case_dx.clear();
        self.teaching_notes.clear();
    }
}
