//! 检查 / 影像 / 处置 医嘱

use serde::{Deserialize, Serialize};
use std::fmt;

/// 医嘱类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderCategory {
    /// 实验室检查
    Labs,
    /// 影像检查
    Imaging,
    /// 处置计划
    Management,
}

impl OrderCategory {
    pub const ALL: [OrderCategory; 3] = [
        OrderCategory::Labs,
        OrderCategory::Imaging,
        OrderCategory::Management,
    ];

    /// 固定标识，同时用于缓存键
    pub fn as_str(self) -> &'static str {
        match self {
            OrderCategory::Labs => "labs",
            OrderCategory::Imaging => "imaging",
            OrderCategory::Management => "management",
        }
    }

    /// 常用医嘱快捷项
    pub fn presets(self) -> &'static [&'static str] {
        match self {
            OrderCategory::Labs => &["CBC", "CMP", "UA", "Troponin", "TSH"],
            OrderCategory::Imaging => &["CXR", "CT chest", "CT AB/PEL", "CTPA", "MRI", "US", "TTE"],
            OrderCategory::Management => {
                &["Medication: ", "Procedure: ", "Consultation: ", "Disposition: "]
            }
        }
    }

    /// 从字符串解析类别（大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "labs" | "lab" => Some(OrderCategory::Labs),
            "imaging" | "image" => Some(OrderCategory::Imaging),
            "management" | "mgmt" => Some(OrderCategory::Management),
            _ => None,
        }
    }
}

impl fmt::Display for OrderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 医嘱缓存键：`类别:原始文本`
///
/// 精确匹配，大小写敏感，不做任何归一化。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey(String);

impl OrderKey {
    pub fn new(category: OrderCategory, raw_text: &str) -> Self {
        Self(format!("{}:{}", category.as_str(), raw_text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 已提交的医嘱（按类别保存原始文本）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedOrders {
    pub labs: Vec<String>,
    pub imaging: Vec<String>,
    pub management: Vec<String>,
}

impl SubmittedOrders {
    pub fn get(&self, category: OrderCategory) -> &[String] {
        match category {
            OrderCategory::Labs => &self.labs,
            OrderCategory::Imaging => &self.imaging,
            OrderCategory::Management => &self.management,
        }
    }

    pub fn push(&mut self, category: OrderCategory, raw_text: impl Into<String>) {
        let list = match category {
            OrderCategory::Labs => &mut self.labs,
            OrderCategory::Imaging => &mut self.imaging,
            OrderCategory::Management => &mut self.management,
        };
        list.push(raw_text.into());
    }

    pub fn total(&self) -> usize {
        self.labs.len() + self.imaging.len() + self.management.len()
    }
}
