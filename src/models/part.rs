//! 病例内容的基本单元：网关原始片段、展示片段与阶段

use serde::{Deserialize, Serialize};

/// 内联图片数据（与 Gemini `inlineData` 字段结构一致）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME 类型，例如 `image/png`
    pub mime_type: String,
    /// base64 编码的图片内容
    pub data: String,
}

/// 网关返回的原始片段，按接收顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPart {
    /// 文本片段
    Text { text: String },
    /// 内联图片
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl RawPart {
    pub fn text(text: impl Into<String>) -> Self {
        RawPart::Text { text: text.into() }
    }

    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        RawPart::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    /// 文本片段的内容，图片返回 None
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawPart::Text { text } => Some(text),
            RawPart::InlineData { .. } => None,
        }
    }
}

/// 展示片段：一个阶段内的一段文字或一张图片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { content: String },
    Image { mime_type: String, data: String },
}

impl Part {
    /// 图片的 data URI，可直接作为 `<img src>` 使用
    pub fn data_uri(&self) -> Option<String> {
        match self {
            Part::Image { mime_type, data } => Some(format!("data:{};base64,{}", mime_type, data)),
            Part::Text { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Part::Image { .. })
    }
}

/// 阶段：一次揭示的内容，片段顺序即叙事顺序
///
/// 空阶段是合法的（连续的暂停标记会产生空阶段），展示时什么也不渲染。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase(Vec<Part>);

impl Phase {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn parts(&self) -> &[Part] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, part: Part) {
        self.0.push(part);
    }

    pub fn image_count(&self) -> usize {
        self.0.iter().filter(|p| p.is_image()).count()
    }

    /// 阶段内的文字内容，用空格连接（图片不计入）
    pub fn text(&self) -> String {
        self.0
            .iter()
            .filter_map(|p| match p {
                Part::Text { content } => Some(content.as_str()),
                Part::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<Part>> for Phase {
    fn from(parts: Vec<Part>) -> Self {
        Self(parts)
    }
}
