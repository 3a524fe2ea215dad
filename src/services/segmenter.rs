//! 阶段切分 - 业务能力层
//!
//! 把网关返回的原始片段按 `[PAUSE]` 切成有序的阶段，
//! 并从全文中提取 `FINAL_DIAGNOSIS:` 之后的诊断。

use crate::models::markers::{FINAL_DIAGNOSIS_MARKER, PAUSE_MARKER};
use crate::models::part::{Part, Phase, RawPart};

/// 切分结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub phases: Vec<Phase>,
    /// 最终诊断；没有诊断标记或标记后为空时为 None
    pub final_diagnosis: Option<String>,
}

impl Segmentation {
    pub fn image_count(&self) -> usize {
        self.phases.iter().map(Phase::image_count).sum()
    }
}

/// 分离诊断标记
///
/// 返回 (标记之前的文本, 诊断)。诊断只取标记后的第一行，
/// 遇到换行、`[PAUSE]` 或重复的诊断标记即结束。
/// 对返回的第一项再次调用时不会发生任何变化。
pub fn extract_final_diagnosis(text: &str) -> (&str, Option<String>) {
    match text.find(FINAL_DIAGNOSIS_MARKER) {
        Some(pos) => {
            let rest = text[pos + FINAL_DIAGNOSIS_MARKER.len()..].trim_start();
            let end = [
                rest.find('\n'),
                rest.find(PAUSE_MARKER),
                rest.find(FINAL_DIAGNOSIS_MARKER),
            ]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(rest.len());
            let diagnosis = rest[..end].trim();
            let diagnosis = (!diagnosis.is_empty()).then(|| diagnosis.to_string());
            (&text[..pos], diagnosis)
        }
        None => (text, None),
    }
}

/// 按接收顺序切分片段
///
/// - 文本：先去掉诊断标记及其之后的内容，再按暂停标记切分；
///   每段去空白后非空才加入当前阶段；除最后一段外，每个分界都会关闭当前阶段。
///   诊断标记出现之后的文本片段都不进入任何阶段
/// - 图片：加入当前阶段，本身不产生分界
/// - 结束时当前阶段非空则作为最后一个阶段
pub fn segment(parts: &[RawPart]) -> Segmentation {
    let full_text: String = parts.iter().filter_map(RawPart::as_text).collect();
    let (_, final_diagnosis) = extract_final_diagnosis(&full_text);

    let mut phases = Vec::new();
    let mut current = Phase::new();
    let mut after_marker = false;

    for raw in parts {
        match raw {
            RawPart::Text { .. } if after_marker => {}
            RawPart::Text { text } => {
                let (clean, _) = extract_final_diagnosis(text);
                after_marker = clean.len() < text.len();
                let segments: Vec<&str> = clean.split(PAUSE_MARKER).collect();
                let last = segments.len() - 1;

                for (index, segment) in segments.iter().enumerate() {
                    let trimmed = segment.trim();
                    if !trimmed.is_empty() {
                        current.push(Part::Text {
                            content: trimmed.to_string(),
                        });
                    }
                    if index < last {
                        phases.push(std::mem::take(&mut current));
                    }
                }
            }
            RawPart::InlineData { inline_data } => {
                current.push(Part::Image {
                    mime_type: inline_data.mime_type.clone(),
                    data: inline_data.data.clone(),
                });
            }
        }
    }

    if !current.is_empty() {
        phases.push(current);
    }

    Segmentation {
        phases,
        final_diagnosis,
    }
}
