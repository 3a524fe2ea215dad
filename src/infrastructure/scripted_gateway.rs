//! 离线脚本网关
//!
//! 不访问网络，按提示词中的关键字返回预设内容：
//! - 病例生成：按提示词中的目标诊断或专科选择病例脚本
//! - 医嘱结果：按检查名称返回固定结果
//! - 复盘：返回带诊断名称的 HTML 模板

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::error::GatewayError;
use crate::infrastructure::gateway::{AiGateway, GatewayResponse};
use crate::models::case_script::CaseScript;
use crate::models::markers::{DEBRIEF_PROMPT_MARKER, ORDER_PROMPT_MARKER};
use crate::models::part::RawPart;

/// 1x1 PNG，占位插图
const PLACEHOLDER_IMAGE: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// 医嘱关键字 → 结果，按顺序匹配第一个命中的关键字
const ORDER_RESULTS: &[(&str, &str)] = &[
    ("CBC", "WBC: 15.2 (High), Hgb: 14.0, Plt: 250"),
    ("CMP", "Na: 138, K: 4.1, Cl: 102, CO2: 25, BUN: 20, Cr: 1.1, Glucose: 110"),
    ("Troponin", "Troponin I: 5.8 ng/mL (Elevated)"),
    ("CXR", "Portable chest X-ray shows no acute cardiopulmonary process. Cardiomediastinal silhouette is top-normal."),
    ("CT chest", "CT angiography of the chest reveals large bilateral pulmonary emboli. No evidence of aortic dissection."),
    ("CTPA", "CT angiography of the chest reveals large bilateral pulmonary emboli. No evidence of aortic dissection."),
    ("Medication: Aspirin", "Aspirin 324mg chewed and swallowed by the patient."),
];

const DEFAULT_ORDER_RESULT: &str =
    "The requested order was processed. No significant findings to report at this time.";

fn target_diagnosis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)final diagnosis is\s*\**\s*([^*\n]+?)\s*\**\s*\.").expect("valid regex")
    })
}

fn ordered_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)has ordered the following \w+: "(.*?)"\."#).expect("valid regex")
    })
}

fn debrief_diagnosis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)Final Diagnosis:\**[ \t]*(.+?)[ \t]*$").expect("valid regex")
    })
}

/// 离线脚本网关
pub struct ScriptedGateway {
    scripts: Vec<CaseScript>,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    /// 使用内置病例脚本创建
    pub fn new() -> Self {
        Self {
            scripts: builtin_scripts(),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// 追加外部病例脚本（同名诊断时外部脚本优先）
    pub fn with_scripts(mut self, scripts: Vec<CaseScript>) -> Self {
        let mut merged = scripts;
        merged.append(&mut self.scripts);
        self.scripts = merged;
        self
    }

    /// 模拟网络延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 已处理的请求数量
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn scripts(&self) -> &[CaseScript] {
        &self.scripts
    }

    /// 选择病例脚本：目标诊断 > 专科 > 第一个脚本
    fn select_script(&self, prompt: &str) -> Option<&CaseScript> {
        if let Some(caps) = target_diagnosis_regex().captures(prompt) {
            let target = caps[1].trim().to_lowercase();
            if let Some(script) = self
                .scripts
                .iter()
                .find(|s| s.diagnosis.to_lowercase() == target)
            {
                return Some(script);
            }
        }

        self.scripts
            .iter()
            .find(|s| {
                s.specialty
                    .as_deref()
                    .is_some_and(|sp| prompt.contains(sp))
            })
            .or_else(|| self.scripts.first())
    }

    /// 只在医嘱文本中查找关键字，病例摘要中的检查名称不参与匹配
    fn order_results(prompt: &str) -> &'static str {
        let ordered = ordered_text_regex()
            .captures(prompt)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(prompt);

        ORDER_RESULTS
            .iter()
            .find(|(keyword, _)| ordered.contains(keyword))
            .map(|(_, result)| *result)
            .unwrap_or(DEFAULT_ORDER_RESULT)
    }

    fn debrief(prompt: &str) -> String {
        let diagnosis = debrief_diagnosis_regex()
            .captures(prompt)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "Not specified".to_string());

        format!(
            r#"<h4 class="text-2xl font-bold text-cyan-300 mb-2">Final Diagnosis</h4>
<p class="text-xl text-white bg-gray-900/50 p-3 rounded-lg">{dx}</p>
<h5 class="text-xl font-bold text-cyan-300 mt-4 mb-2">Performance Score</h5>
<div class="space-y-2 p-3 bg-gray-900/50 rounded-lg text-gray-300">
    <p><strong class="text-white">Differential Accuracy (40%):</strong> 35/40. The primary diagnosis was considered early.</p>
    <p><strong class="text-white">Diagnostic Efficiency (25%):</strong> 20/25. Appropriate initial tests were ordered.</p>
    <p><strong class="text-white">Management Appropriateness (20%):</strong> 18/20. Initial management was timely.</p>
    <p><strong class="text-white">Safety Considerations (15%):</strong> 15/15. No safety issues identified.</p>
</div>
<h5 class="text-xl font-bold text-cyan-300 mt-4 mb-2">Key Learning Points</h5>
<div class="space-y-3 text-gray-300 p-3 bg-gray-900/50 rounded-lg">
    <p>This case is a classic presentation of {dx}. Early recognition and intervention are critical to improving outcomes.</p>
</div>"#,
            dx = diagnosis
        )
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl AiGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        wants_images: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if prompt.contains(DEBRIEF_PROMPT_MARKER) {
            debug!("脚本网关: 返回复盘模板");
            return Ok(GatewayResponse::Text(Self::debrief(prompt)));
        }

        if prompt.contains(ORDER_PROMPT_MARKER) {
            debug!("脚本网关: 返回医嘱结果");
            return Ok(GatewayResponse::Text(Self::order_results(prompt).to_string()));
        }

        let script = self.select_script(prompt).ok_or_else(|| GatewayError::EmptyContent {
            model: "scripted".to_string(),
        })?;
        debug!("脚本网关: 返回病例脚本 [{}]", script.diagnosis);

        let response = GatewayResponse::Parts(script.parts.clone());
        if wants_images {
            Ok(response)
        } else {
            Ok(GatewayResponse::Text(response.into_text()))
        }
    }
}

fn script(diagnosis: &str, specialty: &str, parts: Vec<RawPart>) -> CaseScript {
    CaseScript {
        diagnosis: diagnosis.to_string(),
        specialty: Some(specialty.to_string()),
        parts,
        file_path: None,
    }
}

fn image() -> RawPart {
    RawPart::image("image/png", PLACEHOLDER_IMAGE)
}

fn pause() -> RawPart {
    RawPart::text("[PAUSE]")
}

/// 内置病例脚本
pub fn builtin_scripts() -> Vec<CaseScript> {
    vec![
        script(
            "Myocardial Infarction",
            "Cardiovascular System",
            vec![
                RawPart::text("A 65-year-old male with a history of hypertension and hyperlipidemia presents to the emergency department with a chief complaint of chest pain. The pain started one hour ago, is substernal, and he describes it as a crushing sensation radiating to his left arm and jaw. He rates the pain as 9/10 in severity. He also reports diaphoresis and shortness of breath."),
                image(),
                pause(),
                RawPart::text("Vital Signs:\n- Blood Pressure: 160/95 mmHg\n- Heart Rate: 110 bpm\n- Respiratory Rate: 22 breaths/min\n- Oxygen Saturation: 94% on room air\n- Temperature: 37.0°C (98.6°F)"),
                pause(),
                RawPart::text("Physical Examination:\n- General: The patient is anxious and in visible distress.\n- Cardiovascular: Tachycardic rhythm, S4 gallop heard. No murmurs, rubs, or clicks.\n- Respiratory: Lungs are clear to auscultation bilaterally.\n- Extremities: Cool and clammy."),
                image(),
                pause(),
                RawPart::text("An initial ECG is obtained."),
                pause(),
                RawPart::text("The ECG shows ST-segment elevation in the anterior leads (V1-V4)."),
                RawPart::text("FINAL_DIAGNOSIS: Myocardial Infarction"),
            ],
        ),
        script(
            "Pulmonary Embolism",
            "Respiratory System",
            vec![
                RawPart::text("A 55-year-old female presents with sudden onset of shortness of breath and pleuritic chest pain. She recently traveled on a long-haul flight. She has a history of recent knee surgery."),
                image(),
                pause(),
                RawPart::text("Vital Signs:\n- BP: 110/70\n- HR: 120 bpm\n- RR: 28\n- SpO2: 91% on room air"),
                pause(),
                RawPart::text("Physical Exam:\n- Lungs: Clear to auscultation.\n- Heart: Tachycardic, but regular rhythm.\n- Extremities: Mild unilateral leg swelling."),
                pause(),
                RawPart::text("A CTPA is ordered."),
                pause(),
                RawPart::text("The CTPA reveals a large saddle embolus."),
                RawPart::text("FINAL_DIAGNOSIS: Pulmonary Embolism"),
            ],
        ),
        script(
            "Acute Pancreatitis",
            "Nutritional & Digestive",
            vec![
                RawPart::text("A 45-year-old male with a history of alcohol abuse presents with severe epigastric pain radiating to the back. The pain is constant and worsened by eating."),
                image(),
                pause(),
                RawPart::text("Vital Signs:\n- BP: 100/60\n- HR: 130 bpm\n- RR: 24\n- Temp: 38.5°C"),
                pause(),
                RawPart::text("Physical Exam:\n- Abdomen: Epigastric tenderness, guarding, and decreased bowel sounds."),
                pause(),
                RawPart::text("Labs are drawn."),
                pause(),
                RawPart::text("Lipase is markedly elevated at 3000 U/L."),
                RawPart::text("FINAL_DIAGNOSIS: Acute Pancreatitis"),
            ],
        ),
    ]
}
