//! 提示词构建 - 业务能力层
//!
//! 负责病例生成、医嘱结果、病例复盘三类提示词。
//! 只做字符串拼装，不调用网关。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::markers::{DEBRIEF_PROMPT_MARKER, ORDER_PROMPT_MARKER};
use crate::models::order::{OrderCategory, SubmittedOrders};
use crate::models::specialty::Specialty;

/// 病例主题选择器
///
/// 以 `topic_probability` 的概率从专科核心主题中随机选一个；
/// 固定种子时结果可复现。
pub struct TopicPicker {
    rng: StdRng,
    topic_probability: f64,
}

impl TopicPicker {
    pub fn new(topic_probability: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            topic_probability: topic_probability.clamp(0.0, 1.0),
        }
    }

    /// 选择主题；不选主题（或专科没有核心主题）时返回 None
    pub fn pick(&mut self, specialty: Specialty) -> Option<&'static str> {
        let topics = specialty.core_topics();
        if topics.is_empty() {
            return None;
        }
        if self.rng.gen::<f64>() >= self.topic_probability {
            return None;
        }
        let topic = topics[self.rng.gen_range(0..topics.len())];
        debug!("选择病例主题: {} [{}]", topic, specialty);
        Some(topic)
    }
}

const ILLUSTRATION_DIRECTIVES: &str = r#"**CRITICAL ILLUSTRATION DIRECTIVES:**
* **Patient Consistency (Most Important Rule):** A single, consistent patient MUST be depicted in all images for this case. The patient's appearance (age, hair, facial features, race, gender) must not change between illustrations.
* **Image Uniqueness:** DO NOT generate duplicate or visually similar images. Each illustration must be unique in composition, camera angle, and the scene depicted.
* **Art Style:** Generate ONLY authentic watercolor paintings with a muted, pastel palette. ABSOLUTELY NO other styles (sketches, cartoons, photorealism).
* **Content Restrictions:** Illustrations must ONLY depict the patient or clinical scenes. DO NOT generate radiological scans (X-rays, CTs) or internal procedures (endoscopies).
* **Guaranteed Illustrations:** The first illustration must appear before the first "[PAUSE]". When the physical exam is presented, an appropriate and unique illustration of the exam MUST be generated."#;

/// 构建病例生成提示词
///
/// # 参数
/// - `specialty`: 专科
/// - `topic`: 目标诊断（None 时由模型自由发挥）
/// - `cache_buster`: 写入提示词的唯一编号，避免服务端缓存
pub fn build_case_prompt(specialty: Specialty, topic: Option<&str>, cache_buster: i64) -> String {
    let (opening, objective_rule, diagnosis_rule) = match topic {
        Some(topic) => (
            format!(
                "Generate a medically complex, in-depth OSCE-style internal medicine case where the **final diagnosis is {}**. The case should be challenging and unfold in 15-20 parts. The specialty is {}.",
                topic, specialty
            ),
            "Do NOT use the name of the diagnosis or obvious buzzwords.".to_string(),
            format!(
                "At the very end, on a new line, write \"FINAL_DIAGNOSIS:\" followed ONLY by the correct diagnosis ({}).",
                topic
            ),
        ),
        None => (
            format!(
                "Generate a medically complex, in-depth OSCE-style internal medicine case. The case should be challenging and unfold in 15-20 parts. The specialty is {}. If 'Random Case', pick any internal medicine specialty.",
                specialty
            ),
            "Describe all findings objectively, avoiding buzzwords or eponyms.".to_string(),
            "At the very end, on a new line, write \"FINAL_DIAGNOSIS:\" followed by the correct diagnosis.".to_string(),
        ),
    };

    format!(
        r#"{opening} As you write the case, also generate and intersperse 3-4 illustrations.

**Instructions:**
1.  **Depth and Detail:** The case should be complex. Each part of the narrative (HPI, ROS, exam, labs) should be detailed and nuanced, creating a rich, realistic patient story. Avoid simple, one-line updates. The diagnostic pathway should often require multiple steps.

{illustrations}

2.  **Vital Signs & Exam Content:** The patient's vital signs and the entire physical examination section MUST each be presented as a single, uninterrupted block of text. Do not place a '[PAUSE]' marker within the vital signs list or the physical exam description.
3.  **Patient Presentation:** Start the case by describing the patient's age and relevant demographics, for example, "A 68-year-old male presents..." Do NOT give the patient a name.
4.  **Objective Findings Only:** {objective_rule}
5.  **Progressive Disclosure:** Separate case parts with the marker: "[PAUSE]".
6.  **Prompt for Actions:** Before revealing results, indicate that tests were ordered. For example: "Labs were ordered...[PAUSE]The results showed...".
7.  **Final Diagnosis Marker:** {diagnosis_rule}
8.  **Cache Buster:** ID: {cache_buster}.

Begin the case now."#,
        opening = opening,
        illustrations = ILLUSTRATION_DIRECTIVES,
        objective_rule = objective_rule,
        diagnosis_rule = diagnosis_rule,
        cache_buster = cache_buster,
    )
}

/// 构建医嘱结果提示词
///
/// # 参数
/// - `case_history`: 目前已展示的病例文字
/// - `category`: 医嘱类别
/// - `order_text`: 学生输入的原始医嘱
pub fn build_order_prompt(case_history: &str, category: OrderCategory, order_text: &str) -> String {
    format!(
        r#"Based on the following medical case: "{case_history}". The student has ordered the following {category}: "{order_text}".

**Instructions:**
1.  {marker}.
2.  Format lab results line-by-line (e.g., "HGB 11 g/dl (ref: 13-15 g/dL)").
3.  For imaging, provide a concise radiologist-style read.
4.  For management/consults, provide a brief, simulated note or action.
5.  If a test is not indicated or results would not be available, state that clearly.
6.  Be consistent. If the same test is ordered later, provide the same results.

Provide the results now."#,
        case_history = case_history,
        category = category,
        order_text = order_text,
        marker = ORDER_PROMPT_MARKER,
    )
}

/// 复盘提示词的输入
#[derive(Debug, Clone, Copy)]
pub struct DebriefInput<'a> {
    pub case_history: &'a str,
    pub final_diagnosis: &'a str,
    pub differential: &'a [String],
    pub orders: &'a SubmittedOrders,
}

/// 鉴别诊断前三位，缺失的位置用 "N/A"
fn top_three(differential: &[String]) -> [&str; 3] {
    let at = |i: usize| differential.get(i).map(String::as_str).unwrap_or("N/A");
    [at(0), at(1), at(2)]
}

fn join_or_none(items: &[String], sep: &str) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(sep)
    }
}

/// 构建病例复盘提示词
///
/// 要求网关返回带 Tailwind 类名的 HTML，调用方原样展示。
pub fn build_debrief_prompt(input: DebriefInput<'_>) -> String {
    let [first, second, third] = top_three(input.differential);

    format!(
        r#"An AI medical case has concluded.

**Case Summary:** {history}
**Final Diagnosis:** {dx}
**Student's Final Top 3 Differential Diagnoses:** 1. {first}, 2. {second}, 3. {third}
**Student's Lab Orders:** {labs}
**Student's Imaging Orders:** {imaging}
**Student's Management Plan:** {management}

**Your Task: {marker} using specific HTML and Tailwind CSS classes.** Ensure all text is light-colored and easily readable on a dark background.

1.  **Final Diagnosis:**
    <h4 class="text-2xl font-bold text-cyan-300 mb-2">Final Diagnosis</h4>
    <p class="text-xl text-white bg-gray-900/50 p-3 rounded-lg">{dx}</p>

2.  **Performance Score:**
    <h5 class="text-xl font-bold text-cyan-300 mt-4 mb-2">Performance Score</h5>
    <div class="space-y-2 p-3 bg-gray-900/50 rounded-lg text-gray-300">
        <!-- For each of the following, provide a score (e.g., 35/40) and rationale -->
        <p><strong class="text-white">Differential Accuracy (40%):</strong> [Your score here]. [Your brief rationale here].</p>
        <p><strong class="text-white">Diagnostic Efficiency (25%):</strong> [Your score here]. [Your brief rationale here].</p>
        <p><strong class="text-white">Management Appropriateness (20%):</strong> [Your score here]. [Your brief rationale here].</p>
        <p><strong class="text-white">Safety Considerations (15%):</strong> [Your score here]. [Your brief rationale here].</p>
    </div>

3.  **Discussion:**
    <h5 class="text-xl font-bold text-cyan-300 mt-4 mb-2">Discussion</h5>
    <div class="p-3 bg-gray-900/50 rounded-lg">
        <p class="text-gray-300 mb-2">Based on the presentation, other differentials to consider included:</p>
        <ul class="list-disc list-inside space-y-2 text-gray-300">
            <!-- Provide 2-3 other differentials with brief rationales in <li> tags -->
        </ul>
    </div>

4.  **Learning Points:**
    <h5 class="text-xl font-bold text-cyan-300 mt-4 mb-2">Key Learning Points</h5>
    <div class="space-y-3 text-gray-300 p-3 bg-gray-900/50 rounded-lg">
        <!-- Provide three detailed paragraphs on the final diagnosis covering pathophysiology, diagnosis, and treatment. Use <p> tags. -->
    </div>

5.  **Shelf Exam Question:**
    <h5 class="text-xl font-bold text-cyan-300 mt-4 mb-2">Shelf-Style Question</h5>
    <div class="space-y-2 text-gray-300 p-3 bg-gray-900/50 rounded-lg">
        <p>[Your multiple-choice question here].</p>
        <p>A) [Option A]</p>
        <p>B) [Option B]</p>
        <p>C) [Option C]</p>
        <p>D) [Option D]</p>
        <br>
        <p><strong class="text-white">Correct Answer:</strong> [Correct letter]</p>
        <p><strong class="text-white">Rationale:</strong> [Your detailed rationale here].</p>
    </div>"#,
        history = input.case_history,
        dx = input.final_diagnosis,
        first = first,
        second = second,
        third = third,
        labs = join_or_none(&input.orders.labs, ", "),
        imaging = join_or_none(&input.orders.imaging, ", "),
        management = join_or_none(&input.orders.management, ". "),
        marker = DEBRIEF_PROMPT_MARKER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_one_always_picks_topic() {
        let mut picker = TopicPicker::new(1.0, Some(7));
        for _ in 0..20 {
            let topic = picker.pick(Specialty::Respiratory).unwrap();
            assert!(Specialty::Respiratory.core_topics().contains(&topic));
        }
    }

    #[test]
    fn test_probability_zero_never_picks_topic() {
        let mut picker = TopicPicker::new(0.0, Some(7));
        for _ in 0..20 {
            assert!(picker.pick(Specialty::Cardiovascular).is_none());
        }
    }

    #[test]
    fn test_random_specialty_has_no_topic() {
        let mut picker = TopicPicker::new(1.0, None);
        assert!(picker.pick(Specialty::Random).is_none());
    }

    #[test]
    fn test_same_seed_same_topics() {
        let mut a = TopicPicker::new(0.5, Some(42));
        let mut b = TopicPicker::new(0.5, Some(42));
        let seq_a: Vec<_> = (0..10).map(|_| a.pick(Specialty::Neurology)).collect();
        let seq_b: Vec<_> = (0..10).map(|_| b.pick(Specialty::Neurology)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_case_prompt_branches() {
        let seeded = build_case_prompt(Specialty::Respiratory, Some("Sarcoidosis"), 1700000000000);
        assert!(seeded.contains("**final diagnosis is Sarcoidosis**."));
        assert!(seeded.contains("followed ONLY by the correct diagnosis (Sarcoidosis)"));
        assert!(seeded.contains("ID: 1700000000000."));

        let open = build_case_prompt(Specialty::Random, None, 1);
        assert!(open.contains("The specialty is Random Case."));
        assert!(!open.contains("final diagnosis is"));
        assert!(open.contains("[PAUSE]"));
    }

    #[test]
    fn test_order_prompt_embeds_history_and_order() {
        let prompt = build_order_prompt("A 65-year-old male.", OrderCategory::Labs, "CBC\nTroponin");
        assert!(prompt.contains(r#"medical case: "A 65-year-old male.""#));
        assert!(prompt.contains("ordered the following labs: \"CBC\nTroponin\"."));
        assert!(prompt.contains(ORDER_PROMPT_MARKER));
    }

    #[test]
    fn test_debrief_prompt_placeholders() {
        let orders = SubmittedOrders::default();
        let differential = vec!["Pulmonary Embolism".to_string()];
        let prompt = build_debrief_prompt(DebriefInput {
            case_history: "History.",
            final_diagnosis: "Pulmonary Embolism",
            differential: &differential,
            orders: &orders,
        });
        assert!(prompt.contains("1. Pulmonary Embolism, 2. N/A, 3. N/A"));
        assert!(prompt.contains("**Student's Lab Orders:** None"));
        assert!(prompt.contains("**Student's Management Plan:** None"));
        assert!(prompt.contains(DEBRIEF_PROMPT_MARKER));
    }

    #[test]
    fn test_debrief_prompt_orders_and_top_three_only() {
        let mut orders = SubmittedOrders::default();
        orders.push(OrderCategory::Labs, "CBC");
        orders.push(OrderCategory::Labs, "CMP");
        orders.push(OrderCategory::Management, "Medication: Aspirin");
        orders.push(OrderCategory::Management, "Consultation: Cardiology");
        let differential: Vec<String> = ["MI", "PE", "Dissection", "Pericarditis"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let prompt = build_debrief_prompt(DebriefInput {
            case_history: "History.",
            final_diagnosis: "Myocardial Infarction",
            differential: &differential,
            orders: &orders,
        });
        assert!(prompt.contains("1. MI, 2. PE, 3. Dissection\n"));
        assert!(!prompt.contains("Pericarditis"));
        assert!(prompt.contains("**Student's Lab Orders:** CBC, CMP"));
        assert!(prompt.contains("**Student's Imaging Orders:** None"));
        assert!(prompt.contains("Medication: Aspirin. Consultation: Cardiology"));
    }
}
