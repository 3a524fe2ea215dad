/// 专科与核心诊断主题
use phf::phf_map;
use std::fmt;

/// 专科枚举（仪表盘上的可选项）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Specialty {
    Cardiovascular,
    Respiratory,
    Digestive,
    Renal,
    Endocrine,
    Hematology,
    Infectious,
    Neurology,
    Rheumatology,
    /// 随机病例，由模型自选专科
    Random,
}

/// 专科名称 → 核心诊断主题
static CORE_DIAGNOSES: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "Cardiovascular System" => &[
        "Myocardial Infarction", "Aortic Dissection", "Infective Endocarditis",
        "Pericarditis", "Atrial Fibrillation", "Heart Failure",
    ],
    "Respiratory System" => &[
        "Pulmonary Embolism", "Community-Acquired Pneumonia", "COPD Exacerbation",
        "Sarcoidosis", "Pneumothorax",
    ],
    "Nutritional & Digestive" => &[
        "Acute Pancreatitis", "Acute Cholangitis", "Upper GI Bleed",
        "Celiac Disease", "Hepatic Encephalopathy",
    ],
    "Renal & Urinary" => &[
        "Acute Kidney Injury", "Nephrotic Syndrome", "Pyelonephritis", "Hyperkalemia",
    ],
    "Endocrine System" => &[
        "Diabetic Ketoacidosis", "Thyroid Storm", "Adrenal Insufficiency",
        "Hypercalcemia of Malignancy",
    ],
    "Hematology & Oncology" => &[
        "Thrombotic Thrombocytopenic Purpura", "Tumor Lysis Syndrome",
        "Iron Deficiency Anemia", "Multiple Myeloma",
    ],
    "Infectious Disease" => &[
        "Sepsis", "Bacterial Meningitis", "Infectious Mononucleosis", "Tuberculosis",
    ],
    "Neurology" => &[
        "Ischemic Stroke", "Guillain-Barre Syndrome", "Myasthenia Gravis", "Subarachnoid Hemorrhage",
    ],
    "Rheumatology & MSK" => &[
        "Systemic Lupus Erythematosus", "Giant Cell Arteritis", "Gout", "Septic Arthritis",
    ],
};

/// 自动补全用的诊断目录（核心主题之外的常见鉴别）
const EXTRA_DIAGNOSES: &[&str] = &[
    "Unstable Angina",
    "Stable Angina",
    "Costochondritis",
    "GERD",
    "Peptic Ulcer Disease",
    "Panic Attack",
    "Asthma Exacerbation",
    "Cholecystitis",
    "Appendicitis",
    "Hypothyroidism",
    "Hyperthyroidism",
    "Urinary Tract Infection",
];

impl Specialty {
    pub const ALL: [Specialty; 10] = [
        Specialty::Cardiovascular,
        Specialty::Respiratory,
        Specialty::Digestive,
        Specialty::Renal,
        Specialty::Endocrine,
        Specialty::Hematology,
        Specialty::Infectious,
        Specialty::Neurology,
        Specialty::Rheumatology,
        Specialty::Random,
    ];

    /// 获取标准名称（同时出现在提示词中）
    pub fn name(self) -> &'static str {
        match self {
            Specialty::Cardiovascular => "Cardiovascular System",
            Specialty::Respiratory => "Respiratory System",
            Specialty::Digestive => "Nutritional & Digestive",
            Specialty::Renal => "Renal & Urinary",
            Specialty::Endocrine => "Endocrine System",
            Specialty::Hematology => "Hematology & Oncology",
            Specialty::Infectious => "Infectious Disease",
            Specialty::Neurology => "Neurology",
            Specialty::Rheumatology => "Rheumatology & MSK",
            Specialty::Random => "Random Case",
        }
    }

    /// 该专科的核心诊断主题，随机病例为空
    pub fn core_topics(self) -> &'static [&'static str] {
        CORE_DIAGNOSES.get(self.name()).copied().unwrap_or(&[])
    }

    /// 智能查找专科（先精确匹配名称，再做大小写不敏感的包含匹配）
    pub fn find(s: &str) -> Option<Self> {
        let s_lower = s.trim().to_lowercase();
        if s_lower.is_empty() {
            return None;
        }

        if let Some(specialty) = Self::ALL
            .iter()
            .find(|sp| sp.name().to_lowercase() == s_lower)
        {
            return Some(*specialty);
        }

        Self::ALL
            .iter()
            .find(|sp| sp.name().to_lowercase().contains(&s_lower))
            .copied()
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 鉴别诊断输入的自动补全
///
/// 大小写不敏感的子串匹配，最多返回 5 条；空输入返回空列表。
pub fn suggest_diagnoses(query: &str) -> Vec<&'static str> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut seen = std::collections::HashSet::new();
    Specialty::ALL
        .iter()
        .flat_map(|sp| sp.core_topics().iter().copied())
        .chain(EXTRA_DIAGNOSES.iter().copied())
        .filter(|d| d.to_lowercase().contains(&query))
        .filter(|d| seen.insert(*d))
        .take(5)
        .collect()
}
