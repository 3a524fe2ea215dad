//! 病例会话状态 - 流程层
//!
//! 所有状态转换都是同步的纯操作，不做任何 I/O。
//! 网关请求由 `CaseFlow` 发起，结果通过 `apply_*` 写回。
//!
//! 并发约束：同一时刻只允许一个在途请求（单槽令牌）。
//! 每次开始新病例或返回首页都会递增 epoch，旧令牌的响应会被丢弃。

use std::fmt;

use tracing::{debug, warn};

use crate::error::SessionError;
use crate::models::debrief::TrustedHtml;
use crate::models::markers::DIAGNOSIS_NOT_PROVIDED;
use crate::models::order::{OrderCategory, SubmittedOrders};
use crate::models::part::Phase;
use crate::models::specialty::Specialty;
use crate::models::transcript::{transcript_text, TranscriptEntry};
use crate::services::order_cache::OrderCache;
use crate::services::prompt_builder::DebriefInput;
use crate::services::segmenter::Segmentation;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseStage {
    /// 首页，尚未选择专科
    #[default]
    NotStarted,
    /// 病例生成中
    Generating,
    /// 病例逐步展示中
    InProgress,
    /// 所有阶段均已展示
    Complete,
    /// 已揭晓诊断并展示复盘
    DebriefShown,
}

impl fmt::Display for CaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaseStage::NotStarted => "未开始",
            CaseStage::Generating => "生成中",
            CaseStage::InProgress => "进行中",
            CaseStage::Complete => "已展示完毕",
            CaseStage::DebriefShown => "复盘中",
        };
        f.write_str(name)
    }
}

/// 在途请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    CaseGeneration,
    OrderResults,
    Debrief,
}

/// 在途请求令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub id: u64,
    pub kind: RequestKind,
    pub epoch: u64,
}

/// `advance` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 展示了第 `index` 个阶段（从 0 开始）
    Revealed { index: usize, total: usize },
    /// 所有阶段已展示，状态不变
    AlreadyComplete,
    /// 病例没有任何阶段（生成失败或响应为空）
    NoPhases,
}

/// `begin_order` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStart {
    /// 医嘱为空，忽略
    Rejected,
    /// 命中缓存，结果已写入记录
    Cached(String),
    /// 需要请求网关
    Dispatch(InFlight),
}

/// 病例会话
#[derive(Debug, Default)]
pub struct CaseSession {
    stage: CaseStage,
    specialty: Option<Specialty>,
    pending: Vec<Phase>,
    cursor: usize,
    transcript: Vec<TranscriptEntry>,
    differential: Vec<String>,
    orders: SubmittedOrders,
    cache: OrderCache,
    final_diagnosis: Option<String>,
    debrief: Option<TrustedHtml>,
    in_flight: Option<InFlight>,
    epoch: u64,
    next_request_id: u64,
}

impl CaseSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 只读访问 ==========

    pub fn stage(&self) -> CaseStage {
        self.stage
    }

    pub fn specialty(&self) -> Option<Specialty> {
        self.specialty
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// 已展示内容的纯文字
    pub fn transcript_text(&self) -> String {
        transcript_text(&self.transcript)
    }

    pub fn differential(&self) -> &[String] {
        &self.differential
    }

    pub fn orders(&self) -> &SubmittedOrders {
        &self.orders
    }

    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }

    pub fn final_diagnosis(&self) -> Option<&str> {
        self.final_diagnosis.as_deref()
    }

    pub fn debrief(&self) -> Option<&TrustedHtml> {
        self.debrief.as_ref()
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 已展示的阶段数
    pub fn revealed(&self) -> usize {
        self.cursor
    }

    pub fn total_phases(&self) -> usize {
        self.pending.len()
    }

    /// 所有阶段均已展示（且至少有一个阶段）
    pub fn is_complete(&self) -> bool {
        !self.pending.is_empty() && self.cursor >= self.pending.len()
    }

    // ========== 在途令牌 ==========

    fn claim(&mut self, kind: RequestKind) -> Result<InFlight, SessionError> {
        if let Some(current) = self.in_flight {
            return Err(SessionError::RequestInFlight(current.kind));
        }
        self.next_request_id += 1;
        let token = InFlight {
            id: self.next_request_id,
            kind,
            epoch: self.epoch,
        };
        self.in_flight = Some(token);
        Ok(token)
    }

    /// 令牌匹配时释放在途槽；不匹配说明响应已过期
    fn release(&mut self, token: InFlight) -> bool {
        if self.in_flight == Some(token) && token.epoch == self.epoch {
            self.in_flight = None;
            true
        } else {
            warn!(
                "丢弃过期响应: {:?} #{} (epoch {} → 当前 {})",
                token.kind, token.id, token.epoch, self.epoch
            );
            false
        }
    }

    fn clear_case(&mut self) {
        self.specialty = None;
        self.pending.clear();
        self.cursor = 0;
        self.transcript.clear();
        self.differential.clear();
        self.orders = SubmittedOrders::default();
        self.cache.clear();
        self.final_diagnosis = None;
        self.debrief = None;
        self.in_flight = None;
        self.epoch += 1;
    }

    // ========== 病例生成 ==========

    /// 开始新病例：清空会话并占用在途槽
    pub fn begin_case(&mut self, specialty: Specialty) -> Result<InFlight, SessionError> {
        if let Some(current) = self.in_flight {
            return Err(SessionError::RequestInFlight(current.kind));
        }
        self.clear_case();
        self.specialty = Some(specialty);
        self.stage = CaseStage::Generating;
        self.claim(RequestKind::CaseGeneration)
    }

    /// 写入生成结果并自动展示第一个阶段
    ///
    /// 令牌过期时返回 None，会话不变。
    pub fn apply_generation(&mut self, token: InFlight, segmentation: Segmentation) -> Option<Advance> {
        if !self.release(token) {
            return None;
        }
        self.pending = segmentation.phases;
        self.cursor = 0;
        self.final_diagnosis = Some(
            segmentation
                .final_diagnosis
                .unwrap_or_else(|| DIAGNOSIS_NOT_PROVIDED.to_string()),
        );
        self.stage = CaseStage::InProgress;
        debug!("病例已载入: {} 个阶段", self.pending.len());
        Some(self.reveal_next())
    }

    // ========== 逐步展示 ==========

    fn reveal_next(&mut self) -> Advance {
        if self.pending.is_empty() {
            return Advance::NoPhases;
        }
        if self.cursor >= self.pending.len() {
            return Advance::AlreadyComplete;
        }
        let index = self.cursor;
        self.transcript
            .push(TranscriptEntry::Phase(self.pending[index].clone()));
        self.cursor += 1;
        if self.is_complete() && self.stage == CaseStage::InProgress {
            self.stage = CaseStage::Complete;
        }
        Advance::Revealed {
            index,
            total: self.pending.len(),
        }
    }

    /// 展示下一个阶段；已全部展示时不做任何改变
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        match self.stage() {
            CaseStage::InProgress | CaseStage::Complete | CaseStage::DebriefShown => {
                Ok(self.reveal_next())
            }
            stage => Err(SessionError::invalid_stage(stage, "advance")),
        }
    }

    // ========== 医嘱 ==========

    /// 提交医嘱：空白忽略，命中缓存直接写入记录，否则占用在途槽
    pub fn begin_order(
        &mut self,
        category: OrderCategory,
        raw_text: &str,
    ) -> Result<OrderStart, SessionError> {
        match self.stage() {
            CaseStage::InProgress | CaseStage::Complete => {}
            stage => return Err(SessionError::invalid_stage(stage, "order")),
        }
        if raw_text.trim().is_empty() {
            return Ok(OrderStart::Rejected);
        }
        if let Some(cached) = self.cache.get(category, raw_text) {
            let content = cached.to_string();
            self.transcript.push(TranscriptEntry::OrderResult {
                category,
                content: content.clone(),
            });
            return Ok(OrderStart::Cached(content));
        }
        self.claim(RequestKind::OrderResults).map(OrderStart::Dispatch)
    }

    /// 写入医嘱结果
    ///
    /// 只有成功的结果进入缓存；失败时的占位文字仍写入记录，
    /// 再次提交同一医嘱会重新请求。
    pub fn apply_order(
        &mut self,
        token: InFlight,
        category: OrderCategory,
        raw_text: &str,
        result: Result<String, String>,
    ) -> bool {
        if !self.release(token) {
            return false;
        }
        let content = match result {
            Ok(content) => {
                self.cache.insert(category, raw_text, content.clone());
                content
            }
            Err(placeholder) => placeholder,
        };
        self.orders.push(category, raw_text);
        self.transcript
            .push(TranscriptEntry::OrderResult { category, content });
        true
    }

    // ========== 揭晓诊断 ==========

    pub fn begin_debrief(&mut self) -> Result<InFlight, SessionError> {
        match self.stage() {
            CaseStage::InProgress | CaseStage::Complete => {}
            stage => return Err(SessionError::invalid_stage(stage, "reveal")),
        }
        if !self.is_complete() {
            return Err(SessionError::CaseNotComplete {
                revealed: self.cursor,
                total: self.pending.len(),
            });
        }
        self.claim(RequestKind::Debrief)
    }

    /// 复盘提示词所需的数据
    pub fn debrief_input<'a>(&'a self, case_history: &'a str) -> DebriefInput<'a> {
        DebriefInput {
            case_history,
            final_diagnosis: self
                .final_diagnosis
                .as_deref()
                .unwrap_or(DIAGNOSIS_NOT_PROVIDED),
            differential: &self.differential,
            orders: &self.orders,
        }
    }

    pub fn apply_debrief(&mut self, token: InFlight, html: TrustedHtml) -> bool {
        if !self.release(token) {
            return false;
        }
        self.debrief = Some(html);
        self.stage = CaseStage::DebriefShown;
        true
    }

    /// 关闭复盘，回到首页
    pub fn close_debrief(&mut self) -> Result<(), SessionError> {
        match self.stage() {
            CaseStage::DebriefShown => {
                self.reset();
                Ok(())
            }
            stage => Err(SessionError::invalid_stage(stage, "close")),
        }
    }

    /// 放弃当前病例回到首页，在途请求的响应将被丢弃
    pub fn reset(&mut self) {
        self.clear_case();
        self.stage = CaseStage::NotStarted;
    }

    // ========== 鉴别诊断 ==========

    /// 新的鉴别诊断放在最前面；空白返回 false
    pub fn add_differential(&mut self, text: &str) -> bool {
        let diagnosis = text.trim();
        if diagnosis.is_empty() {
            return false;
        }
        self.differential.insert(0, diagnosis.to_string());
        true
    }

    pub fn remove_differential(&mut self, index: usize) -> Result<String, SessionError> {
        if index >= self.differential.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.differential.len(),
            });
        }
        Ok(self.differential.remove(index))
    }

    /// 单个元素移动：`from` 处的条目移到 `to` 处
    pub fn move_differential(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        let len = self.differential.len();
        for index in [from, to] {
            if index >= len {
                return Err(SessionError::IndexOutOfRange { index, len });
            }
        }
        let item = self.differential.remove(from);
        self.differential.insert(to, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::part::Part;

    fn phase(text: &str) -> Phase {
        Phase::from(vec![Part::Text {
            content: text.to_string(),
        }])
    }

    fn loaded(phases: &[&str]) -> CaseSession {
        let mut session = CaseSession::new();
        let token = session.begin_case(Specialty::Cardiovascular).unwrap();
        session.apply_generation(
            token,
            Segmentation {
                phases: phases.iter().map(|t| phase(t)).collect(),
                final_diagnosis: Some("Myocardial Infarction".into()),
            },
        );
        session
    }

    #[test]
    fn test_generation_reveals_first_phase() {
        let session = loaded(&["HPI", "Vitals", "Exam"]);
        assert_eq!(session.stage(), CaseStage::InProgress);
        assert_eq!(session.revealed(), 1);
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.in_flight(), None);
        assert_eq!(session.final_diagnosis(), Some("Myocardial Infarction"));
    }

    #[test]
    fn test_advance_until_complete_then_noop() {
        let mut session = loaded(&["HPI", "Vitals"]);
        assert_eq!(
            session.advance().unwrap(),
            Advance::Revealed { index: 1, total: 2 }
        );
        assert!(session.is_complete());
        assert_eq!(session.stage(), CaseStage::Complete);

        assert_eq!(session.advance().unwrap(), Advance::AlreadyComplete);
        assert_eq!(session.revealed(), 2);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.stage(), CaseStage::Complete);
    }

    #[test]
    fn test_single_phase_case_is_complete_immediately() {
        let session = loaded(&["Everything at once"]);
        assert!(session.is_complete());
        assert_eq!(session.stage(), CaseStage::Complete);
    }

    #[test]
    fn test_empty_generation_is_not_complete() {
        let mut session = CaseSession::new();
        let token = session.begin_case(Specialty::Random).unwrap();
        let advance = session.apply_generation(token, Segmentation::default());
        assert_eq!(advance, Some(Advance::NoPhases));
        assert_eq!(session.stage(), CaseStage::InProgress);
        assert!(!session.is_complete());
        assert_eq!(session.final_diagnosis(), Some("Not provided"));
        assert!(matches!(
            session.begin_debrief(),
            Err(SessionError::CaseNotComplete { revealed: 0, total: 0 })
        ));
    }

    #[test]
    fn test_advance_before_start_is_invalid() {
        let mut session = CaseSession::new();
        assert!(matches!(
            session.advance(),
            Err(SessionError::InvalidStage { stage: CaseStage::NotStarted, .. })
        ));
    }

    #[test]
    fn test_order_cache_hit_skips_dispatch() {
        let mut session = loaded(&["HPI", "Vitals"]);
        let token = match session.begin_order(OrderCategory::Labs, "CBC").unwrap() {
            OrderStart::Dispatch(token) => token,
            other => panic!("unexpected {:?}", other),
        };
        assert!(session.apply_order(token, OrderCategory::Labs, "CBC", Ok("WBC 15".into())));

        let again = session.begin_order(OrderCategory::Labs, "CBC").unwrap();
        assert_eq!(again, OrderStart::Cached("WBC 15".into()));
        assert_eq!(session.in_flight(), None);
        assert_eq!(session.orders().labs, vec!["CBC"]);
        assert_eq!(session.transcript().len(), 3);
    }

    #[test]
    fn test_failed_order_is_not_cached() {
        let mut session = loaded(&["HPI"]);
        let OrderStart::Dispatch(token) = session.begin_order(OrderCategory::Imaging, "CXR").unwrap() else {
            panic!("expected dispatch");
        };
        session.apply_order(token, OrderCategory::Imaging, "CXR", Err("Error: timeout".into()));
        assert!(!session.cache().contains(OrderCategory::Imaging, "CXR"));
        assert!(matches!(
            session.begin_order(OrderCategory::Imaging, "CXR").unwrap(),
            OrderStart::Dispatch(_)
        ));
    }

    #[test]
    fn test_blank_order_rejected() {
        let mut session = loaded(&["HPI"]);
        assert_eq!(
            session.begin_order(OrderCategory::Management, "   ").unwrap(),
            OrderStart::Rejected
        );
        assert_eq!(session.in_flight(), None);
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_in_flight_rejects_overlapping_request() {
        let mut session = loaded(&["HPI", "Vitals"]);
        let first = session.begin_order(OrderCategory::Labs, "CBC").unwrap();
        assert!(matches!(first, OrderStart::Dispatch(_)));

        assert_eq!(
            session.begin_order(OrderCategory::Labs, "CMP"),
            Err(SessionError::RequestInFlight(RequestKind::OrderResults))
        );
        assert_eq!(
            session.begin_case(Specialty::Neurology),
            Err(SessionError::RequestInFlight(RequestKind::OrderResults))
        );
    }

    #[test]
    fn test_stale_response_after_reset_is_dropped() {
        let mut session = loaded(&["HPI", "Vitals"]);
        let OrderStart::Dispatch(token) = session.begin_order(OrderCategory::Labs, "CBC").unwrap() else {
            panic!("expected dispatch");
        };
        let epoch = session.epoch();
        session.reset();
        assert!(session.epoch() > epoch);

        assert!(!session.apply_order(token, OrderCategory::Labs, "CBC", Ok("WBC 15".into())));
        assert!(session.transcript().is_empty());
        assert!(session.cache().is_empty());
        assert_eq!(session.stage(), CaseStage::NotStarted);
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let mut session = CaseSession::new();
        let stale = session.begin_case(Specialty::Renal).unwrap();
        session.reset();
        let fresh = session.begin_case(Specialty::Endocrine).unwrap();
        assert_ne!(stale, fresh);

        assert_eq!(session.apply_generation(stale, Segmentation::default()), None);
        assert_eq!(session.stage(), CaseStage::Generating);
        assert_eq!(session.in_flight(), Some(fresh));
    }

    #[test]
    fn test_debrief_requires_complete_case() {
        let mut session = loaded(&["HPI", "Vitals"]);
        assert_eq!(
            session.begin_debrief(),
            Err(SessionError::CaseNotComplete { revealed: 1, total: 2 })
        );
        session.advance().unwrap();

        let token = session.begin_debrief().unwrap();
        assert!(session.apply_debrief(token, TrustedHtml::from_gateway("<p>ok</p>")));
        assert_eq!(session.stage(), CaseStage::DebriefShown);
        assert_eq!(session.debrief().map(TrustedHtml::as_str), Some("<p>ok</p>"));

        assert!(matches!(
            session.begin_order(OrderCategory::Labs, "CBC"),
            Err(SessionError::InvalidStage { .. })
        ));

        session.close_debrief().unwrap();
        assert_eq!(session.stage(), CaseStage::NotStarted);
        assert_eq!(session.total_phases(), 0);
        assert!(session.debrief().is_none());
    }

    #[test]
    fn test_close_debrief_only_from_debrief() {
        let mut session = loaded(&["HPI"]);
        assert!(matches!(
            session.close_debrief(),
            Err(SessionError::InvalidStage { stage: CaseStage::Complete, .. })
        ));
    }

    #[test]
    fn test_differential_operations() {
        let mut session = CaseSession::new();
        assert!(!session.add_differential("  "));
        assert!(session.add_differential("Pneumonia"));
        assert!(session.add_differential(" Pulmonary Embolism "));
        assert!(session.add_differential("MI"));
        assert_eq!(session.differential(), ["MI", "Pulmonary Embolism", "Pneumonia"]);

        session.move_differential(2, 0).unwrap();
        assert_eq!(session.differential(), ["Pneumonia", "MI", "Pulmonary Embolism"]);

        assert_eq!(session.remove_differential(1).unwrap(), "MI");
        assert_eq!(
            session.remove_differential(5),
            Err(SessionError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert!(session.move_differential(0, 2).is_err());
    }

    #[test]
    fn test_debrief_input_uses_session_data() {
        let mut session = loaded(&["HPI"]);
        session.add_differential("MI");
        let input = session.debrief_input("history");
        assert_eq!(input.final_diagnosis, "Myocardial Infarction");
        assert_eq!(input.differential, ["MI"]);
        assert_eq!(input.case_history, "history");
    }
}
