//! 病例处理流程 - 流程层
//!
//! 核心职责：围绕网关请求编排会话状态转换
//!
//! 流程顺序：
//! 1. start_case → 生成病例 → 切分阶段 → 自动展示第一阶段
//! 2. advance / submit_order（可多次）
//! 3. reveal_diagnosis → 复盘
//! 4. close_debrief → 回到首页

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{GatewayError, SessionError};
use crate::infrastructure::gateway::AiGateway;
use crate::models::debrief::TrustedHtml;
use crate::models::order::OrderCategory;
use crate::models::specialty::Specialty;
use crate::services::prompt_builder::{
    build_case_prompt, build_debrief_prompt, build_order_prompt, TopicPicker,
};
use crate::services::segmenter::{segment, Segmentation};
use crate::utils::logging::log_case_loaded;
use crate::utils::truncate_text;
use crate::workflow::case_state::{Advance, CaseSession, OrderStart};

/// 病例生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseStart {
    /// 第一阶段的展示结果
    pub advance: Advance,
    /// 使用的核心主题（未指定时为 None）
    pub topic: Option<&'static str>,
    pub phases: usize,
    pub images: usize,
    /// 网关失败时的占位文字
    pub error: Option<String>,
}

/// 医嘱提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// 空白医嘱，未做任何处理
    Rejected,
    /// 重放缓存结果，未请求网关
    Cached(String),
    /// 请求了网关（失败时内容为占位文字）
    Fetched(String),
}

/// 网关错误转换为展示给学生的占位文字
fn placeholder(err: &GatewayError) -> String {
    format!("Error: {}", err)
}

/// 病例处理流程
///
/// - 持有网关与会话，`&mut self` 保证同一时刻只有一个请求
/// - 网关失败不会中断流程，而是转换为占位内容
pub struct CaseFlow<G: AiGateway> {
    gateway: G,
    session: CaseSession,
    topics: TopicPicker,
}

impl<G: AiGateway> CaseFlow<G> {
    /// 创建新的病例流程
    pub fn new(gateway: G, config: &Config) -> Self {
        Self::with_topic_picker(
            gateway,
            TopicPicker::new(config.topic_probability, config.rng_seed),
        )
    }

    pub fn with_topic_picker(gateway: G, topics: TopicPicker) -> Self {
        Self {
            gateway,
            session: CaseSession::new(),
            topics,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn session(&self) -> &CaseSession {
        &self.session
    }

    /// 鉴别诊断等同步操作直接作用于会话
    pub fn session_mut(&mut self) -> &mut CaseSession {
        &mut self.session
    }

    /// 生成新病例
    pub async fn start_case(&mut self, specialty: Specialty) -> Result<CaseStart, SessionError> {
        let token = self.session.begin_case(specialty)?;
        let topic = self.topics.pick(specialty);
        let prompt = build_case_prompt(specialty, topic, Utc::now().timestamp_millis());

        match topic {
            Some(topic) => info!("🩺 正在生成病例 [{}] 主题: {}", specialty, topic),
            None => info!("🩺 正在生成病例 [{}]", specialty),
        }

        let (segmentation, error) = match self.gateway.generate(&prompt, true).await {
            Ok(response) => (segment(&response.into_parts()), None),
            Err(e) => {
                warn!("⚠️ 病例生成失败 ({}): {}", self.gateway.name(), e);
                (Segmentation::default(), Some(placeholder(&e)))
            }
        };

        let phases = segmentation.phases.len();
        let images = segmentation.image_count();
        if error.is_none() {
            log_case_loaded(specialty.name(), phases, images);
        }
        if segmentation.final_diagnosis.is_none() {
            debug!("响应中没有诊断标记");
        }

        let advance = self
            .session
            .apply_generation(token, segmentation)
            .unwrap_or(Advance::NoPhases);

        Ok(CaseStart {
            advance,
            topic,
            phases,
            images,
            error,
        })
    }

    /// 展示下一个阶段
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        let advance = self.session.advance()?;
        if let Advance::Revealed { index, total } = advance {
            debug!("展示阶段 {}/{}", index + 1, total);
        }
        Ok(advance)
    }

    /// 提交医嘱
    ///
    /// 同一类别下完全相同的医嘱文本只请求一次网关。
    pub async fn submit_order(
        &mut self,
        category: OrderCategory,
        raw_text: &str,
    ) -> Result<OrderOutcome, SessionError> {
        let token = match self.session.begin_order(category, raw_text)? {
            OrderStart::Rejected => return Ok(OrderOutcome::Rejected),
            OrderStart::Cached(content) => {
                debug!("医嘱命中缓存 [{}] {}", category, raw_text);
                return Ok(OrderOutcome::Cached(content));
            }
            OrderStart::Dispatch(token) => token,
        };

        info!("🧪 正在获取医嘱结果 [{}] {}", category, truncate_text(raw_text, 40));
        let prompt = build_order_prompt(&self.session.transcript_text(), category, raw_text);

        let result = match self.gateway.generate(&prompt, false).await {
            Ok(response) => Ok(response.into_text()),
            Err(e) => {
                warn!("⚠️ 医嘱结果获取失败 [{}]: {}", category, e);
                Err(placeholder(&e))
            }
        };
        let content = match &result {
            Ok(content) | Err(content) => content.clone(),
        };

        self.session.apply_order(token, category, raw_text, result);
        Ok(OrderOutcome::Fetched(content))
    }

    /// 揭晓诊断并生成复盘
    pub async fn reveal_diagnosis(&mut self) -> Result<TrustedHtml, SessionError> {
        let token = self.session.begin_debrief()?;

        let history = self.session.transcript_text();
        let prompt = build_debrief_prompt(self.session.debrief_input(&history));
        info!(
            "📋 正在生成病例复盘 (诊断: {})",
            self.session.final_diagnosis().unwrap_or_default()
        );

        let html = match self.gateway.generate(&prompt, false).await {
            Ok(response) => TrustedHtml::from_gateway(response.into_text()),
            Err(e) => {
                warn!("⚠️ 复盘生成失败: {}", e);
                TrustedHtml::from_gateway(placeholder(&e))
            }
        };

        self.session.apply_debrief(token, html.clone());
        Ok(html)
    }

    /// 关闭复盘，回到首页
    pub fn close_debrief(&mut self) -> Result<(), SessionError> {
        self.session.close_debrief()?;
        info!("↩️ 已返回首页");
        Ok(())
    }
}
