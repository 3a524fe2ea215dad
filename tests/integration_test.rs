use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use case_simulator::config::{Config, GatewayProvider};
use case_simulator::error::{AppError, FileError, GatewayError, SessionError};
use case_simulator::infrastructure::{build_gateway, AiGateway, GatewayResponse, ScriptedGateway};
use case_simulator::logger;
use case_simulator::models::{load_case_library, OrderCategory, Specialty, TranscriptEntry};
use case_simulator::services::TopicPicker;
use case_simulator::workflow::{Advance, CaseFlow, CaseStage, OrderOutcome};

/// 记录每次请求的网关
///
/// 病例生成返回固定的三阶段病例，其余请求返回带序号的文本，
/// 这样可以区分"重放缓存"与"重新请求"。
#[derive(Default)]
struct RecordingGateway {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGateway {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl AiGateway for RecordingGateway {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(
        &self,
        prompt: &str,
        wants_images: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        if wants_images {
            return Ok(GatewayResponse::Text(
                "A 72-year-old woman presents with fever.[PAUSE]Vitals: HR 118, BP 88/50.[PAUSE]Lactate 4.2.\nFINAL_DIAGNOSIS: Sepsis"
                    .to_string(),
            ));
        }
        Ok(GatewayResponse::Text(format!("response #{}", n)))
    }
}

fn flow<G: AiGateway>(gateway: G) -> CaseFlow<G> {
    CaseFlow::with_topic_picker(gateway, TopicPicker::new(0.0, Some(3)))
}

#[tokio::test]
async fn test_identical_order_hits_gateway_once() {
    let mut flow = flow(RecordingGateway::default());
    flow.start_case(Specialty::Infectious).await.unwrap();
    assert_eq!(flow.gateway().calls(), 1);

    let first = flow.submit_order(OrderCategory::Labs, "Lactate").await.unwrap();
    let second = flow.submit_order(OrderCategory::Labs, "Lactate").await.unwrap();

    assert_eq!(first, OrderOutcome::Fetched("response #2".into()));
    assert_eq!(second, OrderOutcome::Cached("response #2".into()));
    assert_eq!(flow.gateway().calls(), 2);

    // 大小写不同视为不同医嘱
    let third = flow.submit_order(OrderCategory::Labs, "lactate").await.unwrap();
    assert_eq!(third, OrderOutcome::Fetched("response #3".into()));

    // 同样的文本换一个类别也是不同医嘱
    let fourth = flow.submit_order(OrderCategory::Imaging, "Lactate").await.unwrap();
    assert_eq!(fourth, OrderOutcome::Fetched("response #4".into()));

    let results: Vec<_> = flow
        .session()
        .transcript()
        .iter()
        .filter(|e| matches!(e, TranscriptEntry::OrderResult { .. }))
        .collect();
    assert_eq!(results.len(), 4);
    assert_eq!(flow.session().orders().labs, vec!["Lactate", "lactate"]);
}

#[tokio::test]
async fn test_order_prompt_contains_case_history() {
    let mut flow = flow(RecordingGateway::default());
    flow.start_case(Specialty::Infectious).await.unwrap();
    flow.advance().unwrap();

    flow.submit_order(OrderCategory::Imaging, "CXR").await.unwrap();
    let prompt = flow.gateway().last_prompt();
    assert!(prompt.contains(
        "A 72-year-old woman presents with fever. Vitals: HR 118, BP 88/50."
    ));
    assert!(prompt.contains("The student has ordered the following imaging: \"CXR\"."));
    assert!(!prompt.contains("Lactate 4.2"));
}

#[tokio::test]
async fn test_advance_after_complete_is_noop() {
    let mut flow = flow(RecordingGateway::default());
    let start = flow.start_case(Specialty::Infectious).await.unwrap();
    assert_eq!(start.phases, 3);
    assert_eq!(start.advance, Advance::Revealed { index: 0, total: 3 });

    flow.advance().unwrap();
    flow.advance().unwrap();
    assert!(flow.session().is_complete());

    let transcript_len = flow.session().transcript().len();
    assert_eq!(flow.advance().unwrap(), Advance::AlreadyComplete);
    assert_eq!(flow.session().transcript().len(), transcript_len);
    assert_eq!(flow.session().revealed(), 3);
    assert_eq!(flow.gateway().calls(), 1);
}

#[tokio::test]
async fn test_debrief_prompt_placeholders() {
    let mut flow = flow(RecordingGateway::default());
    flow.start_case(Specialty::Infectious).await.unwrap();
    flow.advance().unwrap();
    flow.advance().unwrap();
    flow.session_mut().add_differential("Pneumonia");
    flow.session_mut().add_differential("Sepsis");

    let html = flow.reveal_diagnosis().await.unwrap();
    assert_eq!(html.as_str(), "response #2");

    let prompt = flow.gateway().last_prompt();
    assert!(prompt.contains("**Final Diagnosis:** Sepsis\n"));
    assert!(prompt.contains("1. Sepsis, 2. Pneumonia, 3. N/A"));
    assert!(prompt.contains("**Student's Lab Orders:** None"));
    assert!(prompt.contains("**Student's Imaging Orders:** None"));
    assert!(prompt.contains("**Student's Management Plan:** None"));
}

#[tokio::test]
async fn test_full_case_with_scripted_gateway() {
    let mut flow = CaseFlow::with_topic_picker(ScriptedGateway::new(), TopicPicker::new(0.0, None));

    let start = flow.start_case(Specialty::Respiratory).await.unwrap();
    assert_eq!(start.error, None);
    assert_eq!(start.phases, 5);
    assert_eq!(start.images, 1);
    assert_eq!(flow.session().final_diagnosis(), Some("Pulmonary Embolism"));

    while let Advance::Revealed { .. } = flow.advance().unwrap() {}
    assert_eq!(flow.session().stage(), CaseStage::Complete);

    let ctpa = flow.submit_order(OrderCategory::Imaging, "CTPA").await.unwrap();
    assert!(matches!(ctpa, OrderOutcome::Fetched(ref s) if s.contains("pulmonary emboli")));
    let aspirin = flow
        .submit_order(OrderCategory::Management, "Medication: Aspirin")
        .await
        .unwrap();
    assert!(matches!(aspirin, OrderOutcome::Fetched(ref s) if s.contains("324mg")));

    flow.session_mut().add_differential("Pulmonary Embolism");
    let html = flow.reveal_diagnosis().await.unwrap();
    assert!(html.as_str().contains(">Pulmonary Embolism</p>"));
    assert_eq!(flow.session().stage(), CaseStage::DebriefShown);
    assert_eq!(flow.gateway().calls(), 4);

    // 复盘之后不能再开医嘱
    assert!(matches!(
        flow.submit_order(OrderCategory::Labs, "CBC").await,
        Err(SessionError::InvalidStage { .. })
    ));

    flow.close_debrief().unwrap();
    assert_eq!(flow.session().stage(), CaseStage::NotStarted);
    assert!(flow.session().transcript().is_empty());
    assert!(flow.session().differential().is_empty());
    assert!(flow.session().cache().is_empty());
}

#[tokio::test]
async fn test_external_case_library_drives_flow() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("thyroid_storm.toml"),
        r#"
diagnosis = "Thyroid Storm"
specialty = "Endocrine System"

[[parts]]
text = "A 34-year-old woman presents with palpitations and agitation."

[[parts]]
inlineData = { mimeType = "image/png", data = "AAAA" }

[[parts]]
text = "[PAUSE]Temperature 40.1C, HR 164 irregular."

[[parts]]
text = "FINAL_DIAGNOSIS: Thyroid Storm"
"#,
    )
    .unwrap();

    let scripts = load_case_library(dir.path().to_str().unwrap()).await.unwrap();
    let gateway = ScriptedGateway::new().with_scripts(scripts);
    let mut flow = CaseFlow::with_topic_picker(gateway, TopicPicker::new(1.0, Some(11)));

    // 主题不一定是 Thyroid Storm，但专科匹配会优先选中外部脚本
    let start = flow.start_case(Specialty::Endocrine).await.unwrap();
    assert_eq!(start.phases, 2);
    assert_eq!(start.images, 1);
    assert_eq!(flow.session().final_diagnosis(), Some("Thyroid Storm"));
}

#[tokio::test]
async fn test_build_gateway_from_config() {
    let config = Config {
        gateway_provider: GatewayProvider::Mock,
        ..Config::default()
    };
    let gateway = build_gateway(&config).await.unwrap();
    assert_eq!(gateway.name(), "scripted");

    // 缺少凭据时在请求时报错，流程降级为占位内容
    let config = Config {
        gateway_provider: GatewayProvider::Gemini,
        llm_api_key: String::new(),
        ..Config::default()
    };
    let gateway = build_gateway(&config).await.unwrap();
    assert_eq!(gateway.name(), "gemini");
    let mut flow = flow(gateway);
    let start = flow.start_case(Specialty::Neurology).await.unwrap();
    assert_eq!(start.advance, Advance::NoPhases);
    assert!(start.error.unwrap().contains("LLM_API_KEY"));
}

#[tokio::test]
async fn test_missing_case_library_is_a_file_error() {
    let config = Config {
        gateway_provider: GatewayProvider::Mock,
        case_library_dir: Some("/nonexistent/case-library".to_string()),
        ..Config::default()
    };
    let result = build_gateway(&config).await;
    assert!(matches!(
        result,
        Err(AppError::File(FileError::DirectoryNotFound { .. }))
    ));
}

#[test]
fn test_logger_init_is_idempotent() {
    let config = Config {
        verbose_logging: true,
        ..Config::default()
    };
    logger::init(&config);
    logger::init(&Config::default());
}

#[test]
fn test_flow_with_block_on() {
    let mut flow = flow(RecordingGateway::default());
    let start = tokio_test::block_on(flow.start_case(Specialty::Random)).unwrap();
    assert_eq!(start.topic, None);
    assert_eq!(flow.session().final_diagnosis(), Some("Sepsis"));
}
