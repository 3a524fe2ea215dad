//! 通过 Gemini 网关驱动病例流程
//!
//! 使用 wiremock 模拟 generateContent 接口。

use case_simulator::config::Config;
use case_simulator::infrastructure::GeminiGateway;
use case_simulator::models::{OrderCategory, Specialty};
use case_simulator::services::TopicPicker;
use case_simulator::workflow::{Advance, CaseFlow, OrderOutcome};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn create_test_flow(mock_server: &MockServer) -> CaseFlow<GeminiGateway> {
    let config = Config {
        llm_api_key: "test-key".to_string(),
        llm_api_base_url: mock_server.uri(),
        llm_model_name: "text-model".to_string(),
        image_model_name: "image-model".to_string(),
        request_timeout_secs: 5,
        ..Config::default()
    };
    let gateway = GeminiGateway::new(&config).expect("failed to create gateway");
    CaseFlow::with_topic_picker(gateway, TopicPicker::new(0.0, Some(7)))
}

#[tokio::test]
async fn test_failed_order_shows_placeholder_and_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/image-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "A 61-year-old man with crushing chest pain.[PAUSE]"},
                        {"text": "ECG: ST elevation in II, III, aVF.\nFINAL_DIAGNOSIS: Inferior STEMI"}
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/text-model:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut flow = create_test_flow(&mock_server).await;
    let start = flow.start_case(Specialty::Cardiovascular).await.unwrap();
    assert_eq!(start.error, None);
    assert_eq!(start.advance, Advance::Revealed { index: 0, total: 2 });
    assert_eq!(flow.session().final_diagnosis(), Some("Inferior STEMI"));

    for _ in 0..2 {
        let outcome = flow.submit_order(OrderCategory::Labs, "Troponin").await.unwrap();
        match outcome {
            OrderOutcome::Fetched(content) => {
                assert!(content.starts_with("Error: "));
                assert!(content.contains("status=503"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    // 失败结果不缓存，第二次提交会重新请求
    assert!(flow.session().cache().is_empty());
    assert_eq!(flow.session().orders().labs, vec!["Troponin", "Troponin"]);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}
