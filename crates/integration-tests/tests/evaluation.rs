mod harness;

use harness::config::{ConfigBuilder, TestKey};
use harness::mock_vendor::{CONTENT, MockVendor};
use harness::server::TestServer;
use serde_json::{Value, json};
use tollgate_config::EvaluationConfig;

const KEY: &str = "tollgate-evaluator";

async fn start(mock: &MockVendor) -> TestServer {
    let config = ConfigBuilder::new()
        .with_vendor_base_url(&mock.base_url())
        .with_key(
            TestKey::new(KEY)
                .provider_key("OpenAI", "sk-openai")
                .provider_key("Claude", "sk-claude"),
        )
        .with_evaluation(EvaluationConfig {
            provider: "OpenAI".to_owned(),
            ..EvaluationConfig::default()
        })
        .build();
    TestServer::start(config).await.unwrap()
}

fn suite() -> Value {
    json!({
        "prompt": "You are a friendly greeter.",
        "testCases": [
            {"question": "Say hello", "assert": {"type": "Contains", "value": "Hello"}},
            {"question": "Say goodbye", "assert": {"type": "Keywords", "value": "goodbye,farewell,bye"}}
        ],
        "testProviders": [
            {"provider": "OpenAI", "model": "gpt-4o", "temperature": 0.1},
            {"provider": "Claude", "model": "claude-3-haiku", "temperature": 0.5}
        ]
    })
}

#[tokio::test]
async fn runs_every_case_against_every_provider() {
    let mock = MockVendor::start().await.unwrap();
    let server = start(&mock).await;

    let resp = server.post("/completions/test", Some(KEY), &suite()).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(mock.calls(), 4);

    let body: Value = resp.json().await.unwrap();
    let questions = body["questionResponses"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["question"], "Say hello");
    assert_eq!(questions[1]["question"], "Say goodbye");

    let hello = questions[0]["llmResponses"].as_array().unwrap();
    assert_eq!(hello[0]["provider"], "OpenAI");
    assert_eq!(hello[0]["model"], "gpt-4o");
    assert_eq!(hello[1]["provider"], "Claude");
    assert_eq!(hello[1]["temperature"], 0.5);
    for result in hello {
        assert_eq!(result["status"], true);
        assert_eq!(result["statusReason"], "");
        assert_eq!(result["answer"], CONTENT);
        assert!(result["cost"].as_f64().unwrap() > 0.0);
    }

    for result in questions[1]["llmResponses"].as_array().unwrap() {
        assert_eq!(result["status"], false);
        assert!(result["statusReason"].as_str().unwrap().contains("goodbye,farewell,bye"));
    }
}

#[tokio::test]
async fn vendor_failures_are_reported_per_result() {
    let mock = MockVendor::start().await.unwrap();
    mock.fail();
    let server = start(&mock).await;

    let resp = server.post("/completions/test", Some(KEY), &suite()).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    for question in body["questionResponses"].as_array().unwrap() {
        for result in question["llmResponses"].as_array().unwrap() {
            assert_eq!(result["status"], false);
            assert_eq!(result["answer"], "");
            assert!(
                result["statusReason"]
                    .as_str()
                    .unwrap()
                    .starts_with("Failed to generate LLM response")
            );
        }
    }
}

#[tokio::test]
async fn raw_vendor_key_is_unauthorized() {
    let mock = MockVendor::start().await.unwrap();
    let server = start(&mock).await;

    let resp = server
        .post("/completions/test", Some("sk-openai"), &suite())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn missing_vendor_credential_fails_before_any_call() {
    let mock = MockVendor::start().await.unwrap();
    let server = start(&mock).await;

    let mut request = suite();
    request["testProviders"]
        .as_array_mut()
        .unwrap()
        .push(json!({"provider": "Gemini", "model": "gemini-1.5-flash"}));

    let resp = server.post("/completions/test", Some(KEY), &request).send().await.unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn unparseable_generated_cases_are_bad_gateway() {
    let mock = MockVendor::start().await.unwrap();
    let server = start(&mock).await;

    let request = json!({
        "prompt": "You are a travel agent.",
        "userRoleDetails": "people planning a holiday",
        "testProviders": [{"provider": "Mock", "model": "mock-1"}]
    });
    let resp = server.post("/completions/test", Some(KEY), &request).send().await.unwrap();

    // the generator model answers with plain text instead of a JSON case list
    assert_eq!(resp.status(), 502);
    assert_eq!(mock.calls(), 1);
    assert_eq!(mock.last_credential().as_deref(), Some("sk-openai"));
}
