mod harness;

use harness::config::{ConfigBuilder, TestKey};
use harness::server::TestServer;
use serde_json::{Value, json};

fn body() -> Value {
    json!({"model": "mock-1", "messages": [{"role": "user", "content": "Hello"}]})
}

async fn call(server: &TestServer, key: &str, customer: Option<&str>) -> reqwest::Response {
    let mut request = server.post("/completions?provider=Mock", Some(key), &body());
    if let Some(customer) = customer {
        request = request.header("tollgate-trace-customer-id", customer);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn key_limit_allows_burst_then_rejects() {
    let config = ConfigBuilder::new()
        .with_key(TestKey::new("tollgate-limited").key_rate_limit(2))
        .build();
    let server = TestServer::start(config).await.unwrap();

    // burst is twice the per-second rate
    for _ in 0..4 {
        assert_eq!(call(&server, "tollgate-limited", None).await.status(), 200);
    }

    let resp = call(&server, "tollgate-limited", None).await;
    assert_eq!(resp.status(), 429);
    let retry_after: u64 = resp.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after >= 1);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "rate_limit_error");
}

#[tokio::test]
async fn keys_have_separate_buckets() {
    let config = ConfigBuilder::new()
        .with_key(TestKey::new("tollgate-a").key_rate_limit(1))
        .with_key(TestKey::new("tollgate-b").key_rate_limit(1))
        .build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..2 {
        assert_eq!(call(&server, "tollgate-a", None).await.status(), 200);
    }
    assert_eq!(call(&server, "tollgate-a", None).await.status(), 429);
    assert_eq!(call(&server, "tollgate-b", None).await.status(), 200);
}

#[tokio::test]
async fn customer_limit_is_per_traced_customer() {
    let config = ConfigBuilder::new()
        .with_key(TestKey::new("tollgate-shared").user_rate_limit(1))
        .build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..2 {
        assert_eq!(call(&server, "tollgate-shared", Some("alice")).await.status(), 200);
    }
    assert_eq!(call(&server, "tollgate-shared", Some("alice")).await.status(), 429);

    // another customer, and untraced calls, are unaffected
    assert_eq!(call(&server, "tollgate-shared", Some("bob")).await.status(), 200);
    assert_eq!(call(&server, "tollgate-shared", None).await.status(), 200);
}

#[tokio::test]
async fn zero_limit_is_unlimited() {
    let config = ConfigBuilder::new()
        .with_key(TestKey::new("tollgate-open").key_rate_limit(0))
        .build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..10 {
        assert_eq!(call(&server, "tollgate-open", None).await.status(), 200);
    }
}

#[tokio::test]
async fn disabled_rate_limit_admits_everything() {
    let config = ConfigBuilder::new()
        .with_key(TestKey::new("tollgate-limited").key_rate_limit(1))
        .without_rate_limit()
        .build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..6 {
        assert_eq!(call(&server, "tollgate-limited", None).await.status(), 200);
    }
}

#[tokio::test]
async fn raw_vendor_keys_are_not_limited() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    for _ in 0..10 {
        assert_eq!(call(&server, "sk-raw", None).await.status(), 200);
    }
}
