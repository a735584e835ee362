//! HTTP surface tests: the real router bound on localhost, called with reqwest.

use std::time::Duration;

use fanout::config::Config;
use fanout::server::{self, AppState};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const INVALID: &str = "Invalid number of requests. Please provide a positive integer.";

/// Starts the service on an ephemeral port and returns its base URL.
async fn spawn_app(config: Config) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(AppState::new(&config).unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn stub_downstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "albumId": 1, "title": "stub" }))
                .set_delay(Duration::from_millis(5)),
        )
        .mount(&server)
        .await;
    server
}

fn config_for(downstream: &MockServer) -> Config {
    Config {
        base_url: format!("{}/photos", downstream.uri()),
        max_requests: 20,
        request_timeout_ms: 5_000,
        heavy_iterations: 10_000,
        heavy_partitions: 3,
        ..Config::default()
    }
}

#[tokio::test]
async fn batch_returns_exactly_two_timing_fields() {
    let downstream = stub_downstream().await;
    let base = spawn_app(config_for(&downstream)).await;

    let resp = reqwest::get(format!("{base}/?nbRequests=3")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");

    let body: Value = resp.json().await.unwrap();
    let obj = body.as_object().unwrap();
    assert_eq!(obj.len(), 2, "{body}");
    let total = obj["totalProcessingTime"].as_u64().unwrap();
    let max = obj["maxProcessingTime"].as_u64().unwrap();
    assert!(max >= 5);
    assert!(total >= max);

    assert_eq!(downstream.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn bad_counts_are_400_and_never_reach_downstream() {
    let downstream = stub_downstream().await;
    let base = spawn_app(config_for(&downstream)).await;

    let queries = [
        "",
        "?nbRequests=",
        "?nbRequests=abc",
        "?nbRequests=0",
        "?nbRequests=-4",
        "?nbRequests=2.5",
        "?nbRequests=abc&nbRequests=2",
    ];
    for query in queries {
        let resp = reqwest::get(format!("{base}/{query}")).await.unwrap();
        assert_eq!(resp.status(), 400, "query {query:?}");
        assert_eq!(resp.text().await.unwrap(), INVALID, "query {query:?}");
    }

    assert!(downstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_count_uses_first_value() {
    let downstream = stub_downstream().await;
    let base = spawn_app(config_for(&downstream)).await;

    let resp = reqwest::get(format!("{base}/?nbRequests=2&nbRequests=abc"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(downstream.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn error_status_with_json_body_still_counts() {
    let downstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&downstream)
        .await;
    let config = Config {
        fail_on_total_failure: true,
        ..config_for(&downstream)
    };
    let base = spawn_app(config).await;

    let resp = reqwest::get(format!("{base}/?nbRequests=3")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn count_above_ceiling_is_rejected() {
    let downstream = stub_downstream().await;
    let base = spawn_app(config_for(&downstream)).await;

    let resp = reqwest::get(format!("{base}/?nbRequests=21")).await.unwrap();
    assert_eq!(resp.status(), 400);
    assert!(resp.text().await.unwrap().contains("maximum of 20"));
    assert!(downstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn total_downstream_failure_is_still_200_with_zero_max() {
    let downstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&downstream)
        .await;
    let base = spawn_app(config_for(&downstream)).await;

    let resp = reqwest::get(format!("{base}/?nbRequests=4")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["maxProcessingTime"], 0);
}

#[tokio::test]
async fn total_downstream_failure_is_502_when_configured() {
    let downstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&downstream)
        .await;
    let config = Config {
        fail_on_total_failure: true,
        ..config_for(&downstream)
    };
    let base = spawn_app(config).await;

    let resp = reqwest::get(format!("{base}/?nbRequests=2")).await.unwrap();
    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn heavy_returns_deterministic_sum() {
    let downstream = stub_downstream().await;
    let base = spawn_app(config_for(&downstream)).await;

    let resp = reqwest::get(format!("{base}/heavy")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["result"], 10_000i64 * 9_999 / 2);
    assert!(body["totalProcessingTime"].is_u64());
    assert_eq!(body.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn hello_returns_two_rfc1123_timestamps() {
    let downstream = stub_downstream().await;
    let base = spawn_app(config_for(&downstream)).await;

    let resp = reqwest::get(format!("{base}/hello")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "{text}");
    assert_eq!(lines[0], "Hello World!");
    assert!(lines[1].starts_with("Current Time: ") && lines[1].ends_with(" GMT"));
    assert!(lines[2].starts_with("Future Time (after 5 mins): ") && lines[2].ends_with(" GMT"));
}
