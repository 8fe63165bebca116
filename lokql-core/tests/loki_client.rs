//! Integration tests for the Loki query executor against an HTTP double.

use std::time::Duration;

use lokql_core::config::LokiConfig;
use lokql_core::loki::{LokiClient, QueryRequest, NO_RESULTS_TEXT};
use lokql_error::ErrorKind;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout_secs: u64) -> LokiClient {
    LokiClient::new(&LokiConfig {
        base_url: server.uri(),
        timeout_secs,
    })
}

fn streams_body(values: &[(&str, &str)]) -> serde_json::Value {
    json!({
        "status": "success",
        "data": {
            "resultType": "streams",
            "result": [{
                "stream": {"job": "nginx"},
                "values": values.iter().map(|(ts, line)| json!([ts, line])).collect::<Vec<_>>()
            }]
        }
    })
}

#[tokio::test]
async fn three_lines_render_in_backend_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .and(query_param("query", "{job=\"nginx\"} |= \"500\""))
        .and(query_param("limit", "100"))
        .and(query_param("direction", "backward"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(&[
            ("1714564802000000000", "GET /c 500"),
            ("1714564801000000000", "GET /b 500"),
            ("1714564800000000000", "GET /a 500"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let request = QueryRequest::new("{job=\"nginx\"} |= \"500\"")
        .with_start("1h ago")
        .with_end("now")
        .with_limit(100);

    let rendered = client.query(&request).await.unwrap().render();
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    // Backend-supplied order is preserved, each line timestamp-prefixed.
    assert_eq!(lines[0], "[2024-05-01 12:00:02] {job=\"nginx\"} GET /c 500");
    assert_eq!(lines[1], "[2024-05-01 12:00:01] {job=\"nginx\"} GET /b 500");
    assert_eq!(lines[2], "[2024-05-01 12:00:00] {job=\"nginx\"} GET /a 500");
}

#[tokio::test]
async fn identical_requests_render_identically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(streams_body(&[("1714564800000000000", "hello")])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let request = QueryRequest::new("{job=\"nginx\"}").with_start("1h ago").with_end("now");

    let first = client.query(&request).await.unwrap().render();
    let second = client.query(&request).await.unwrap().render();
    assert_eq!(first, second);
}

#[tokio::test]
async fn empty_result_renders_fixed_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"resultType": "streams", "result": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let outcome = client.query(&QueryRequest::new("{job=\"ghost\"}")).await.unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.render(), NO_RESULTS_TEXT);
}

#[tokio::test]
async fn http_400_surfaces_backend_message_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "parse error at line 1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client.query(&QueryRequest::new("{job=}")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::QueryRejected);
    assert_eq!(err.message(), "parse error at line 1");
}

#[tokio::test]
async fn http_500_maps_to_backend_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client.query(&QueryRequest::new("{job=\"nginx\"}")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
}

#[tokio::test]
async fn timeout_maps_to_backend_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(streams_body(&[("1714564800000000000", "late")]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 1);
    let err = client.query(&QueryRequest::new("{job=\"nginx\"}")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn invalid_limit_rejected_before_any_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client
        .query(&QueryRequest::new("{job=\"nginx\"}").with_limit(0))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn oversized_limit_is_clamped_not_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .and(query_param("limit", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"resultType": "streams", "result": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let outcome = client
        .query(&QueryRequest::new("{job=\"nginx\"}").with_limit(1_000_000))
        .await
        .unwrap();

    assert!(outcome.is_empty());
}

#[tokio::test]
async fn default_interval_is_sent_with_every_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .and(query_param("interval", "1m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"resultType": "streams", "result": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let outcome = client.query(&QueryRequest::new("{job=\"nginx\"}")).await.unwrap();

    assert!(outcome.is_empty());
}

#[tokio::test]
async fn metric_query_renders_aggregation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [{
                    "metric": {"app": "api"},
                    "values": [[1714564800.0, "3"], [1714564860.0, "5"]]
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let rendered = client
        .query(&QueryRequest::new("sum by (app) (count_over_time({job=\"api\"}[5m]))"))
        .await
        .unwrap()
        .render();

    assert!(rendered.starts_with("{app=\"api\"}"));
    assert!(rendered.contains("[2024-05-01 12:00:00] 3"));
    assert!(rendered.contains("[2024-05-01 12:01:00] 5"));
}
