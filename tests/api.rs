use std::time::{Duration, Instant};

use hc_uploader::api::{ApiClient, ApiResponse, CrackingService, Task};
use hc_uploader::http::RetryPolicy;
use hc_uploader::{Error, Result};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        backoff_factor: Duration::from_millis(10),
        ..RetryPolicy::default()
    }
}

/// Runs a blocking client call off the async runtime, timing it.
async fn call<F>(endpoint: String, f: F) -> (Result<ApiResponse>, Duration)
where
    F: FnOnce(&ApiClient) -> Result<ApiResponse> + Send + 'static,
{
    call_with(endpoint, fast_policy(), f).await
}

async fn call_with<F>(
    endpoint: String,
    policy: RetryPolicy,
    f: F,
) -> (Result<ApiResponse>, Duration)
where
    F: FnOnce(&ApiClient) -> Result<ApiResponse> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let client = ApiClient::with_policy(endpoint, policy).unwrap();
        let start = Instant::now();
        let result = f(&client);
        (result, start.elapsed())
    })
    .await
    .unwrap()
}

async fn mount_once_then_ok(server: &MockServer, first: ResponseTemplate) {
    Mock::given(method("POST"))
        .respond_with(first)
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(server)
        .await;
}

fn submit_one(client: &ApiClient) -> Result<ApiResponse> {
    client.submit_hashes("key-1", &["WPA*01*abc".to_string()])
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_sends_fixed_body_and_parses_reply() {
    hc_uploader::logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "api_key": "key-1",
            "agree_terms": "yes",
            "algo_mode": 22000,
            "hashes": ["WPA*01*abc"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (result, _) = call(format!("{}/v2", server.uri()), submit_one).await;

    let resp = result.expect("submit ok");
    assert!(resp.success);
    assert!(resp.tasks.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn list_tasks_sends_action_and_parses_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "api_key": "key-1",
            "agree_terms": "yes",
            "action": "list_tasks",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "tasks": [
                {"task_id": "t-1", "status": "done", "cracked": true, "password": "hunter2"},
                {"task_id": 7, "status": "queued"}
            ]
        })))
        .mount(&server)
        .await;

    let (result, _) = call(server.uri(), |c| c.list_tasks("key-1")).await;

    assert_eq!(
        result.unwrap().tasks,
        vec![
            Task {
                task_id: "t-1".into(),
                status: "done".into(),
                cracked: true,
                password: "hunter2".into(),
            },
            Task {
                task_id: "7".into(),
                status: "queued".into(),
                cracked: false,
                password: String::new(),
            },
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_retried_three_times_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let (result, elapsed) = call(server.uri(), submit_one).await;

    assert!(matches!(result, Err(Error::Http(msg)) if msg.contains("500")));
    // 10ms + 20ms + 40ms of backoff.
    assert!(elapsed >= Duration::from_millis(70), "{elapsed:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such endpoint"))
        .expect(1)
        .mount(&server)
        .await;

    let (result, _) = call(server.uri(), submit_one).await;

    assert!(matches!(result, Err(Error::Http(msg)) if msg.contains("404")));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_failure_then_success() {
    let server = MockServer::start().await;
    mount_once_then_ok(&server, ResponseTemplate::new(503)).await;

    let (result, _) = call(server.uri(), submit_one).await;

    assert!(result.unwrap().success);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (result, _) = call(server.uri(), |c| c.list_tasks("key-1")).await;

    assert!(matches!(result, Err(Error::Parse(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn logical_failure_keeps_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "message": "Invalid API key"})),
        )
        .mount(&server)
        .await;

    let (result, _) = call(server.uri(), submit_one).await;

    match result.unwrap().into_result() {
        Err(Error::ApiLogic(msg)) => assert_eq!(msg, "Invalid API key"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_failures_are_retried_then_surface() {
    // Bind and drop a listener to get a port nothing is listening on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let (result, elapsed) = call(format!("http://127.0.0.1:{port}/v2"), submit_one).await;

    assert!(matches!(result, Err(Error::Http(_))));
    assert!(elapsed >= Duration::from_millis(70), "{elapsed:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_after_on_503_replaces_backoff() {
    let server = MockServer::start().await;
    mount_once_then_ok(
        &server,
        ResponseTemplate::new(503).insert_header("Retry-After", "0"),
    )
    .await;
    let policy = RetryPolicy {
        backoff_factor: Duration::from_millis(800),
        ..RetryPolicy::default()
    };

    let (result, elapsed) = call_with(server.uri(), policy, submit_one).await;

    assert!(result.unwrap().success);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(elapsed < Duration::from_millis(800), "{elapsed:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_after_is_ignored_for_other_statuses() {
    let server = MockServer::start().await;
    mount_once_then_ok(
        &server,
        ResponseTemplate::new(500).insert_header("Retry-After", "0"),
    )
    .await;
    let policy = RetryPolicy {
        backoff_factor: Duration::from_millis(150),
        ..RetryPolicy::default()
    };

    let (result, elapsed) = call_with(server.uri(), policy, submit_one).await;

    assert!(result.unwrap().success);
    assert!(elapsed >= Duration::from_millis(150), "{elapsed:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_after_is_capped_by_max_backoff() {
    let server = MockServer::start().await;
    mount_once_then_ok(
        &server,
        ResponseTemplate::new(503).insert_header("Retry-After", "3600"),
    )
    .await;
    let policy = RetryPolicy {
        backoff_factor: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        ..RetryPolicy::default()
    };

    let (result, elapsed) = call_with(server.uri(), policy, submit_one).await;

    assert!(result.unwrap().success);
    assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
}
