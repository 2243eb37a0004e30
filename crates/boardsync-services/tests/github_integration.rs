//! Integration tests for GitHubClient using wiremock.

use std::time::Duration;

use boardsync_core::GitHubError;
use boardsync_services::{
    CreateIssueRequest, GitHubClient, RepoRef, RetryPolicy, UpdateIssueRequest,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repo() -> RepoRef {
    RepoRef {
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
    }
}

/// Helper to create a test issue JSON
fn test_issue(number: i64, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": number * 100,
        "number": number,
        "title": title,
        "body": "stack trace...",
        "state": "open",
        "html_url": format!("https://github.com/acme/widgets/issues/{number}"),
        "labels": [{"id": 1, "name": "bug", "color": "d73a4a", "description": null}],
        "created_at": "2026-01-30T12:00:00Z"
    })
}

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::with_base_url(&server.uri(), "test-token".to_string())
        .unwrap()
        .with_retry(RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        })
}

#[tokio::test]
async fn test_list_open_issues_filters_pull_requests() {
    let mock_server = MockServer::start().await;

    let mut pull = test_issue(8, "Add feature");
    pull["pull_request"] = serde_json::json!({"url": "https://api.github.com/repos/acme/widgets/pulls/8"});

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(query_param("state", "open"))
        .and(query_param("per_page", "100"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([test_issue(42, "Fix crash"), pull])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let issues = client(&mock_server).list_open_issues(&repo()).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].number, 42);
    assert_eq!(issues[0].labels[0].name, "bug");
}

#[tokio::test]
async fn test_list_labels() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 1, "name": "bug", "color": "d73a4a", "description": "Something isn't working"},
            {"id": 2, "name": "docs", "color": "0075ca"}
        ])))
        .mount(&mock_server)
        .await;

    let labels = client(&mock_server).list_labels(&repo()).await.unwrap();

    assert_eq!(labels.len(), 2);
    assert_eq!(labels[1].name, "docs");
    assert_eq!(labels[1].description, None);
}

#[tokio::test]
async fn test_create_issue_sends_label_names() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues"))
        .and(body_json(serde_json::json!({
            "title": "Fix crash",
            "body": "stack trace...",
            "labels": ["bug"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(test_issue(43, "Fix crash")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let issue = client(&mock_server)
        .create_issue(
            &repo(),
            CreateIssueRequest {
                title: "Fix crash".to_string(),
                body: "stack trace...".to_string(),
                labels: vec!["bug".to_string()],
            },
        )
        .await
        .unwrap();

    assert_eq!(issue.number, 43);
    assert_eq!(issue.labels[0].color, "d73a4a");
}

#[tokio::test]
async fn test_update_and_close_issue() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/repos/acme/widgets/issues/42"))
        .and(body_json(serde_json::json!({"title": "New title", "body": "New body"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_issue(42, "New title")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/repos/acme/widgets/issues/42"))
        .and(body_json(serde_json::json!({"state": "closed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_issue(42, "New title")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let updated = client
        .update_issue(&repo(), 42, UpdateIssueRequest::edit("New title", "New body"))
        .await
        .unwrap();
    assert_eq!(updated.title, "New title");

    client.close_issue(&repo(), 42).await.unwrap();
}

#[tokio::test]
async fn test_error_statuses_are_typed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/missing/issues"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/labels"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1767225600"),
        )
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    let missing = RepoRef {
        owner: "acme".to_string(),
        repo: "missing".to_string(),
    };

    assert!(matches!(
        client.list_open_issues(&missing).await,
        Err(GitHubError::RepoNotFound { repo, .. }) if repo == "missing"
    ));
    assert!(matches!(
        client.list_open_issues(&repo()).await,
        Err(GitHubError::Unauthorized)
    ));
    assert!(matches!(
        client.list_labels(&repo()).await,
        Err(GitHubError::RateLimited { reset_time }) if reset_time == "1767225600"
    ));
}

#[tokio::test]
async fn test_reads_retry_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let issues = client(&mock_server).list_open_issues(&repo()).await.unwrap();
    assert!(issues.is_empty());
}

#[tokio::test]
async fn test_writes_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/repos/acme/widgets/issues/42"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).close_issue(&repo(), 42).await.unwrap_err();
    assert!(matches!(err, GitHubError::ApiError { status: 503, .. }));
}
