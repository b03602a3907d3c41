use super::*;
use axum::extract::State;
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use octocrab::Octocrab;
use sha2::Sha256;

const GITHUB_SECRET: &str = "gh-secret";
const SLACK_SECRET: &str = "slack-secret";

fn test_state() -> Arc<AppState> {
    Arc::new(AppState {
        octocrab: Octocrab::default(),
        github_installation_id: 1,
        slack: SlackChat::new("xoxb-test"),
        identities: IdentityMap::default(),
        config: BridgeConfig::new("acme"),
        github_webhook_secret: GITHUB_SECRET.to_string(),
        slack_signing_secret: SLACK_SECRET.to_string(),
    })
}

fn github_headers(event: &str, body: &str) -> HeaderMap {
    let mut mac = Hmac::<Sha256>::new_from_slice(GITHUB_SECRET.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

    let mut headers = HeaderMap::new();
    headers.insert("X-Hub-Signature-256", signature.parse().unwrap());
    headers.insert("X-GitHub-Event", event.parse().unwrap());
    headers
}

fn slack_headers(body: &str) -> HeaderMap {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(SLACK_SECRET.as_bytes()).unwrap();
    mac.update(format!("v0:{}:{}", timestamp, body).as_bytes());
    let signature = format!("v0={}", hex::encode(mac.finalize().into_bytes()));

    let mut headers = HeaderMap::new();
    headers.insert("X-Slack-Signature", signature.parse().unwrap());
    headers.insert(
        "X-Slack-Request-Timestamp",
        timestamp.to_string().parse().unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_github_webhook_rejects_missing_signature() {
    let headers = HeaderMap::new();
    let result = handle_github_webhook(State(test_state()), headers, "{}".to_string()).await;

    assert_eq!(result, Err(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_github_webhook_ignores_unhandled_event_types() {
    let body = r#"{ "action": "opened" }"#.to_string();
    let headers = github_headers("issues", &body);

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Ok(StatusCode::OK));
}

#[tokio::test]
async fn test_github_webhook_requires_event_type_header() {
    let body = "{}".to_string();
    let mut headers = github_headers("pull_request", &body);
    headers.remove("X-GitHub-Event");

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Err(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_github_webhook_rejects_malformed_payload() {
    let body = "not json".to_string();
    let headers = github_headers("pull_request", &body);

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Err(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_github_webhook_requires_installation() {
    let body = serde_json::json!({
        "action": "opened",
        "repository": { "name": "svc", "full_name": "acme/svc" },
        "pull_request": { "number": 42 },
    })
    .to_string();
    let headers = github_headers("pull_request", &body);

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Err(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_github_webhook_rejects_malformed_repository_name() {
    let body = serde_json::json!({
        "action": "opened",
        "installation": { "id": 7 },
        "repository": { "name": "svc", "full_name": "svc" },
        "pull_request": { "number": 42 },
    })
    .to_string();
    let headers = github_headers("pull_request", &body);

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Err(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_github_webhook_ignores_unsubmitted_review_actions() {
    let body = serde_json::json!({
        "action": "dismissed",
        "installation": { "id": 7 },
        "repository": { "name": "svc", "full_name": "acme/svc" },
        "pull_request": { "number": 42 },
        "review": { "state": "approved", "user": { "id": 1, "login": "alice" } },
    })
    .to_string();
    let headers = github_headers("pull_request_review", &body);

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Ok(StatusCode::OK));
}

#[tokio::test]
async fn test_github_webhook_ignores_edited_comment_actions() {
    let body = serde_json::json!({
        "action": "edited",
        "installation": { "id": 7 },
        "repository": { "name": "svc", "full_name": "acme/svc" },
        "pull_request": { "number": 42 },
        "comment": {
            "id": 9,
            "in_reply_to_id": null,
            "body": "take this to slack",
            "user": { "id": 1, "login": "alice" },
            "created_at": "2024-03-01T10:00:00Z",
        },
    })
    .to_string();
    let headers = github_headers("pull_request_review_comment", &body);

    let result = handle_github_webhook(State(test_state()), headers, body).await;

    assert_eq!(result, Ok(StatusCode::OK));
}

#[test]
fn test_webhook_payload_parses_review_comment_delivery() {
    let body = serde_json::json!({
        "action": "created",
        "installation": { "id": 7 },
        "repository": { "name": "svc", "full_name": "acme/svc" },
        "pull_request": { "number": 42 },
        "comment": {
            "id": 9,
            "in_reply_to_id": 3,
            "body": "take this to slack",
            "user": { "id": 1, "login": "alice" },
            "created_at": "2024-03-01T10:00:00Z",
        },
    })
    .to_string();

    let payload: WebhookPayload = serde_json::from_str(&body).unwrap();

    assert_eq!(payload.action, "created");
    assert_eq!(payload.installation.unwrap().id, 7);
    assert_eq!(payload.repository.unwrap().full_name, "acme/svc");
    assert_eq!(payload.pull_request.unwrap().number, 42);

    let comment: ReviewComment = payload.comment.unwrap().into();
    assert_eq!(comment.id, 9);
    assert_eq!(comment.in_reply_to_id, Some(3));
    assert_eq!(comment.author.login, "alice");
}

#[test]
fn test_review_wire_conversion() {
    let wire = ReviewWire {
        state: "approved".to_string(),
        user: UserWire {
            id: 1,
            login: "alice".to_string(),
        },
    };

    let review: Review = wire.into();

    assert_eq!(review.state, "approved");
    assert_eq!(review.author.login, "alice");
}

#[test]
fn test_slash_command_parses_form_encoding() {
    let body = "channel_id=C42&channel_name=pr-42-svc&user_name=alice&text=please+rebase";

    let command: SlashCommand = serde_urlencoded::from_str(body).unwrap();

    assert_eq!(command.channel_id, "C42");
    assert_eq!(command.channel_name, "pr-42-svc");
    assert_eq!(command.user_name, "alice");
    assert_eq!(command.text, "please rebase");
}

#[tokio::test]
async fn test_slack_command_rejects_missing_signature() {
    let headers = HeaderMap::new();
    let result = handle_slack_command(State(test_state()), headers, String::new()).await;

    assert!(matches!(result, Err(StatusCode::UNAUTHORIZED)));
}

#[tokio::test]
async fn test_slack_command_rejects_malformed_body() {
    let body = "channel_id=C42".to_string();
    let headers = slack_headers(&body);

    let result = handle_slack_command(State(test_state()), headers, body).await;

    assert!(matches!(result, Err(StatusCode::BAD_REQUEST)));
}

#[tokio::test]
async fn test_slack_command_rejects_empty_text() {
    let body = "channel_id=C42&channel_name=pr-42-svc&user_name=alice&text=".to_string();
    let headers = slack_headers(&body);

    let response = handle_slack_command(State(test_state()), headers, body)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["response_type"], "ephemeral");
}

#[tokio::test]
async fn test_slack_command_rejects_unmanaged_channel() {
    let body = "channel_id=C99&channel_name=general&user_name=alice&text=hello".to_string();
    let headers = slack_headers(&body);

    let response = handle_slack_command(State(test_state()), headers, body)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["response_type"], "ephemeral");
    assert!(json["text"].as_str().unwrap().contains("pull request channel"));
}
