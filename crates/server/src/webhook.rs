use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use pr_bridge_core::{
    config::BridgeConfig, errors::BridgeError, identity::IdentityMap, naming::parse_channel_name,
    PullBridge,
};
use pr_bridge_platforms::github::{authenticate_with_access_token, GitHubHost};
use pr_bridge_platforms::models::{Review, ReviewComment, User};
use pr_bridge_platforms::slack::SlackChat;
use pr_bridge_platforms::CodeHostProvider;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::signature::{verify_github_signature, verify_slack_signature};

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;

/// Shared state for the request handlers.
pub struct AppState {
    /// App-authenticated client, exchanged for an installation token per
    /// delivery.
    pub octocrab: Octocrab,
    pub github_installation_id: u64,
    pub slack: SlackChat,
    pub identities: IdentityMap,
    pub config: BridgeConfig,
    pub github_webhook_secret: String,
    pub slack_signing_secret: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhookPayload {
    pub action: String,
    pub installation: Option<Installation>,
    pub repository: Option<RepositoryWire>,
    pub pull_request: Option<PullRequestWire>,
    pub review: Option<ReviewWire>,
    pub comment: Option<CommentWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Installation {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryWire {
    pub name: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestWire {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserWire {
    pub id: u64,
    pub login: String,
}

impl From<UserWire> for User {
    fn from(wire: UserWire) -> Self {
        User {
            id: wire.id,
            login: wire.login,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewWire {
    pub state: String,
    pub user: UserWire,
}

impl From<ReviewWire> for Review {
    fn from(wire: ReviewWire) -> Self {
        Review {
            state: wire.state,
            author: wire.user.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentWire {
    pub id: u64,
    pub in_reply_to_id: Option<u64>,
    pub body: Option<String>,
    pub user: UserWire,
    pub created_at: DateTime<Utc>,
}

impl From<CommentWire> for ReviewComment {
    fn from(wire: CommentWire) -> Self {
        ReviewComment {
            id: wire.id,
            in_reply_to_id: wire.in_reply_to_id,
            author: wire.user.into(),
            body: wire.body.unwrap_or_default(),
            created_at: wire.created_at,
        }
    }
}

/// Which bridge operation a delivery maps to.
#[derive(Debug)]
enum BridgeEvent {
    PullUpdate,
    Review(Review),
    Comment(ReviewComment),
}

/// Handles `POST /webhooks/github`.
///
/// Verifies the delivery signature, routes on the `X-GitHub-Event` header,
/// and spawns one task per accepted event. The response is sent as soon as
/// the task is spawned; processing failures are logged by the task and never
/// surface as an HTTP error.
#[instrument(skip(state, headers, body))]
pub async fn handle_github_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, StatusCode> {
    if !verify_github_signature(&state.github_webhook_secret, &headers, &body) {
        warn!("Webhook did not have valid signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let event_type = match headers.get("X-GitHub-Event") {
        Some(value) => value.to_str().unwrap_or(""),
        None => {
            warn!("Webhook did not carry an event type header");
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    if !matches!(
        event_type,
        "pull_request" | "pull_request_review" | "pull_request_review_comment"
    ) {
        debug!(event_type, "Event type is not handled");
        return Ok(StatusCode::OK);
    }

    let payload: WebhookPayload = serde_json::from_str(&body).map_err(|e| {
        error!(
            error = e.to_string(),
            "Could not extract webhook payload from request body"
        );
        StatusCode::BAD_REQUEST
    })?;

    debug!(
        event_type,
        action = payload.action.as_str(),
        "Received webhook delivery"
    );

    let Some(installation) = payload.installation else {
        warn!("Webhook payload did not include installation information");
        return Err(StatusCode::BAD_REQUEST);
    };
    let Some(repository) = payload.repository else {
        warn!("Webhook payload did not include repository information");
        return Err(StatusCode::BAD_REQUEST);
    };
    let Some(pr) = payload.pull_request else {
        warn!("Webhook payload did not include pull request information");
        return Err(StatusCode::BAD_REQUEST);
    };

    let parts: Vec<&str> = repository.full_name.split('/').collect();
    if parts.len() != 2 {
        warn!(
            repository = repository.name.as_str(),
            pull_request = pr.number,
            "Failed to extract the name of the repository owner"
        );
        return Err(StatusCode::BAD_REQUEST);
    }
    let repo_owner = parts[0].to_string();

    let event = match event_type {
        "pull_request" => BridgeEvent::PullUpdate,
        "pull_request_review" => {
            if payload.action != "submitted" {
                debug!(action = payload.action.as_str(), "Review action is ignored");
                return Ok(StatusCode::OK);
            }
            let Some(review) = payload.review else {
                warn!("Webhook payload did not include review information");
                return Err(StatusCode::BAD_REQUEST);
            };
            BridgeEvent::Review(review.into())
        }
        _ => {
            if payload.action != "created" {
                debug!(
                    action = payload.action.as_str(),
                    "Review comment action is ignored"
                );
                return Ok(StatusCode::OK);
            }
            let Some(comment) = payload.comment else {
                warn!("Webhook payload did not include comment information");
                return Err(StatusCode::BAD_REQUEST);
            };
            BridgeEvent::Comment(comment.into())
        }
    };

    info!(
        repository_owner = repo_owner.as_str(),
        repository = repository.name.as_str(),
        pull_request = pr.number,
        "Processing pull request event"
    );

    tokio::spawn(run_bridge_event(
        state,
        installation.id,
        repo_owner,
        repository.name,
        pr.number,
        event,
    ));

    Ok(StatusCode::OK)
}

/// Runs one bridge operation for one delivery.
///
/// Authenticates for the delivery's installation, fetches the pull request's
/// live state, and dispatches. The pull request is always re-fetched instead
/// of trusted from the payload so the reconcilers see the freshest reviewer
/// and merge state.
async fn run_bridge_event(
    state: Arc<AppState>,
    installation_id: u64,
    repo_owner: String,
    repo_name: String,
    pr_number: u64,
    event: BridgeEvent,
) {
    let client = match authenticate_with_access_token(
        &state.octocrab,
        installation_id,
        &repo_owner,
        &repo_name,
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            error!(
                repository_owner = repo_owner.as_str(),
                repository = repo_name.as_str(),
                pull_request = pr_number,
                error = e.to_string(),
                "Failed to authenticate with the code host"
            );
            return;
        }
    };

    let code_host = GitHubHost::new(client);
    let pr = match code_host
        .get_pull_request(&repo_owner, &repo_name, pr_number)
        .await
    {
        Ok(pr) => pr,
        Err(e) => {
            error!(
                repository = repo_name.as_str(),
                pull_request = pr_number,
                error = e.to_string(),
                "Failed to fetch the pull request"
            );
            return;
        }
    };

    let bridge = PullBridge::new(
        code_host,
        state.slack.clone(),
        state.identities.clone(),
        state.config.clone(),
    );

    let result = match event {
        BridgeEvent::PullUpdate => bridge.process_pull_update(&pr).await,
        BridgeEvent::Review(review) => bridge.process_review(&review, &pr).await,
        BridgeEvent::Comment(comment) => bridge.process_review_comment(&comment, &pr).await,
    };

    if let Err(e) = result {
        error!(
            repository = repo_name.as_str(),
            pull_request = pr_number,
            error = e.to_string(),
            "Failed to process pull request event"
        );
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlashCommand {
    pub channel_id: String,
    pub channel_name: String,
    pub user_name: String,
    #[serde(default)]
    pub text: String,
}

fn ephemeral(text: &str) -> Response {
    Json(json!({
        "response_type": "ephemeral",
        "text": text,
    }))
    .into_response()
}

/// Handles `POST /commands/slack`.
///
/// Verifies the request signature, relays the command text as a pull request
/// comment, and answers with an ephemeral notice when the command was issued
/// outside a managed channel. The relay runs inline so a failure can still be
/// reported to the invoking user.
#[instrument(skip(state, headers, body))]
pub async fn handle_slack_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, StatusCode> {
    if !verify_slack_signature(&state.slack_signing_secret, &headers, &body) {
        warn!("Slash command did not have valid signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let command: SlashCommand = serde_urlencoded::from_str(&body).map_err(|e| {
        error!(
            error = e.to_string(),
            "Could not extract slash command payload from request body"
        );
        StatusCode::BAD_REQUEST
    })?;

    if command.text.trim().is_empty() {
        return Ok(ephemeral("Nothing to post. Usage: /add-pr-comment <text>"));
    }

    // Reject commands from unmanaged channels before touching either
    // platform.
    if parse_channel_name(&command.channel_name).is_none() {
        info!(
            channel = command.channel_name.as_str(),
            "Slash command invoked outside a managed channel"
        );
        return Ok(ephemeral(
            "This command only works inside a pull request channel.",
        ));
    }

    // Slash payloads carry no installation information, so the relay
    // authenticates against the configured installation.
    let client = match authenticate_with_access_token(
        &state.octocrab,
        state.github_installation_id,
        &state.config.repository_owner,
        &command.channel_name,
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            error!(
                error = e.to_string(),
                "Failed to authenticate with the code host"
            );
            return Ok(ephemeral("Could not add the comment, please try again."));
        }
    };

    let bridge = PullBridge::new(
        GitHubHost::new(client),
        state.slack.clone(),
        state.identities.clone(),
        state.config.clone(),
    );

    match bridge
        .process_command(
            &command.channel_id,
            &command.channel_name,
            &command.user_name,
            &command.text,
        )
        .await
    {
        Ok(()) => Ok(StatusCode::OK.into_response()),
        Err(BridgeError::NotManagedChannel(_)) => {
            info!(
                channel = command.channel_name.as_str(),
                "Slash command invoked outside a managed channel"
            );
            Ok(ephemeral(
                "This command only works inside a pull request channel.",
            ))
        }
        Err(e) => {
            error!(
                channel = command.channel_name.as_str(),
                error = e.to_string(),
                "Failed to relay the slash command"
            );
            Ok(ephemeral("Could not add the comment, please try again."))
        }
    }
}
