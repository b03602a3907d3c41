use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::EncodingKey;
use octocrab::models::pulls::MergeableState;
use octocrab::models::IssueState;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    errors::Error,
    models::{MergeStatus, PullRequest, PullRequestState, Repository, ReviewComment, User},
    CodeHostProvider,
};

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

/// Authenticates with GitHub using an installation access token for a specific app installation.
///
/// This function retrieves an access token for a GitHub App installation and creates a new
/// `Octocrab` client authenticated with that token. Webhook deliveries carry the installation
/// id, so each event handler authenticates for the repository it is about to touch.
///
/// # Arguments
///
/// * `octocrab` - An existing `Octocrab` client instance, authenticated as the app.
/// * `installation_id` - The ID of the GitHub App installation.
/// * `repository_owner` - The owner of the repository associated with the installation.
/// * `repository` - The name of the repository associated with the installation.
///
/// # Returns
///
/// A `Result` containing a new `Octocrab` client authenticated with the installation access
/// token, or an `Error` if the operation fails.
///
/// # Errors
///
/// This function returns an `Error` in the following cases:
/// - If the app installation cannot be found.
/// - If the access token cannot be created.
#[instrument]
pub async fn authenticate_with_access_token(
    octocrab: &Octocrab,
    installation_id: u64,
    repository_owner: &str,
    repository: &str,
) -> Result<Octocrab, Error> {
    debug!(
        repository_owner = repository_owner,
        repository = repository,
        installation_id,
        "Finding installation"
    );

    let (api_with_token, _) = octocrab
        .installation_and_token(installation_id.into())
        .await
        .map_err(|_| {
            error!(
                repository_owner = repository_owner,
                repository = repository,
                installation_id,
                "Failed to create a token for the installation",
            );

            Error::InvalidResponse
        })?;

    info!(
        repository_owner = repository_owner,
        repository = repository,
        installation_id,
        "Created access token for installation",
    );

    Ok(api_with_token)
}

/// Creates an `Octocrab` client authenticated as a GitHub App using a JWT token.
///
/// This function generates a JSON Web Token (JWT) for the specified GitHub App ID and private
/// key, and uses it to create an authenticated `Octocrab` client. The client can then be used
/// to perform API operations on behalf of the GitHub App.
///
/// # Arguments
///
/// * `app_id` - The ID of the GitHub App.
/// * `private_key` - The private key associated with the GitHub App, in PEM format.
///
/// # Returns
///
/// A `Result` containing an authenticated `Octocrab` client, or an `Error` if the operation
/// fails.
///
/// # Errors
///
/// This function returns an `Error` in the following cases:
/// - If the private key cannot be parsed.
/// - If the `Octocrab` client cannot be built.
#[instrument(skip(private_key))]
pub async fn create_app_client(app_id: u64, private_key: &str) -> Result<Octocrab, Error> {
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        Error::AuthError(format!("Failed to translate the private key. Error was: {}", e))
    })?;

    let octocrab = Octocrab::builder()
        .app(app_id.into(), key)
        .build()
        .map_err(|_| Error::AuthError("Failed to build a client for the GitHub app.".to_string()))?;

    info!("Created access token for the GitHub app");

    Ok(octocrab)
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = *source;
            error!(
                error_message = err.message,
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}

/// Wire shape of a review comment as returned by the pulls comments endpoint.
///
/// Octocrab does not wrap the review-comment reply endpoints, so the listing
/// goes through the generic JSON API and is deserialized into this slice.
#[derive(Debug, Deserialize)]
struct ReviewCommentWire {
    id: u64,
    in_reply_to_id: Option<u64>,
    body: Option<String>,
    user: UserWire,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct UserWire {
    id: u64,
    login: String,
}

fn merge_status_from(state: Option<MergeableState>) -> MergeStatus {
    match state {
        Some(MergeableState::Clean) => MergeStatus::Mergeable,
        Some(MergeableState::Blocked)
        | Some(MergeableState::Dirty)
        | Some(MergeableState::Behind) => MergeStatus::Blocked,
        _ => MergeStatus::Unknown,
    }
}

/// Code host adapter backed by the GitHub REST API.
#[derive(Debug, Default)]
pub struct GitHubHost {
    client: Octocrab,
}

impl GitHubHost {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CodeHostProvider for GitHubHost {
    #[instrument]
    async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error> {
        let pr = match self
            .client
            .pulls(repo_owner, repo_name)
            .get(pr_number)
            .await
        {
            Ok(pr) => pr,
            Err(e) => {
                log_octocrab_error("Failed to get pull request information", e);
                return Err(Error::InvalidResponse);
            }
        };

        let author = pr
            .user
            .map(|u| User {
                id: u.id.into_inner(),
                login: u.login,
            })
            .unwrap_or_default();

        let requested_reviewers = pr
            .requested_reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|u| User {
                id: u.id.into_inner(),
                login: u.login,
            })
            .collect();

        Ok(PullRequest {
            number: pr.number,
            repository: Repository {
                owner: repo_owner.to_string(),
                name: repo_name.to_string(),
            },
            author,
            title: pr.title.unwrap_or_default(),
            body: pr.body,
            state: match pr.state {
                Some(IssueState::Closed) => PullRequestState::Closed,
                _ => PullRequestState::Open,
            },
            merge_status: merge_status_from(pr.mergeable_state),
            requested_reviewers,
            html_url: pr
                .html_url
                .map(|u| u.to_string())
                .unwrap_or_else(|| {
                    format!(
                        "https://github.com/{}/{}/pull/{}",
                        repo_owner, repo_name, pr_number
                    )
                }),
        })
    }

    #[instrument]
    async fn list_review_comments(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<ReviewComment>, Error> {
        // Page through the review-comment listing until a short page signals
        // the end. Octocrab has no typed handler for this endpoint.
        let per_page = 100usize;
        let mut page = 1usize;
        let mut comments: Vec<ReviewCommentWire> = Vec::new();
        loop {
            let route = format!(
                "/repos/{}/{}/pulls/{}/comments?per_page={}&page={}",
                repo_owner, repo_name, pr_number, per_page, page
            );
            let batch: Vec<ReviewCommentWire> =
                match self.client.get(route, None::<&()>).await {
                    Ok(b) => b,
                    Err(e) => {
                        log_octocrab_error("Failed to list review comments for pull request", e);
                        return Err(Error::InvalidResponse);
                    }
                };

            let len = batch.len();
            comments.extend(batch);
            if len < per_page {
                break;
            }
            page += 1;
        }

        let result = comments
            .into_iter()
            .map(|c| ReviewComment {
                id: c.id,
                in_reply_to_id: c.in_reply_to_id,
                author: User {
                    id: c.user.id,
                    login: c.user.login,
                },
                body: c.body.unwrap_or_default(),
                created_at: c.created_at,
            })
            .collect();

        Ok(result)
    }

    #[instrument]
    async fn add_issue_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), Error> {
        match self
            .client
            .issues(repo_owner, repo_name)
            .create_comment(pr_number, body)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                log_octocrab_error("Failed to add pull request comment", e);
                Err(Error::ApiError())
            }
        }
    }

    #[instrument]
    async fn reply_to_review_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        comment_id: u64,
        body: &str,
    ) -> Result<(), Error> {
        let route = format!(
            "/repos/{}/{}/pulls/{}/comments/{}/replies",
            repo_owner, repo_name, pr_number, comment_id
        );
        let payload = json!({ "body": body });

        self.client._post(route, Some(&payload)).await.map_err(|e| {
            log_octocrab_error("Failed to reply to review comment", e);
            Error::ApiError()
        })?;
        Ok(())
    }
}
