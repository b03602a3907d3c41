//! # Models
//!
//! Data models shared by the code host and chat platform adapters.
//!
//! These are deliberately thin slices of each platform's data model: only the
//! fields the synchronization logic reads (channels, topics, membership,
//! messages, pull requests, review comments) are represented here. They are
//! serializable so that webhook payloads and API responses can be mapped onto
//! them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A user account on the code host.
///
/// The `login` is the handle used by the identity mapping to resolve a chat
/// platform user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The unique identifier of the user
    pub id: u64,

    /// The login handle of the user
    pub login: String,
}

/// A repository on the code host, identified by owner and name.
///
/// Pull request numbers are only unique within a repository, so every
/// operation that addresses a pull request carries one of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// The account or organization that owns the repository
    pub owner: String,

    /// The repository name
    pub name: String,
}

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    /// The pull request is open for review
    #[default]
    Open,

    /// The pull request has been merged or closed
    Closed,
}

/// Tri-state merge status of a pull request.
///
/// Collapsed from the code host's richer mergeable-state vocabulary: anything
/// that prevents merging maps to [`MergeStatus::Blocked`], a clean state maps
/// to [`MergeStatus::Mergeable`], and everything else (including "the host has
/// not computed it yet") maps to [`MergeStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    /// The pull request can be merged
    Mergeable,

    /// The pull request is blocked from merging
    Blocked,

    /// The merge status has not been determined
    #[default]
    Unknown,
}

/// A pull request as seen by the synchronization logic.
///
/// Owned by the code host; the bridge only reads it, and only ever writes to
/// it by appending comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// The pull request number, unique within its repository
    pub number: u64,

    /// The repository the pull request belongs to
    pub repository: Repository,

    /// The user who opened the pull request
    pub author: User,

    /// The title of the pull request
    pub title: String,

    /// The description/body of the pull request, if any
    pub body: Option<String>,

    /// Whether the pull request is open or closed
    pub state: PullRequestState,

    /// The current merge status
    pub merge_status: MergeStatus,

    /// The reviewers currently requested on the pull request
    pub requested_reviewers: Vec<User>,

    /// Link to the pull request on the code host
    pub html_url: String,
}

/// A chat platform channel.
///
/// The `id` is opaque and assigned by the platform; the `name` is derived via
/// the naming scheme and never rewritten after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// The platform-assigned channel identifier
    pub id: String,

    /// The channel name
    pub name: String,

    /// Whether the channel has been archived
    #[serde(default)]
    pub is_archived: bool,

    /// The channel topic, if one has been set
    pub topic: Option<String>,
}

/// A review comment on a pull request.
///
/// Review comments form reply chains: each comment has at most one parent via
/// `in_reply_to_id`, and the comment with no parent is the thread root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// The unique identifier of the comment
    pub id: u64,

    /// The comment this one replies to, if any
    pub in_reply_to_id: Option<u64>,

    /// The user who wrote the comment
    pub author: User,

    /// The text content of the comment
    pub body: String,

    /// When the comment was created
    pub created_at: DateTime<Utc>,
}

/// A message posted to a chat channel.
///
/// The `ts` timestamp doubles as the message identity and sort key; the chat
/// platform guarantees it is unique and monotonically increasing per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The platform timestamp identifying the message
    pub ts: String,

    /// The text content of the message
    #[serde(default)]
    pub text: String,

    /// The timestamp of the thread parent, when the message is a reply
    pub thread_ts: Option<String>,

    /// The bot that authored the message, when it was posted by a bot
    pub bot_id: Option<String>,
}

/// An outbound chat message.
///
/// `blocks` carries optional rich (block-structured) content; `text` is always
/// present as the notification fallback. Link unfurling is suppressed for
/// machine-generated messages so PR links do not expand into previews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// The plain-text body of the message
    pub text: String,

    /// Optional block-structured rich content
    pub blocks: Option<serde_json::Value>,

    /// Whether the platform may expand links into previews
    pub unfurl_links: bool,

    /// Thread parent timestamp, when posting into a thread
    pub thread_ts: Option<String>,
}

impl MessagePayload {
    /// Builds a plain-text payload with link unfurling suppressed.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: None,
            unfurl_links: false,
            thread_ts: None,
        }
    }

    /// Attaches block-structured content to the payload.
    pub fn with_blocks(mut self, blocks: serde_json::Value) -> Self {
        self.blocks = Some(blocks);
        self
    }
}

/// The slice of a submitted review the bridge acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// The review state reported by the code host, e.g. `approved`
    pub state: String,

    /// The user who submitted the review
    pub author: User,
}
