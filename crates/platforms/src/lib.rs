//! # Platform adapters
//!
//! Traits and implementations for the two external platforms the bridge talks
//! to: the code host that owns pull requests and review comments, and the
//! chat platform that owns channels, membership and messages.
//!
//! The synchronization logic in `pr_bridge_core` is written against the
//! [`CodeHostProvider`] and [`ChatProvider`] traits so it can be tested with
//! in-memory fixtures; [`github::GitHubHost`] and [`slack::SlackChat`] are the
//! production implementations.

use async_trait::async_trait;

pub mod errors;

pub mod github;

pub mod models;

pub mod slack;

use errors::Error;
use models::{Channel, ChatMessage, MessagePayload, PullRequest, ReviewComment};

/// Trait for interacting with the code hosting platform (e.g. GitHub).
///
/// The bridge only ever reads pull request state and appends comments; it
/// never mutates the pull request itself.
#[async_trait]
pub trait CodeHostProvider: Send + Sync {
    /// Retrieves a pull request from the code host.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    ///
    /// # Returns
    ///
    /// A `Result` containing the pull request information
    async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error>;

    /// Lists all review comments on a pull request.
    ///
    /// Follows the code host's pagination until exhausted and returns the
    /// flattened collection. Review comments carry their reply-chain parent
    /// via `in_reply_to_id`.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of review comments
    async fn list_review_comments(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<ReviewComment>, Error>;

    /// Adds a comment to the pull request's main conversation.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    /// * `body` - The comment text to add
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    async fn add_issue_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), Error>;

    /// Posts a reply to a review comment thread.
    ///
    /// The reply is anchored to `comment_id`, which should be the thread
    /// root so the reply lands at the end of the visible thread.
    ///
    /// # Arguments
    ///
    /// * `repo_owner` - The owner of the repository
    /// * `repo_name` - The name of the repository
    /// * `pr_number` - The pull request number
    /// * `comment_id` - The review comment to reply to
    /// * `body` - The reply text
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    async fn reply_to_review_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        comment_id: u64,
        body: &str,
    ) -> Result<(), Error>;
}

/// Trait for interacting with the chat platform (e.g. Slack).
///
/// Covers the slice of the chat platform's API the bridge needs: channel
/// lifecycle, membership, topics, messages and permalinks. All listing
/// operations follow cursor pagination to exhaustion and return flattened,
/// order-irrelevant collections.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Lists all channels visible to the bot.
    async fn list_channels(&self) -> Result<Vec<Channel>, Error>;

    /// Creates a new public channel with the given name.
    ///
    /// Returns [`Error::ChannelNameTaken`] when the name is already in use so
    /// the caller can resolve the creation race by re-fetching.
    async fn create_channel(&self, name: &str) -> Result<Channel, Error>;

    /// Archives a channel.
    ///
    /// Archiving a channel that is already archived is treated as success.
    async fn archive_channel(&self, channel_id: &str) -> Result<(), Error>;

    /// Sets the channel topic.
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), Error>;

    /// Posts a message into a channel.
    ///
    /// Returns the posted message, whose `ts` identifies it for permalink
    /// lookups.
    async fn post_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<ChatMessage, Error>;

    /// Invites the given users into a channel in a single batched call.
    ///
    /// Callers are expected to pass only users that are not yet members; the
    /// reconciler computes that delta before calling.
    async fn invite_members(&self, channel_id: &str, user_ids: &[String]) -> Result<(), Error>;

    /// Lists the user ids of all members of a channel.
    async fn list_members(&self, channel_id: &str) -> Result<Vec<String>, Error>;

    /// Fetches a permanent link to a message.
    async fn get_permalink(&self, channel_id: &str, message_ts: &str) -> Result<String, Error>;

    /// Returns the bot id of the authenticated bot user.
    async fn bot_identity(&self) -> Result<String, Error>;
}
