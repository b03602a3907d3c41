//! # PR Bridge Core
//!
//! Synchronization and reconciliation logic that keeps a chat workspace's
//! channel set converged with the open pull request set of a repository.
//!
//! For each pull request the bridge maintains exactly one dedicated
//! discussion channel: it creates the channel when the pull request is first
//! observed, keeps membership and topic in sync with reviewer assignments and
//! merge status, mirrors triggered review comment threads into the channel,
//! and archives the channel when the pull request closes.
//!
//! All state lives on the two platforms. Every operation recomputes the
//! desired state from their live data and applies only the missing delta, so
//! running any operation twice in a row performs no second write. There is no
//! local cache and no cross-task locking; rapid duplicate events converge
//! through idempotency, and a creation race is resolved by re-fetching and
//! preferring the existing channel.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pr_bridge_core::{
//!     config::BridgeConfig, errors::BridgeError, identity::IdentityMap, PullBridge,
//! };
//! use pr_bridge_platforms::{models::PullRequest, ChatProvider, CodeHostProvider};
//!
//! async fn handle_pull_event<C, S>(code_host: C, chat: S, pr: &PullRequest) -> Result<(), BridgeError>
//! where
//!     C: CodeHostProvider + std::fmt::Debug,
//!     S: ChatProvider + std::fmt::Debug,
//! {
//!     let identities = IdentityMap::from_json(r#"{ "alice": "U123" }"#)
//!         .unwrap_or_default();
//!     let bridge = PullBridge::new(code_host, chat, identities, BridgeConfig::new("acme"));
//!
//!     bridge.process_pull_update(pr).await?;
//!     Ok(())
//! }
//! ```

use indoc::formatdoc;
use pr_bridge_platforms::errors::Error as PlatformError;
use pr_bridge_platforms::models::{
    Channel, MessagePayload, PullRequest, PullRequestState, Review, ReviewComment,
};
use pr_bridge_platforms::{ChatProvider, CodeHostProvider};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

pub mod bridge;

pub mod config;
use config::BridgeConfig;

pub mod errors;
use errors::BridgeError;

pub mod identity;
use identity::IdentityMap;

pub mod naming;
use naming::{channel_name_for, parse_channel_name, revision_name_for};

pub mod status;
use status::ChannelStatus;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Outcome of the channel directory lookup for one pull request.
///
/// `active` is the non-archived managed channel, when one exists.
/// `highest_revision` counts every revision ever created (archived ones
/// included) so a fresh channel after archival gets the next suffix.
#[derive(Debug, Default)]
struct ChannelSelection {
    active: Option<Channel>,
    highest_revision: u32,
}

/// Filters a channel listing down to the managed channels for one pull
/// request and picks the current one.
///
/// The listing is the single source of truth for "does a channel exist"; no
/// local cache is consulted. The scan is O(total channels) per lookup by
/// design — channel counts are small relative to event volume.
fn select_channel(channels: Vec<Channel>, repository: &str, number: u64) -> ChannelSelection {
    let base = channel_name_for(repository, number);
    let Some(target) = parse_channel_name(&base) else {
        return ChannelSelection::default();
    };

    let mut selection = ChannelSelection::default();
    for channel in channels {
        let Some(parsed) = parse_channel_name(&channel.name) else {
            continue;
        };
        if parsed.repository != target.repository || parsed.number != target.number {
            continue;
        }

        selection.highest_revision = selection.highest_revision.max(parsed.revision);
        if !channel.is_archived {
            let replace = match &selection.active {
                Some(current) => {
                    parse_channel_name(&current.name)
                        .map(|p| parsed.revision > p.revision)
                        .unwrap_or(true)
                }
                None => true,
            };
            if replace {
                selection.active = Some(channel);
            }
        }
    }

    selection
}

/// Main struct for converging channel state with pull request state.
///
/// `PullBridge` is constructed with the two platform providers, the identity
/// mapping, and a [`BridgeConfig`]; all of them are injected so the logic can
/// be exercised against fixture providers in tests.
#[derive(Debug)]
pub struct PullBridge<C, S>
where
    C: CodeHostProvider + std::fmt::Debug,
    S: ChatProvider + std::fmt::Debug,
{
    code_host: C,
    chat: S,
    identities: IdentityMap,
    config: BridgeConfig,
}

impl<C, S> PullBridge<C, S>
where
    C: CodeHostProvider + std::fmt::Debug,
    S: ChatProvider + std::fmt::Debug,
{
    pub fn new(code_host: C, chat: S, identities: IdentityMap, config: BridgeConfig) -> Self {
        Self {
            code_host,
            chat,
            identities,
            config,
        }
    }

    /// Handles a pull request lifecycle event.
    ///
    /// For an open pull request: ensures the channel exists, then reconciles
    /// membership and topic. For a closed pull request: archives the active
    /// channel when there is one, and does nothing when there is not — a
    /// channel is never created just to be archived.
    ///
    /// The steps run strictly in sequence; a failure part-way through leaves
    /// a valid state that the next event resumes from.
    #[instrument(skip(self, pr), fields(repository = %pr.repository.name, pull_request = pr.number))]
    pub async fn process_pull_update(&self, pr: &PullRequest) -> Result<(), BridgeError> {
        match pr.state {
            PullRequestState::Open => {
                let channel = self.ensure_channel(pr).await?;
                self.sync_members(pr, &channel).await?;
                self.sync_status(pr, &channel).await?;
                Ok(())
            }
            PullRequestState::Closed => {
                let selection = self.lookup(pr).await?;
                match selection.active {
                    Some(channel) => self.archive(pr, &channel).await,
                    None => {
                        debug!(
                            pull_request = pr.number,
                            "Closed pull request has no active channel, nothing to archive"
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    /// Handles a submitted review event.
    ///
    /// Only `approved` reviews produce an announcement in the channel; every
    /// other review state is ignored. A missing channel is a logged no-op.
    #[instrument(skip(self, review, pr), fields(pull_request = pr.number))]
    pub async fn process_review(&self, review: &Review, pr: &PullRequest) -> Result<(), BridgeError> {
        if review.state != "approved" {
            debug!(
                review_state = review.state.as_str(),
                "Review state does not get announced"
            );
            return Ok(());
        }

        let selection = self.lookup(pr).await?;
        let Some(channel) = selection.active else {
            info!(
                pull_request = pr.number,
                "No active channel for approved pull request, skipping announcement"
            );
            return Ok(());
        };

        let text = format!(
            "✅ <!here> {} approved this pull request!",
            review.author.login
        );
        self.chat
            .post_message(&channel.id, &MessagePayload::text(text))
            .await
            .map_err(|e| BridgeError::platform("posting the approval announcement", e))?;

        info!(channel = channel.name.as_str(), "Posted approval announcement");
        Ok(())
    }

    /// Handles a created review comment.
    ///
    /// When the comment contains the trigger phrase, mirrors the comment's
    /// thread into the pull request's channel and leaves a back-link reply on
    /// the code host, anchored at the thread root. A failure while gathering
    /// context or publishing aborts the bridge for this event; whatever was
    /// already posted stays (a retry may produce a benign duplicate).
    #[instrument(skip(self, comment, pr), fields(pull_request = pr.number, comment = comment.id))]
    pub async fn process_review_comment(
        &self,
        comment: &ReviewComment,
        pr: &PullRequest,
    ) -> Result<(), BridgeError> {
        if !bridge::is_trigger(&comment.body, &self.config.trigger_phrase) {
            return Ok(());
        }

        let selection = self.lookup(pr).await?;
        let Some(channel) = selection.active else {
            warn!(
                pull_request = pr.number,
                "Comment bridge triggered but the pull request has no active channel"
            );
            return Ok(());
        };

        let all_comments = self
            .code_host
            .list_review_comments(
                &pr.repository.owner,
                &pr.repository.name,
                pr.number,
            )
            .await
            .map_err(|e| BridgeError::platform("listing review comments", e))?;

        let root_id = bridge::thread_root(&all_comments, comment);
        let context =
            bridge::comments_in_thread(&all_comments, root_id, self.config.context_window);

        let payload = MessagePayload::text(bridge::render_context_text(&context)).with_blocks(
            bridge::render_context_blocks(&context, &self.identities, self.config.context_window),
        );
        let posted = self
            .chat
            .post_message(&channel.id, &payload)
            .await
            .map_err(|e| BridgeError::platform("publishing the mirrored thread", e))?;

        let permalink = self
            .chat
            .get_permalink(&channel.id, &posted.ts)
            .await
            .map_err(|e| BridgeError::platform("fetching the thread permalink", e))?;

        self.code_host
            .reply_to_review_comment(
                &pr.repository.owner,
                &pr.repository.name,
                pr.number,
                root_id,
                &bridge::back_link_comment(&permalink),
            )
            .await
            .map_err(|e| BridgeError::platform("posting the back-link reply", e))?;

        info!(
            channel = channel.name.as_str(),
            thread_root = root_id,
            mirrored = context.len(),
            "Mirrored review thread into channel"
        );
        Ok(())
    }

    /// Handles a slash command invoked inside a channel.
    ///
    /// Parses the channel name back into a pull request reference, posts the
    /// command text as a comment on that pull request attributed to the
    /// invoking user, and confirms into the channel. Invocation from a
    /// channel outside the managed naming convention returns
    /// [`BridgeError::NotManagedChannel`], which the caller surfaces as an
    /// ephemeral notice.
    #[instrument(skip(self, text))]
    pub async fn process_command(
        &self,
        channel_id: &str,
        channel_name: &str,
        user_name: &str,
        text: &str,
    ) -> Result<(), BridgeError> {
        let Some(pull) = parse_channel_name(channel_name) else {
            return Err(BridgeError::NotManagedChannel(channel_name.to_string()));
        };

        let comment = format!("**{}** says:\n{}", user_name, text);
        self.code_host
            .add_issue_comment(
                &self.config.repository_owner,
                &pull.repository,
                pull.number,
                &comment,
            )
            .await
            .map_err(|e| BridgeError::platform("relaying the command comment", e))?;

        let confirmation = format!(
            "Comment added to pull request #{} in {}.",
            pull.number, pull.repository
        );
        self.chat
            .post_message(channel_id, &MessagePayload::text(confirmation))
            .await
            .map_err(|e| BridgeError::platform("confirming the relayed comment", e))?;

        info!(
            channel = channel_name,
            pull_request = pull.number,
            "Relayed command comment to pull request"
        );
        Ok(())
    }

    /// Looks up the managed channels for a pull request.
    async fn lookup(&self, pr: &PullRequest) -> Result<ChannelSelection, BridgeError> {
        let channels = self
            .chat
            .list_channels()
            .await
            .map_err(|e| BridgeError::platform("listing channels", e))?;
        Ok(select_channel(channels, &pr.repository.name, pr.number))
    }

    /// Returns the pull request's active channel, creating it when absent.
    ///
    /// Safe to call repeatedly: the directory lookup happens before creation,
    /// and a creation race (the platform reporting the name as taken) is
    /// resolved by re-fetching and treating the existing channel as success.
    /// A pull request whose previous channels were all archived gets a fresh
    /// channel under the next revision suffix; archived channels are never
    /// resurrected.
    ///
    /// Creation order matters for resumability: channel, then the first
    /// message, then the topic, then the bootstrap comment on the pull
    /// request. Any completed prefix is a valid state the next event
    /// continues from.
    #[instrument(skip(self, pr), fields(repository = %pr.repository.name, pull_request = pr.number))]
    pub async fn ensure_channel(&self, pr: &PullRequest) -> Result<Channel, BridgeError> {
        let selection = self.lookup(pr).await?;
        if let Some(channel) = selection.active {
            debug!(channel = channel.name.as_str(), "Channel already exists");
            return Ok(channel);
        }

        let name = revision_name_for(
            &pr.repository.name,
            pr.number,
            selection.highest_revision + 1,
        );
        if selection.highest_revision > 0 {
            info!(
                channel = name.as_str(),
                "All previous channels archived, creating a fresh revision"
            );
        }

        let mut channel = match self.chat.create_channel(&name).await {
            Ok(channel) => channel,
            Err(PlatformError::ChannelNameTaken(_)) => {
                // Another task won the creation race; its channel is ours.
                info!(
                    channel = name.as_str(),
                    "Channel creation raced, using the existing channel"
                );
                let selection = self.lookup(pr).await?;
                return selection.active.ok_or(BridgeError::CreationRace(name));
            }
            Err(e) => return Err(BridgeError::platform("creating the channel", e)),
        };

        info!(channel = channel.name.as_str(), "Created channel");

        self.chat
            .post_message(&channel.id, &MessagePayload::text(first_message_text(pr)))
            .await
            .map_err(|e| BridgeError::platform("posting the channel's first message", e))?;

        let topic = ChannelStatus::from_pull(pr).encode();
        self.chat
            .set_topic(&channel.id, &topic)
            .await
            .map_err(|e| BridgeError::platform("setting the initial topic", e))?;
        channel.topic = Some(topic);

        // The bootstrap comment is a courtesy; its failure must not fail the
        // channel that was just created.
        if let Err(e) = self
            .code_host
            .add_issue_comment(
                &pr.repository.owner,
                &pr.repository.name,
                pr.number,
                &bootstrap_comment(&channel),
            )
            .await
        {
            warn!(
                pull_request = pr.number,
                channel = channel.name.as_str(),
                error = e.to_string(),
                "Failed to leave the bootstrap comment on the pull request"
            );
        }

        Ok(channel)
    }

    /// Reconciles channel membership with the pull request's participants.
    ///
    /// Desired membership is the mapped author plus the mapped requested
    /// reviewers; handles with no identity mapping are skipped. Only the
    /// missing members are invited, in a single batched call; an empty delta
    /// issues no call at all. Membership never shrinks — reviewers who fall
    /// off the request list stay in the channel.
    #[instrument(skip(self, pr, channel), fields(pull_request = pr.number, channel = %channel.name))]
    pub async fn sync_members(&self, pr: &PullRequest, channel: &Channel) -> Result<(), BridgeError> {
        let mut desired: Vec<String> = Vec::new();
        for user in std::iter::once(&pr.author).chain(pr.requested_reviewers.iter()) {
            match self.identities.lookup(&user.login) {
                Some(id) => {
                    if !desired.iter().any(|existing| existing == id) {
                        desired.push(id.to_string());
                    }
                }
                None => debug!(
                    login = user.login.as_str(),
                    "No chat identity mapped, skipping invite"
                ),
            }
        }

        if desired.is_empty() {
            return Ok(());
        }

        let current: HashSet<String> = self
            .chat
            .list_members(&channel.id)
            .await
            .map_err(|e| BridgeError::platform("listing channel members", e))?
            .into_iter()
            .collect();

        let mut missing: Vec<String> = desired
            .into_iter()
            .filter(|id| !current.contains(id))
            .collect();
        missing.sort();

        if missing.is_empty() {
            debug!("Membership already converged");
            return Ok(());
        }

        self.chat
            .invite_members(&channel.id, &missing)
            .await
            .map_err(|e| BridgeError::platform("inviting members", e))?;

        info!(invited = missing.len(), "Invited missing members");
        Ok(())
    }

    /// Mirrors the pull request's status into the channel topic.
    ///
    /// The canonical status is compared structurally against the decoded
    /// current topic; the topic is rewritten only on mismatch. A topic in an
    /// older encoding fails to decode and triggers exactly one rewrite.
    #[instrument(skip(self, pr, channel), fields(pull_request = pr.number, channel = %channel.name))]
    pub async fn sync_status(&self, pr: &PullRequest, channel: &Channel) -> Result<(), BridgeError> {
        let canonical = ChannelStatus::from_pull(pr);
        let current = channel.topic.as_deref().and_then(ChannelStatus::decode);

        if current.as_ref() == Some(&canonical) {
            debug!("Topic already reflects the current status");
            return Ok(());
        }

        self.chat
            .set_topic(&channel.id, &canonical.encode())
            .await
            .map_err(|e| BridgeError::platform("updating the topic", e))?;

        info!("Updated channel topic");
        Ok(())
    }

    /// Archives the channel of a closed pull request.
    ///
    /// Archiving an already-archived channel is a no-op. An archive failure
    /// is logged as a warning and swallowed: the next event for this pull
    /// request retries naturally, and nothing else depends on the archive
    /// having happened.
    #[instrument(skip(self, pr, channel), fields(pull_request = pr.number, channel = %channel.name))]
    pub async fn archive(&self, pr: &PullRequest, channel: &Channel) -> Result<(), BridgeError> {
        if channel.is_archived {
            debug!("Channel is already archived");
            return Ok(());
        }

        match self.chat.archive_channel(&channel.id).await {
            Ok(()) => {
                info!("Archived channel");
            }
            Err(e) => {
                warn!(
                    error = e.to_string(),
                    "Failed to archive channel, the next event will retry"
                );
            }
        }

        Ok(())
    }
}

/// The first message posted into a fresh channel: title, description, link.
fn first_message_text(pr: &PullRequest) -> String {
    let mut text = format!("*{}*\n", pr.title);
    if let Some(body) = pr.body.as_deref().filter(|b| !b.is_empty()) {
        text.push('\n');
        text.push_str(body);
        text.push('\n');
    }
    text.push('\n');
    text.push_str(&pr.html_url);
    text
}

/// The comment left on the pull request pointing at its new channel.
fn bootstrap_comment(channel: &Channel) -> String {
    formatdoc!(
        "A channel was created for discussion of this pull request. :tada:

        The channel name is `{name}`. The reviewers have been invited, and the \
        channel will be archived when the pull request closes.

        [Click here to open the channel](https://slack.com/app_redirect?channel={id})",
        name = channel.name,
        id = channel.id,
    )
}
