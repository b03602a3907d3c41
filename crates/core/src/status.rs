//! # Status Mirror encoding
//!
//! The channel topic encodes the pull request's merge status and title. The
//! encoding is one pure pair of functions — [`ChannelStatus::encode`] and
//! [`ChannelStatus::decode`] — so "did the status change" is a structural
//! equality check on the decoded value, never string sniffing. A topic
//! written under an older convention decodes to `None`, which simply triggers
//! one idempotent rewrite on the next sync.

use pr_bridge_platforms::models::{MergeStatus, PullRequest};

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

/// Titles longer than this are cut before encoding so the canonical status
/// itself fits the chat platform's topic length limit. Truncating at encode
/// time instead would make the decoded topic compare unequal to the canonical
/// status forever.
const TOPIC_TITLE_LIMIT: usize = 200;

const SEPARATOR: &str = " | ";

/// The canonical channel status derived from a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    /// The pull request's merge status
    pub merge: MergeStatus,

    /// The pull request title, truncated to the topic budget
    pub title: String,
}

impl ChannelStatus {
    /// Derives the canonical status for a pull request.
    pub fn from_pull(pr: &PullRequest) -> Self {
        let mut title = pr.title.clone();
        if title.len() > TOPIC_TITLE_LIMIT {
            let cut = title
                .char_indices()
                .take_while(|(i, _)| *i < TOPIC_TITLE_LIMIT)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            title.truncate(cut);
        }

        Self {
            merge: pr.merge_status,
            title,
        }
    }

    /// Serializes the status into the topic string.
    ///
    /// # Examples
    ///
    /// ```
    /// use pr_bridge_core::status::ChannelStatus;
    /// use pr_bridge_platforms::models::MergeStatus;
    ///
    /// let status = ChannelStatus {
    ///     merge: MergeStatus::Mergeable,
    ///     title: "Fix the widget".to_string(),
    /// };
    /// assert_eq!(status.encode(), "mergeable | Fix the widget");
    /// ```
    pub fn encode(&self) -> String {
        format!("{}{}{}", tag(self.merge), SEPARATOR, self.title)
    }

    /// Parses a topic string written by [`ChannelStatus::encode`].
    ///
    /// Returns `None` for topics in any other shape, including topics written
    /// by older encodings and topics set by hand.
    pub fn decode(topic: &str) -> Option<Self> {
        let (tag_part, title) = topic.split_once(SEPARATOR)?;

        let merge = match tag_part {
            "mergeable" => MergeStatus::Mergeable,
            "blocked" => MergeStatus::Blocked,
            "unknown" => MergeStatus::Unknown,
            _ => return None,
        };

        Some(Self {
            merge,
            title: title.to_string(),
        })
    }
}

fn tag(merge: MergeStatus) -> &'static str {
    match merge {
        MergeStatus::Mergeable => "mergeable",
        MergeStatus::Blocked => "blocked",
        MergeStatus::Unknown => "unknown",
    }
}
