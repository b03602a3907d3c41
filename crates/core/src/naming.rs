//! # Naming Scheme
//!
//! The canonical mapping between a pull request and its channel name, and the
//! inverse mapping back. Everything else in the bridge depends on this being
//! stable: a channel, once created, keeps its name forever, and the channel
//! directory identifies managed channels purely by this grammar.
//!
//! The canonical form is `pr-{number}-{repository}`, with the repository name
//! sanitized to the chat platform's channel-name constraints (lowercase,
//! `[a-z0-9-_]`, at most 80 characters). A pull request that reopens after its
//! channel was archived gets a fresh channel under a revision suffix:
//! `pr-42-svc`, then `pr-42-svc_r2`, and so on.

use lazy_static::lazy_static;
use regex::Regex;

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;

/// The chat platform's maximum channel name length.
const MAX_CHANNEL_NAME_LEN: usize = 80;

lazy_static! {
    static ref CHANNEL_NAME: Regex =
        Regex::new(r"^pr-(\d+)-([a-z0-9][a-z0-9-_]*?)(?:_r(\d+))?$")
            .expect("channel name grammar must compile");
}

/// A pull request reference recovered from a channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRef {
    /// The sanitized repository name embedded in the channel name
    pub repository: String,

    /// The pull request number
    pub number: u64,

    /// The channel revision; 1 for the original channel, 2 and up for
    /// channels created after an earlier revision was archived
    pub revision: u32,
}

/// Sanitizes a repository name into the channel-name character set.
///
/// Lowercases, replaces every character outside `[a-z0-9-_]` with a dash,
/// collapses dash runs and strips dashes from the edges. The segment must
/// start with `[a-z0-9]` for the inverse grammar to recover it, so leading
/// underscores are stripped as well (GitHub allows names like `_config`).
/// The result is deterministic for any input; an input with no usable
/// characters at all falls back to `"repo"` rather than producing an empty
/// segment.
fn sanitize_repository(name: &str) -> String {
    let raw: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let collapsed = raw
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let trimmed = collapsed.trim_start_matches('_');

    if trimmed.is_empty() {
        "repo".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Computes the canonical channel name for a pull request.
///
/// Deterministic and pure. The repository name is embedded alongside the
/// number because pull request numbers are only unique within a repository.
///
/// # Examples
///
/// ```
/// use pr_bridge_core::naming::channel_name_for;
///
/// assert_eq!(channel_name_for("svc", 42), "pr-42-svc");
/// assert_eq!(channel_name_for("My Service!", 7), "pr-7-my-service");
/// ```
pub fn channel_name_for(repository: &str, pr_number: u64) -> String {
    let name = format!("pr-{}-{}", pr_number, sanitize_repository(repository));
    truncate_name(name)
}

/// Computes the channel name for a given revision of a pull request channel.
///
/// Revision 1 is the canonical name; higher revisions carry an `_r{n}`
/// suffix. Used when a pull request reopens after its previous channel was
/// archived, since archived channels are never resurrected.
pub fn revision_name_for(repository: &str, pr_number: u64, revision: u32) -> String {
    if revision <= 1 {
        return channel_name_for(repository, pr_number);
    }

    let suffix = format!("_r{}", revision);
    let base = format!("pr-{}-{}", pr_number, sanitize_repository(repository));
    let mut name = truncate_name(base);
    name.truncate(MAX_CHANNEL_NAME_LEN - suffix.len());
    name.push_str(&suffix);
    name
}

/// Recovers the pull request reference from a channel name.
///
/// Returns `None` for channels that do not match the managed-channel grammar.
/// This is the inverse of [`channel_name_for`] and [`revision_name_for`]:
/// for any valid inputs, parsing the generated name round-trips.
///
/// # Examples
///
/// ```
/// use pr_bridge_core::naming::parse_channel_name;
///
/// let parsed = parse_channel_name("pr-42-svc").unwrap();
/// assert_eq!(parsed.repository, "svc");
/// assert_eq!(parsed.number, 42);
/// assert_eq!(parsed.revision, 1);
///
/// assert!(parse_channel_name("general").is_none());
/// ```
pub fn parse_channel_name(name: &str) -> Option<PullRef> {
    let captures = CHANNEL_NAME.captures(name)?;

    let number = captures.get(1)?.as_str().parse().ok()?;
    let repository = captures.get(2)?.as_str().to_string();
    let revision = match captures.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 1,
    };

    Some(PullRef {
        repository,
        number,
        revision,
    })
}

fn truncate_name(mut name: String) -> String {
    if name.len() > MAX_CHANNEL_NAME_LEN {
        name.truncate(MAX_CHANNEL_NAME_LEN);
        // Never leave a dangling separator at the cut point.
        while name.ends_with('-') || name.ends_with('_') {
            name.pop();
        }
    }
    name
}
