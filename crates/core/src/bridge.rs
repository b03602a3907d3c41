//! # Comment Bridge
//!
//! Pure logic for mirroring a review comment thread into the pull request's
//! channel: trigger detection, thread collection, windowing, and message
//! rendering. The orchestrator in `lib.rs` wires these to the platform
//! providers.
//!
//! Thread collection is one abstract operation: given the full comment
//! listing and a thread root id, [`comments_in_thread`] returns the chain of
//! comments sharing that root, ordered by creation time ascending and
//! windowed to the most recent N. Resolving the root itself walks the
//! `in_reply_to` parent pointers; the two strategies the operation unifies
//! produce the same ordered set for any well-formed thread.

use std::collections::HashMap;

use pr_bridge_platforms::models::ReviewComment;
use serde_json::{json, Value};

use crate::identity::IdentityMap;

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;

/// Whether a comment body contains the trigger phrase, case-insensitively.
pub fn is_trigger(body: &str, phrase: &str) -> bool {
    body.to_lowercase().contains(&phrase.to_lowercase())
}

/// Resolves the thread root for a comment by walking `in_reply_to` parent
/// pointers through the full comment listing.
///
/// A comment with no parent is its own root. When a parent id points outside
/// the listing, that id is taken as the root: the code host anchors every
/// reply to the thread root, so a dangling parent pointer still names the
/// root correctly.
pub fn thread_root(comments: &[ReviewComment], comment: &ReviewComment) -> u64 {
    let by_id: HashMap<u64, &ReviewComment> =
        comments.iter().map(|c| (c.id, c)).collect();

    let mut current = comment;
    let mut hops = 0usize;
    loop {
        let Some(parent_id) = current.in_reply_to_id else {
            return current.id;
        };

        match by_id.get(&parent_id) {
            Some(parent) => current = parent,
            None => return parent_id,
        }

        // Malformed data could make the chain cyclic; a chain longer than
        // the listing cannot be acyclic.
        hops += 1;
        if hops > comments.len() {
            return current.id;
        }
    }
}

/// Collects the comments sharing a thread root, ordered by creation time
/// ascending and windowed to the most recent `window` entries.
///
/// The window keeps the *newest* comments but preserves ascending order, so
/// the mirrored context reads oldest-first. No comment within the kept
/// window is dropped.
pub fn comments_in_thread(
    comments: &[ReviewComment],
    root_id: u64,
    window: usize,
) -> Vec<ReviewComment> {
    let mut thread: Vec<ReviewComment> = comments
        .iter()
        .filter(|c| c.id == root_id || thread_root(comments, c) == root_id)
        .cloned()
        .collect();

    thread.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    if thread.len() > window {
        thread.drain(..thread.len() - window);
    }

    thread
}

/// The plain-text rendering of the mirrored context, used as the message
/// fallback body.
pub fn render_context_text(comments: &[ReviewComment]) -> String {
    let body = comments
        .iter()
        .map(|c| format!("Written by: {}\n{}", c.author.login, c.body))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("This review thread is moving to the channel!\n\n{}", body)
}

/// The block-structured rendering of the mirrored context: a leading summary
/// block, then one section plus attribution per comment, with dividers
/// between comments.
///
/// Attribution keeps the code-host login; when the identity map knows the
/// author, a chat mention is appended so the author is notified.
pub fn render_context_blocks(
    comments: &[ReviewComment],
    identities: &IdentityMap,
    window: usize,
) -> Value {
    let mut blocks = vec![json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!(
                "This review thread is moving to the channel! Here is the context from the code host (most recent {} comments).",
                window
            ),
        }
    })];

    for (index, comment) in comments.iter().enumerate() {
        if index > 0 {
            blocks.push(json!({ "type": "divider" }));
        }

        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "plain_text",
                "text": comment.body,
                "emoji": true,
            }
        }));

        let attribution = match identities.lookup(&comment.author.login) {
            Some(user_id) => format!("Written by *{}* <@{}>", comment.author.login, user_id),
            None => format!("Written by *{}*", comment.author.login),
        };
        blocks.push(json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": attribution }]
        }));
    }

    Value::Array(blocks)
}

/// The back-link reply posted on the code host, anchored to the thread root.
pub fn back_link_comment(permalink: &str) -> String {
    format!(
        "This thread continues in the pull request's channel: {}",
        permalink
    )
}
