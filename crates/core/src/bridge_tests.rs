use super::*;
use chrono::{TimeZone, Utc};
use pr_bridge_platforms::models::User;

fn comment(id: u64, parent: Option<u64>, author: &str, minute: u32) -> ReviewComment {
    ReviewComment {
        id,
        in_reply_to_id: parent,
        author: User {
            id,
            login: author.to_string(),
        },
        body: format!("comment {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
    }
}

#[test]
fn test_trigger_is_case_insensitive() {
    assert!(is_trigger("Please TAKE THIS TO SLACK now", "take this to slack"));
    assert!(is_trigger("take this to slack", "take this to slack"));
    assert!(!is_trigger("let's keep discussing here", "take this to slack"));
}

#[test]
fn test_thread_root_of_root_comment_is_itself() {
    let comments = vec![comment(1, None, "alice", 0)];
    assert_eq!(thread_root(&comments, &comments[0]), 1);
}

#[test]
fn test_thread_root_walks_reply_chain() {
    // C1 <- C2 <- C3, each replying to its immediate parent.
    let comments = vec![
        comment(1, None, "alice", 0),
        comment(2, Some(1), "bob", 1),
        comment(3, Some(2), "carol", 2),
    ];

    assert_eq!(thread_root(&comments, &comments[2]), 1);
}

#[test]
fn test_thread_root_with_dangling_parent_pointer() {
    // The parent id is not in the listing; the pointer itself names the root.
    let comments = vec![comment(5, Some(4), "alice", 0)];
    assert_eq!(thread_root(&comments, &comments[0]), 4);
}

#[test]
fn test_comments_in_thread_orders_chronologically() {
    let comments = vec![
        comment(3, Some(1), "carol", 2),
        comment(1, None, "alice", 0),
        comment(2, Some(1), "bob", 1),
        comment(9, None, "dave", 3),
    ];

    let thread = comments_in_thread(&comments, 1, 15);

    let ids: Vec<u64> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_comments_in_thread_excludes_other_threads() {
    let comments = vec![
        comment(1, None, "alice", 0),
        comment(2, None, "bob", 1),
        comment(3, Some(2), "carol", 2),
    ];

    let thread = comments_in_thread(&comments, 2, 15);

    let ids: Vec<u64> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn test_comments_in_thread_windows_to_most_recent_oldest_first() {
    // 20 comments in one thread; the mirror keeps the most recent 15,
    // still ordered oldest-first.
    let mut comments = vec![comment(1, None, "alice", 0)];
    for i in 2..=20 {
        comments.push(comment(i, Some(1), "bob", i as u32));
    }

    let thread = comments_in_thread(&comments, 1, 15);

    assert_eq!(thread.len(), 15);
    let ids: Vec<u64> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, (6..=20).collect::<Vec<u64>>());
}

#[test]
fn test_render_context_text_preserves_attribution_and_order() {
    let comments = vec![comment(1, None, "alice", 0), comment(2, Some(1), "bob", 1)];

    let text = render_context_text(&comments);

    let alice = text.find("Written by: alice").expect("alice attribution");
    let bob = text.find("Written by: bob").expect("bob attribution");
    assert!(alice < bob);
    assert!(text.contains("comment 1"));
    assert!(text.contains("comment 2"));
}

#[test]
fn test_render_context_blocks_layout() {
    let identities = IdentityMap::from_json(r#"{ "alice": "U123" }"#).unwrap();
    let comments = vec![comment(1, None, "alice", 0), comment(2, Some(1), "bob", 1)];

    let blocks = render_context_blocks(&comments, &identities, 15);
    let blocks = blocks.as_array().expect("blocks must be an array");

    // Summary, then (section, context) per comment with a divider between
    // the two comments: 1 + 2 + 1 + 2.
    assert_eq!(blocks.len(), 6);
    assert_eq!(blocks[0]["type"], "section");
    assert_eq!(blocks[3]["type"], "divider");

    // Mapped authors get a chat mention, unmapped ones keep the login only.
    let alice_attribution = blocks[2]["elements"][0]["text"].as_str().unwrap();
    assert!(alice_attribution.contains("<@U123>"));
    let bob_attribution = blocks[5]["elements"][0]["text"].as_str().unwrap();
    assert!(bob_attribution.contains("bob"));
    assert!(!bob_attribution.contains("<@"));
}

#[test]
fn test_back_link_comment_contains_permalink() {
    let text = back_link_comment("https://workspace.slack.com/archives/C42/p1");
    assert!(text.contains("https://workspace.slack.com/archives/C42/p1"));
}
