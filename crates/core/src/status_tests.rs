use super::*;
use pr_bridge_platforms::models::{MergeStatus, PullRequest};

fn pull_with(merge_status: MergeStatus, title: &str) -> PullRequest {
    PullRequest {
        number: 1,
        title: title.to_string(),
        merge_status,
        ..Default::default()
    }
}

#[test]
fn test_encode_mergeable() {
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Mergeable, "Fix the widget"));
    assert_eq!(status.encode(), "mergeable | Fix the widget");
}

#[test]
fn test_encode_blocked() {
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Blocked, "Fix the widget"));
    assert_eq!(status.encode(), "blocked | Fix the widget");
}

#[test]
fn test_encode_unknown() {
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Unknown, "Fix the widget"));
    assert_eq!(status.encode(), "unknown | Fix the widget");
}

#[test]
fn test_decode_round_trips_encode() {
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Blocked, "Fix the widget"));
    let decoded = ChannelStatus::decode(&status.encode()).unwrap();
    assert_eq!(decoded, status);
}

#[test]
fn test_decode_title_containing_the_separator() {
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Mergeable, "a | b | c"));
    let decoded = ChannelStatus::decode(&status.encode()).unwrap();
    assert_eq!(decoded.title, "a | b | c");
}

#[test]
fn test_decode_rejects_legacy_topics() {
    // Topics written by hand or by an older convention must not crash the
    // comparison; they decode to None and trigger one rewrite.
    assert!(ChannelStatus::decode("").is_none());
    assert!(ChannelStatus::decode("Fix the widget").is_none());
    assert!(ChannelStatus::decode("✅ Fix the widget").is_none());
    assert!(ChannelStatus::decode("approved | Fix the widget").is_none());
}

#[test]
fn test_comparison_is_structural() {
    let a = ChannelStatus::from_pull(&pull_with(MergeStatus::Mergeable, "title"));
    let b = ChannelStatus::decode("mergeable | title").unwrap();
    assert_eq!(a, b);

    let c = ChannelStatus::decode("blocked | title").unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_long_titles_are_truncated_before_encoding() {
    let long_title = "x".repeat(400);
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Unknown, &long_title));

    assert!(status.title.len() <= 200);
    // The canonical status itself is truncated, so decode(encode(..))
    // still compares equal and the mirror converges.
    assert_eq!(ChannelStatus::decode(&status.encode()).unwrap(), status);
}

#[test]
fn test_truncation_respects_character_boundaries() {
    let title = "é".repeat(150);
    let status = ChannelStatus::from_pull(&pull_with(MergeStatus::Unknown, &title));
    // Must not panic and must remain valid UTF-8.
    assert!(status.title.chars().all(|c| c == 'é'));
}
