use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;

/// Maximum age of a Slack request before it is rejected as a replay.
const SLACK_REPLAY_WINDOW_SECS: i64 = 60 * 5;

fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies the `X-Hub-Signature-256` header on a GitHub webhook delivery.
#[instrument(skip(secret, body))]
pub fn verify_github_signature(secret: &str, headers: &HeaderMap, body: &str) -> bool {
    let signature = match headers.get("X-Hub-Signature-256") {
        Some(value) => value.to_str().unwrap_or(""),
        None => return false,
    };

    let computed_signature = format!("sha256={}", hmac_sha256_hex(secret, body));
    debug!(
        github_signature = signature,
        computed_signature, "Comparing the GitHub signature with the computed signature"
    );

    signature == computed_signature
}

/// Verifies the `X-Slack-Signature` header on a slash command request.
///
/// The signed message is `v0:{timestamp}:{body}`; requests older than the
/// replay window are rejected even when the signature matches.
#[instrument(skip(secret, body))]
pub fn verify_slack_signature(secret: &str, headers: &HeaderMap, body: &str) -> bool {
    verify_slack_signature_at(secret, headers, body, chrono::Utc::now().timestamp())
}

fn verify_slack_signature_at(secret: &str, headers: &HeaderMap, body: &str, now: i64) -> bool {
    let signature = match headers.get("X-Slack-Signature") {
        Some(value) => value.to_str().unwrap_or(""),
        None => return false,
    };
    let timestamp = match headers.get("X-Slack-Request-Timestamp") {
        Some(value) => value.to_str().unwrap_or(""),
        None => return false,
    };

    let Ok(timestamp_secs) = timestamp.parse::<i64>() else {
        warn!(timestamp, "Slack request timestamp was not a number");
        return false;
    };
    if (now - timestamp_secs).abs() > SLACK_REPLAY_WINDOW_SECS {
        warn!(
            timestamp = timestamp_secs,
            "Slack request timestamp outside the replay window"
        );
        return false;
    }

    let message = format!("v0:{}:{}", timestamp, body);
    let computed_signature = format!("v0={}", hmac_sha256_hex(secret, &message));
    debug!(
        slack_signature = signature,
        computed_signature, "Comparing the Slack signature with the computed signature"
    );

    signature == computed_signature
}
