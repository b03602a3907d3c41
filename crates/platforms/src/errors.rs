#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types for platform operations.
///
/// This enum covers failures from both external platforms — the code host and
/// the chat platform. The variants follow the bridge's error taxonomy:
/// transient failures abort the current event and rely on the next event to
/// retry, authentication and response-shape failures indicate configuration
/// or API drift, and [`Error::ChannelNameTaken`] is the one recoverable
/// signal, raised when channel creation races another task so the caller can
/// re-fetch and prefer the existing channel.
///
/// A missing channel or comment is *not* an error: lookups that can
/// legitimately come up empty return `Option` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic API request failure.
    ///
    /// An API call to one of the platforms failed for an unspecified reason.
    /// Used as a fallback when more specific error information is not
    /// available.
    #[error("API request failed")]
    ApiError(),

    /// Authentication failed with the platform.
    ///
    /// The provided credentials (token, app credentials, signing secret) are
    /// invalid, expired, or insufficient for the requested operation. The
    /// string parameter carries the details.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Channel creation failed because the name is already in use.
    ///
    /// Raised when the chat platform rejects `create_channel` with a
    /// name-collision error. This happens when two tasks for the same pull
    /// request race on creation; the caller resolves it by re-fetching the
    /// channel list and treating the existing channel as success. The
    /// parameter is the contested channel name.
    #[error("Channel name already taken: {0}")]
    ChannelNameTaken(String),

    /// The chat platform API reported a failure.
    ///
    /// The chat platform answered with a well-formed error envelope. The
    /// `method` names the API method that failed and `reason` carries the
    /// platform's error code.
    #[error("Chat API call {method} failed: {reason}")]
    ChatApi {
        /// The API method that failed
        method: String,

        /// The error code reported by the platform
        reason: String,
    },

    /// Invalid response format from a platform API.
    ///
    /// The response was not in the expected shape: malformed JSON, missing
    /// required fields, or an unexpected structure after an API version
    /// change.
    #[error("Invalid response format")]
    InvalidResponse,

    /// Platform rate limit exceeded.
    ///
    /// The bridge does not retry within an event; the next event for the same
    /// pull request re-runs the full convergence logic once the rate limit
    /// window has passed.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// A network-level failure talking to a platform.
    ///
    /// Connection resets, timeouts and similar transport failures. Treated as
    /// transient: the operation is abandoned for this event and the next
    /// event retries naturally.
    #[error("Transient network failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transient(e.to_string())
    }
}
