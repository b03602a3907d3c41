use pr_bridge_platforms::errors::Error as PlatformError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised by the synchronization logic.
///
/// Every variant carries enough context (operation, pull request, channel
/// name) for the event handler to log and discard it; no steady-state error
/// is fatal to the process.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A platform call failed during a named operation.
    #[error("Platform call failed while {operation}: {source}")]
    Platform {
        /// The operation that was in progress
        operation: String,

        /// The underlying platform failure
        #[source]
        source: PlatformError,
    },

    /// Channel creation raced another task and the winner's channel could
    /// not be found on re-fetch.
    #[error("Channel '{0}' was reported taken but could not be found")]
    CreationRace(String),

    /// A slash command was invoked from a channel outside the managed
    /// naming convention.
    #[error("Channel '{0}' is not a managed pull request channel")]
    NotManagedChannel(String),
}

impl BridgeError {
    /// Wraps a platform failure with the operation that triggered it.
    pub fn platform(operation: impl Into<String>, source: PlatformError) -> Self {
        BridgeError::Platform {
            operation: operation.into(),
            source,
        }
    }
}
