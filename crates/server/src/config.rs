use std::env;

use tracing::{debug, error};

use crate::errors::ServerError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

const DEFAULT_PORT: u16 = 3000;

/// Process configuration, loaded from environment variables at startup.
///
/// Secrets stay in the environment; nothing here is read from disk.
#[derive(Debug)]
pub struct ServerConfig {
    pub github_app_id: u64,
    pub github_private_key: String,
    pub github_webhook_secret: String,
    pub github_owner: String,
    /// Installation used for operations that arrive without installation
    /// context, i.e. the slash command relay.
    pub github_installation_id: u64,
    pub slack_bot_token: String,
    pub slack_signing_secret: String,
    /// JSON object mapping code host logins to chat user ids.
    pub user_map: String,
    pub port: u16,
}

fn required(key: &str) -> Result<String, ServerError> {
    env::var(key).map_err(|e| {
        error!(
            key = key,
            error = e.to_string(),
            "Failed to get a required value from the environment variables"
        );
        ServerError::ConfigError(format!("{} is not set", key))
    })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        let app_id = required("GITHUB_APP_ID")?;
        let app_id = app_id.parse::<u64>().map_err(|e| {
            error!(
                error = e.to_string(),
                app_id = app_id.as_str(),
                "Failed to parse the app ID"
            );
            ServerError::ConfigError("GITHUB_APP_ID was not a number".to_string())
        })?;

        let installation_id = required("GITHUB_INSTALLATION_ID")?;
        let installation_id = installation_id.parse::<u64>().map_err(|e| {
            error!(
                error = e.to_string(),
                installation_id = installation_id.as_str(),
                "Failed to parse the installation ID"
            );
            ServerError::ConfigError("GITHUB_INSTALLATION_ID was not a number".to_string())
        })?;

        let port: u16 = match env::var("PORT") {
            Ok(val) => val.parse().map_err(|_| {
                error!(input = val.as_str(), "Failed to parse the PORT key");
                ServerError::ConfigError("PORT was not a number".to_string())
            })?,
            Err(_) => DEFAULT_PORT,
        };
        debug!(port = port, "Got the port from the environment variables");

        // An absent identity table is valid; nobody gets invited by name.
        let user_map = env::var("USER_MAP").unwrap_or_else(|_| "{}".to_string());

        Ok(Self {
            github_app_id: app_id,
            github_private_key: required("GITHUB_PRIVATE_KEY")?,
            github_webhook_secret: required("GITHUB_WEBHOOK_SECRET")?,
            github_owner: required("GITHUB_OWNER")?,
            github_installation_id: installation_id,
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            user_map,
            port,
        })
    }
}
