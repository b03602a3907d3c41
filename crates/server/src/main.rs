use std::sync::Arc;

use axum::{routing::post, Router};
use pr_bridge_core::{config::BridgeConfig, identity::IdentityMap};
use pr_bridge_platforms::github::create_app_client;
use pr_bridge_platforms::slack::SlackChat;
use pr_bridge_platforms::ChatProvider;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
use config::ServerConfig;

mod errors;
use errors::ServerError;

mod signature;

mod webhook;
use webhook::{handle_github_webhook, handle_slack_command, AppState};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting application");

    debug!("Loading configuration from the environment ...");
    let server_config = ServerConfig::from_env()?;

    let octocrab = create_app_client(
        server_config.github_app_id,
        &server_config.github_private_key,
    )
    .await
    .map_err(|e| {
        ServerError::AuthError(format!(
            "Failed to create the code host app client. Error was: {}",
            e
        ))
    })?;

    let identities = IdentityMap::from_json(&server_config.user_map).map_err(|e| {
        ServerError::ConfigError(format!("USER_MAP was not a valid identity table: {}", e))
    })?;
    info!(mapped_identities = identities.len(), "Loaded identity table");

    let slack = SlackChat::new(server_config.slack_bot_token);
    let bot_id = slack.bot_identity().await.map_err(|e| {
        ServerError::AuthError(format!(
            "Failed to verify the chat bot token. Error was: {}",
            e
        ))
    })?;
    info!(bot = bot_id.as_str(), "Verified chat credentials");

    let state = Arc::new(AppState {
        octocrab,
        github_installation_id: server_config.github_installation_id,
        slack,
        identities,
        config: BridgeConfig::new(server_config.github_owner),
        github_webhook_secret: server_config.github_webhook_secret,
        slack_signing_secret: server_config.slack_signing_secret,
    });

    let addr = format!("0.0.0.0:{}", server_config.port);
    let app = Router::new()
        .route("/webhooks/github", post(handle_github_webhook))
        .route("/commands/slack", post(handle_slack_command))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr.clone())
        .await
        .map_err(|e| ServerError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::NetworkError(e.to_string()))?;

    Ok(())
}
