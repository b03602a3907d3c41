//! Chat platform adapter backed by the Slack Web API.
//!
//! All calls go through [`SlackChat::call`], which posts a JSON body with
//! bearer-token auth and unwraps Slack's `ok`/`error` response envelope.
//! Cursor pagination (`response_metadata.next_cursor`) is followed to
//! exhaustion for the listing endpoints.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::{
    errors::Error,
    models::{Channel, ChatMessage, MessagePayload},
    ChatProvider,
};

#[cfg(test)]
#[path = "slack_tests.rs"]
mod tests;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    rest: Value,
}

#[derive(Debug, Deserialize)]
struct ChannelWire {
    id: String,
    name: String,
    #[serde(default)]
    is_archived: bool,
    topic: Option<TopicWire>,
}

#[derive(Debug, Deserialize)]
struct TopicWire {
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelListPage {
    #[serde(default)]
    channels: Vec<ChannelWire>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct MemberListPage {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    channel: ChannelWire,
}

#[derive(Debug, Deserialize)]
struct MessageWire {
    ts: String,
    #[serde(default)]
    text: String,
    thread_ts: Option<String>,
    bot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    message: MessageWire,
}

#[derive(Debug, Deserialize)]
struct PermalinkResponse {
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    bot_id: Option<String>,
    user_id: Option<String>,
}

impl From<ChannelWire> for Channel {
    fn from(wire: ChannelWire) -> Self {
        Channel {
            id: wire.id,
            name: wire.name,
            is_archived: wire.is_archived,
            topic: wire.topic.and_then(|t| t.value).filter(|v| !v.is_empty()),
        }
    }
}

fn cursor_of(metadata: Option<ResponseMetadata>) -> Option<String> {
    metadata
        .and_then(|m| m.next_cursor)
        .filter(|c| !c.is_empty())
}

/// Chat platform adapter for the Slack Web API.
///
/// Constructed with a bot token; the API base URL is overridable so the
/// adapter can be exercised against a local mock server in tests.
#[derive(Debug, Clone)]
pub struct SlackChat {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackChat {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    pub fn with_api_base(bot_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        }
    }

    /// Posts `body` to the named API method and unwraps the response
    /// envelope, returning the payload fields for deserialization.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, Error> {
        let url = format!("{}/{}", self.api_base, method);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        Self::unwrap_envelope(method, response).await
    }

    /// Issues a GET request with query parameters for the read-only API
    /// methods that do not accept a JSON body.
    async fn call_get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = format!("{}/{}", self.api_base, method);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await?;

        Self::unwrap_envelope(method, response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, Error> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimitExceeded);
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            warn!(method = method, error = e.to_string(), "Malformed chat API response");
            Error::InvalidResponse
        })?;

        if !envelope.ok {
            let reason = envelope.error.unwrap_or_else(|| "unknown".to_string());
            return Err(Error::ChatApi {
                method: method.to_string(),
                reason,
            });
        }

        serde_json::from_value(envelope.rest).map_err(|e| {
            warn!(method = method, error = e.to_string(), "Malformed chat API response");
            Error::InvalidResponse
        })
    }
}

#[async_trait]
impl ChatProvider for SlackChat {
    #[instrument(skip(self))]
    async fn list_channels(&self) -> Result<Vec<Channel>, Error> {
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("limit", "200"), ("exclude_archived", "false")];
            if let Some(c) = &cursor {
                query.push(("cursor", c.as_str()));
            }

            let page: ChannelListPage = self.call_get("conversations.list", &query).await?;
            channels.extend(page.channels.into_iter().map(Channel::from));

            cursor = cursor_of(page.response_metadata);
            if cursor.is_none() {
                break;
            }
        }

        debug!(count = channels.len(), "Listed channels");
        Ok(channels)
    }

    #[instrument(skip(self))]
    async fn create_channel(&self, name: &str) -> Result<Channel, Error> {
        let body = json!({ "name": name, "is_private": false });
        match self.call::<ChannelResponse>("conversations.create", body).await {
            Ok(response) => Ok(response.channel.into()),
            Err(Error::ChatApi { reason, .. }) if reason == "name_taken" => {
                Err(Error::ChannelNameTaken(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn archive_channel(&self, channel_id: &str) -> Result<(), Error> {
        let body = json!({ "channel": channel_id });
        match self.call::<Value>("conversations.archive", body).await {
            Ok(_) => Ok(()),
            // Another task archived the channel first; the desired state holds.
            Err(Error::ChatApi { reason, .. }) if reason == "already_archived" => Ok(()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, topic))]
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), Error> {
        let body = json!({ "channel": channel_id, "topic": topic });
        self.call::<Value>("conversations.setTopic", body).await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn post_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<ChatMessage, Error> {
        let mut body = json!({
            "channel": channel_id,
            "text": payload.text,
            "unfurl_links": payload.unfurl_links,
            "unfurl_media": payload.unfurl_links,
        });
        if let Some(blocks) = &payload.blocks {
            body["blocks"] = blocks.clone();
        }
        if let Some(thread_ts) = &payload.thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        let response: PostMessageResponse = self.call("chat.postMessage", body).await?;
        Ok(ChatMessage {
            ts: response.message.ts,
            text: response.message.text,
            thread_ts: response.message.thread_ts,
            bot_id: response.message.bot_id,
        })
    }

    #[instrument(skip(self))]
    async fn invite_members(&self, channel_id: &str, user_ids: &[String]) -> Result<(), Error> {
        let body = json!({
            "channel": channel_id,
            "users": user_ids.join(","),
        });
        self.call::<Value>("conversations.invite", body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_members(&self, channel_id: &str) -> Result<Vec<String>, Error> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("channel", channel_id), ("limit", "200")];
            if let Some(c) = &cursor {
                query.push(("cursor", c.as_str()));
            }

            let page: MemberListPage = self.call_get("conversations.members", &query).await?;
            members.extend(page.members);

            cursor = cursor_of(page.response_metadata);
            if cursor.is_none() {
                break;
            }
        }

        Ok(members)
    }

    #[instrument(skip(self))]
    async fn get_permalink(&self, channel_id: &str, message_ts: &str) -> Result<String, Error> {
        let query = [("channel", channel_id), ("message_ts", message_ts)];
        let response: PermalinkResponse = self.call_get("chat.getPermalink", &query).await?;
        Ok(response.permalink)
    }

    #[instrument(skip(self))]
    async fn bot_identity(&self) -> Result<String, Error> {
        let response: AuthTestResponse = self.call("auth.test", json!({})).await?;
        response
            .bot_id
            .or(response.user_id)
            .ok_or(Error::InvalidResponse)
    }
}
