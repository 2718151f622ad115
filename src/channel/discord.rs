use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Channel, InboundMessage, ReplyTarget};
use crate::consts::DISCORD_API_URL;

const POLL_EVERY: Duration = Duration::from_secs(2);
const PAGE_LIMIT: u32 = 50;
const USER_AGENT: &str = concat!("DiscordBot (crewrelay, ", env!("CARGO_PKG_VERSION"), ")");

/// Reads one Discord text channel over the REST API and replies in thread.
pub struct DiscordChannel {
    client: reqwest::Client,
    api_url: String,
    token: String,
    channel_id: String,
}

impl DiscordChannel {
    pub fn new(token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self::with_api_url(DISCORD_API_URL, token, channel_id)
    }

    pub fn with_api_url(
        api_url: impl Into<String>,
        token: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            channel_id: channel_id.into(),
        }
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_url, channel_id)
    }

    async fn fetch_messages(&self, after: Option<&str>, limit: u32) -> Result<Vec<ApiMessage>> {
        let mut url = format!("{}?limit={}", self.messages_url(&self.channel_id), limit);
        if let Some(after) = after {
            url.push_str(&format!("&after={after}"));
        }

        let resp = self
            .client
            .get(&url)
            .header("authorization", format!("Bot {}", self.token))
            .header("user-agent", USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Discord API error ({}): {}", status, text);
        }

        let mut messages: Vec<ApiMessage> = resp.json().await?;
        sort_oldest_first(&mut messages);
        Ok(messages)
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()> {
        // Start from the newest message so the backlog is not replayed.
        let mut cursor = self
            .fetch_messages(None, 1)
            .await?
            .pop()
            .map(|m| m.id);

        let mut ticker = tokio::time::interval(POLL_EVERY);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                return Ok(());
            }

            let messages = match self.fetch_messages(cursor.as_deref(), PAGE_LIMIT).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(error = %e, "failed to read Discord channel");
                    continue;
                }
            };

            for message in messages {
                cursor = Some(message.id.clone());
                debug!(message_id = %message.id, "discord message received");
                if tx.send(message.into_inbound(&self.channel_id)).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    async fn reply(&self, target: &ReplyTarget, content: &str) -> Result<()> {
        let body = CreateMessage {
            content,
            message_reference: MessageReference {
                message_id: &target.message_id,
                fail_if_not_exists: false,
            },
        };

        let resp = self
            .client
            .post(self.messages_url(&target.channel_id))
            .header("authorization", format!("Bot {}", self.token))
            .header("user-agent", USER_AGENT)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Discord API error ({}): {}", status, text);
        }
        Ok(())
    }
}

/// Snowflakes grow with time; compare numerically, not as strings.
fn sort_oldest_first(messages: &mut [ApiMessage]) {
    messages.sort_by_key(|m| m.id.parse::<u64>().unwrap_or(0));
}

// --- API types ---

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    content: String,
    author: Author,
    #[serde(default)]
    webhook_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    bot: bool,
}

impl ApiMessage {
    fn into_inbound(self, channel_id: &str) -> InboundMessage {
        InboundMessage {
            author_is_bot: self.author.bot || self.webhook_id.is_some(),
            reply_to: ReplyTarget::new(channel_id, self.id),
            content: self.content,
        }
    }
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    message_reference: MessageReference<'a>,
}

#[derive(Serialize)]
struct MessageReference<'a> {
    message_id: &'a str,
    fail_if_not_exists: bool,
}
