pub mod console;
pub mod discord;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Where a reply should go. Opaque to everything except the channel
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplyTarget {
    pub channel_id: String,
    pub message_id: String,
}

impl ReplyTarget {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// A chat message received from a channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub content: String,
    /// Sent by a bot or webhook rather than a person.
    pub author_is_bot: bool,
    pub reply_to: ReplyTarget,
}

/// A chat surface the relay talks through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Push inbound messages into `tx` until the channel closes or `tx`
    /// is dropped.
    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()>;

    /// Post `content` as a reply to the message behind `target`.
    async fn reply(&self, target: &ReplyTarget, content: &str) -> Result<()>;
}
