use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{Channel, InboundMessage, ReplyTarget};

/// A channel for tests. Emits no inbound messages and records every
/// reply.
#[derive(Default)]
pub struct RecordingChannel {
    replies: Mutex<Vec<(ReplyTarget, String)>>,
    fail_replies: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose replies always fail (they are still recorded).
    pub fn failing() -> Self {
        Self {
            fail_replies: true,
            ..Self::default()
        }
    }

    /// All replies sent so far.
    pub fn replies(&self) -> Vec<(ReplyTarget, String)> {
        self.replies.lock().unwrap().clone()
    }

    /// Reply texts sent to one target.
    pub fn replies_to(&self, message_id: &str) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _)| target.message_id == message_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn listen(&self, _tx: mpsc::Sender<InboundMessage>) -> Result<()> {
        Ok(())
    }

    async fn reply(&self, target: &ReplyTarget, content: &str) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((target.clone(), content.to_string()));
        if self.fail_replies {
            bail!("RecordingChannel: reply rejected");
        }
        Ok(())
    }
}
