use anyhow::Result;
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{Channel, InboundMessage, ReplyTarget};

const CONSOLE_CHANNEL_ID: &str = "console";

/// Local stand-in for a chat room: each stdin line is a message, replies
/// are printed to stdout.
#[derive(Default)]
pub struct ConsoleChannel {
    next_id: AtomicU64,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_message(&self, line: &str) -> InboundMessage {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        InboundMessage {
            content: line.to_string(),
            author_is_bot: false,
            reply_to: ReplyTarget::new(CONSOLE_CHANNEL_ID, id.to_string()),
        }
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx.send(self.next_message(line)).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn reply(&self, target: &ReplyTarget, content: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "\n[#{}] {}", target.message_id, content)?;
        out.flush()?;
        Ok(())
    }
}
