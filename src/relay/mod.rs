//! The relay: owns the correlation state and wires chat, task API and
//! capture endpoint together.
//!
//! [`handler`] turns chat commands into submitted tasks; [`poller`]
//! matches captured results back to them.

pub mod handler;
pub mod poller;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::capture::CaptureSource;
use crate::channel::{Channel, InboundMessage, ReplyTarget};
use crate::chunk::{chunk, label_parts};
use crate::commands::{CommandRegistry, CommandResult};
use crate::consts::{CONTEXT_TTL, MAX_CHUNK_CHARS, POLL_INTERVAL, STALE_NOTICE_AFTER};
use crate::store::{DedupLedger, ResultStore};
use crate::tasks::TaskApi;

pub use poller::PollReport;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    /// Delay before the "still working" notice.
    pub stale_after: Duration,
    /// Pending tasks older than this are given up on.
    pub context_ttl: Duration,
    pub max_chunk_chars: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            stale_after: STALE_NOTICE_AFTER,
            context_ttl: CONTEXT_TTL,
            max_chunk_chars: MAX_CHUNK_CHARS,
        }
    }
}

/// Correlation state. Every read and write goes through the relay's
/// single mutex.
#[derive(Debug, Default)]
pub struct RelayState {
    pub store: ResultStore,
    pub ledger: DedupLedger,
}

/// Cheap to clone; clones share state and collaborators.
#[derive(Clone)]
pub struct Relay {
    state: Arc<Mutex<RelayState>>,
    channel: Arc<dyn Channel>,
    tasks: Arc<dyn TaskApi>,
    capture: Arc<dyn CaptureSource>,
    commands: Arc<CommandRegistry>,
    config: RelayConfig,
}

impl Relay {
    pub fn new(
        channel: Arc<dyn Channel>,
        tasks: Arc<dyn TaskApi>,
        capture: Arc<dyn CaptureSource>,
        config: RelayConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState::default())),
            channel,
            tasks,
            capture,
            commands: Arc::new(CommandRegistry::new()),
            config,
        }
    }

    /// Lock the correlation state. Do not hold the guard across I/O.
    pub async fn state(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().await
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.store.len()
    }

    /// Route an inbound chat message to its command, if any.
    pub async fn handle_message(&self, message: &InboundMessage) -> CommandResult {
        self.commands.dispatch(self, message).await
    }

    /// Send one reply. Failures are logged, not retried.
    pub async fn reply(&self, target: &ReplyTarget, content: &str) {
        if let Err(e) = self.channel.reply(target, content).await {
            warn!(
                channel = self.channel.name(),
                message_id = %target.message_id,
                error = %e,
                "failed to send reply"
            );
        }
    }

    /// Send a possibly long reply as numbered parts, in order.
    pub async fn reply_chunked(&self, target: &ReplyTarget, content: &str) {
        for part in label_parts(chunk(content, self.config.max_chunk_chars)) {
            self.reply(target, &part).await;
        }
    }
}

/// The text after the command word, trimmed. Empty when there is none.
pub fn argument_text(command: &str) -> &str {
    command
        .trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Fuzzy correlation between a submitted query and the query a result
/// echoes: either one contains the other, ignoring case.
///
/// An empty side contains nothing but is contained by everything, so it
/// matches any other query.
pub fn queries_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}
