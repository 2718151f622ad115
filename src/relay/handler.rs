use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Relay;
use crate::channel::ReplyTarget;
use crate::classify::classify;
use crate::consts::format_duration;
use crate::store::PendingTask;
use crate::tasks::TaskApiError;

/// Sent when the task API rejects or cannot be reached.
pub const SUBMIT_FAILED: &str = "❌ Sorry, I couldn't start that task. Please try again later.";

impl Relay {
    /// Submit `query` for the requester behind `reply_to` and register it
    /// for correlation. Failures are reported to the requester and nothing
    /// is registered.
    pub async fn submit(&self, reply_to: &ReplyTarget, query: &str) -> Result<String, TaskApiError> {
        self.reply(reply_to, "🚀 Sending your request to the crew...")
            .await;

        let webhook_url = self.capture.webhook_url();
        let task_id = match self.tasks.submit(query, &webhook_url).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "task submission failed");
                self.reply(reply_to, SUBMIT_FAILED).await;
                return Err(e);
            }
        };

        let category = classify(query);
        let task = PendingTask::new(task_id.clone(), query, category, reply_to.clone());
        let cancel = task.cancel.clone();
        self.state.lock().await.store.insert(task);
        info!(%task_id, %category, "task submitted");

        self.reply(
            reply_to,
            &format!(
                "✅ Task submitted (id `{task_id}`, {category}). I'll post the result here when it's ready."
            ),
        )
        .await;

        self.arm_stale_notice(task_id.clone(), reply_to.clone(), cancel);
        Ok(task_id)
    }

    /// After `stale_after`, tell the requester the task is still running,
    /// unless the task was resolved or expired first.
    fn arm_stale_notice(&self, task_id: String, reply_to: ReplyTarget, cancel: CancellationToken) {
        let relay = self.clone();
        let delay = self.config.stale_after;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let pending = relay.state.lock().await.store.contains(&task_id);
                    if pending {
                        relay
                            .reply(
                                &reply_to,
                                &format!(
                                    "⏳ Still working on task `{task_id}` after {}. Results will be posted here.",
                                    format_duration(delay)
                                ),
                            )
                            .await;
                    }
                }
            }
        });
    }
}
