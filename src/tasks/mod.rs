pub mod http;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskApiError {
    #[error("task API request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("task API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("task API response has no task id")]
    MissingTaskId,
    #[error("{0}")]
    Other(String),
}

/// Where crew tasks are started. Results come back later through the
/// capture endpoint, not through this call.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Start a task for `query`, asking the runner to post its result to
    /// `webhook_url`. Returns the task id.
    async fn submit(&self, query: &str, webhook_url: &str) -> Result<String, TaskApiError>;
}
