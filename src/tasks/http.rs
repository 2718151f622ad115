use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{TaskApi, TaskApiError};

const SUBMIT_PATH: &str = "/kickoff";

/// Submits tasks to the crew runner over HTTP.
pub struct CrewApi {
    client: reqwest::Client,
    base_url: String,
}

impl CrewApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, SUBMIT_PATH)
    }
}

#[async_trait]
impl TaskApi for CrewApi {
    async fn submit(&self, query: &str, webhook_url: &str) -> Result<String, TaskApiError> {
        let body = SubmitRequest {
            query_post: query,
            webhook: webhook_url,
        };

        let resp = self
            .client
            .post(self.submit_url())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TaskApiError::Status { status, body });
        }

        let parsed: SubmitResponse = resp.json().await?;
        let task_id = parsed.task_id().ok_or(TaskApiError::MissingTaskId)?;
        debug!(%task_id, "task accepted");
        Ok(task_id)
    }
}

// --- API types ---

#[derive(Serialize)]
struct SubmitRequest<'a> {
    query_post: &'a str,
    webhook: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(alias = "kickoff_id", alias = "id")]
    task_id: Option<Value>,
}

impl SubmitResponse {
    /// Ids may come back as strings or numbers.
    fn task_id(&self) -> Option<String> {
        match self.task_id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
