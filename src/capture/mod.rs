//! The webhook capture endpoint the crew posts results to.

pub mod mock;
pub mod webhook_site;

use anyhow::Result;
use async_trait::async_trait;

/// One captured webhook request.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub id: String,
    /// Raw request body, expected to be JSON.
    pub content: Option<String>,
}

impl Delivery {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
        }
    }

    /// True when there is no body worth parsing.
    pub fn is_blank(&self) -> bool {
        self.content.as_deref().is_none_or(|c| c.trim().is_empty())
    }
}

#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// URL handed to the task runner as its result webhook.
    fn webhook_url(&self) -> String;

    /// Everything currently captured, newest first.
    async fn fetch(&self) -> Result<Vec<Delivery>>;
}
