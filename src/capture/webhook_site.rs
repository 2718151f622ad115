use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::{CaptureSource, Delivery};

/// A webhook.site token: results are posted to `{base}/{token}` and read
/// back from its request log.
pub struct WebhookSite {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl WebhookSite {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn requests_url(&self) -> String {
        format!(
            "{}/token/{}/requests?sorting=newest",
            self.base_url, self.token
        )
    }
}

#[async_trait]
impl CaptureSource for WebhookSite {
    fn webhook_url(&self) -> String {
        format!("{}/{}", self.base_url, self.token)
    }

    async fn fetch(&self) -> Result<Vec<Delivery>> {
        let resp = self
            .client
            .get(self.requests_url())
            .header("accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("capture endpoint error ({}): {}", status, text);
        }

        let page: RequestsPage = resp.json().await?;
        Ok(page.into_deliveries())
    }
}

// --- API types ---

#[derive(Deserialize)]
struct RequestsPage {
    #[serde(default)]
    data: Vec<CapturedRequest>,
}

#[derive(Deserialize)]
struct CapturedRequest {
    uuid: String,
    #[serde(default)]
    content: Option<String>,
}

impl RequestsPage {
    fn into_deliveries(self) -> Vec<Delivery> {
        self.data
            .into_iter()
            .map(|r| Delivery {
                id: r.uuid,
                content: r.content,
            })
            .collect()
    }
}
