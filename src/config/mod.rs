//! Settings read from the environment at startup.
//!
//! Missing required settings are fatal: [`Settings::from_env`] fails
//! before any client or channel is built.

use thiserror::Error;

use crate::consts::DEFAULT_CAPTURE_BASE_URL;

pub const DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub const WEBHOOK_TOKEN: &str = "WEBHOOK_TOKEN";
pub const TASK_API_URL: &str = "TASK_API_URL";
pub const DISCORD_CHANNEL_ID: &str = "DISCORD_CHANNEL_ID";
pub const CAPTURE_BASE_URL: &str = "CAPTURE_BASE_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

/// External settings the relay needs.
#[derive(Clone)]
pub struct Settings {
    /// Chat bot token.
    pub discord_token: String,
    /// Identifies the capture endpoint (a webhook.site token).
    pub webhook_token: String,
    /// Base URL of the crew task API.
    pub task_api_url: String,
    /// Channel to watch. Only needed for the Discord channel.
    pub discord_channel_id: Option<String>,
    pub capture_base_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            discord_token: require(DISCORD_TOKEN)?,
            webhook_token: require(WEBHOOK_TOKEN)?,
            task_api_url: require(TASK_API_URL)?,
            discord_channel_id: get(DISCORD_CHANNEL_ID),
            capture_base_url: get(CAPTURE_BASE_URL)
                .unwrap_or_else(|| DEFAULT_CAPTURE_BASE_URL.to_string()),
        })
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("discord_token", &"<redacted>")
            .field("webhook_token", &"<redacted>")
            .field("task_api_url", &self.task_api_url)
            .field("discord_channel_id", &self.discord_channel_id)
            .field("capture_base_url", &self.capture_base_url)
            .finish()
    }
}
