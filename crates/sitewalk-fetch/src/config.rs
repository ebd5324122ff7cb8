use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetcherConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Pause between loading a page and reading it
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Sent as the `Accept-Language` header, e.g. `it`
    #[serde(default)]
    pub accept_language: Option<String>,

    /// Requests `www.<domain>` instead of `<domain>`
    #[serde(default)]
    pub prefix_www: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            settle_delay_ms: default_settle_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            accept_language: None,
            prefix_www: false,
        }
    }
}

impl FetcherConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_user_agent() -> String {
    "SitewalkBot".into()
}

fn default_settle_delay_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}
