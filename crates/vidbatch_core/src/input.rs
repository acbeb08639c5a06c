use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_QUALITY: &str = "best";
pub const DEFAULT_PROXY_GROUP: &str = "RESIDENTIAL";
/// Proxy type value that turns proxying off.
pub const PROXY_DISABLED: &str = "NONE";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("input 'videoUrls' is required and must be a non-empty list")]
    EmptyUrlList,
    #[error("input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run input as supplied by the operator, using the platform's key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(default)]
    pub video_urls: Vec<String>,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_proxy_type")]
    pub proxy_type: String,
}

fn default_quality() -> String {
    DEFAULT_QUALITY.to_string()
}

fn default_proxy_type() -> String {
    DEFAULT_PROXY_GROUP.to_string()
}

impl Default for RunInput {
    fn default() -> Self {
        Self {
            video_urls: Vec::new(),
            quality: default_quality(),
            proxy_type: default_proxy_type(),
        }
    }
}

impl RunInput {
    pub fn from_json(raw: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Trims URLs, drops blank ones and rejects an empty list.
    pub fn validated(mut self) -> Result<Self, ConfigurationError> {
        self.video_urls = self
            .video_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if self.video_urls.is_empty() {
            return Err(ConfigurationError::EmptyUrlList);
        }
        if self.quality.trim().is_empty() {
            self.quality = default_quality();
        }
        Ok(self)
    }

    /// Proxy group to draw endpoints from, or `None` when proxying is off.
    pub fn proxy_group(&self) -> Option<&str> {
        let group = self.proxy_type.trim();
        if group.is_empty() || group.eq_ignore_ascii_case(PROXY_DISABLED) {
            None
        } else {
            Some(group)
        }
    }
}
