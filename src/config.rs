//! Runtime configuration.
//!
//! Values come from the environment (optionally seeded by a `.env` file the
//! binary loads first). Every field has a default, so an empty environment
//! yields a usable configuration apart from the API key.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub base_url: String,
    /// Seed for the credential cache. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Attach a screenshot after every successful document mutation.
    pub screenshot_after_mutation: bool,
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            screenshot_after_mutation: true,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(model) = get("CADCHAT_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = get("CADCHAT_BASE_URL") {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    key: "CADCHAT_BASE_URL",
                    value: base_url,
                });
            }
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.api_key = get("CADCHAT_API_KEY").or_else(|| get("OPENAI_API_KEY"));

        if let Some(raw) = get("CADCHAT_SCREENSHOTS") {
            config.screenshot_after_mutation = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CADCHAT_SCREENSHOTS",
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = get("CADCHAT_TIMEOUT_SECS") {
            config.request_timeout_secs = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CADCHAT_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            };
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
