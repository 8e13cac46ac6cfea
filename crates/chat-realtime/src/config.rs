//! Environment-backed configuration for the chat client.

use std::env;

use chat_core::{DEFAULT_FEED_PATH, DEFAULT_LIVENESS_PATH, FeedPaths};
use thiserror::Error;

const DEFAULT_MAX_CONTENT_CHARS: usize = 4_000;
const FORBIDDEN_PATH_CHARS: [char; 4] = ['#', '$', '[', ']'];

/// Runtime configuration used by [`crate::ChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatClientConfig {
    /// Store paths for the message feed and liveness flag.
    pub paths: FeedPaths,
    /// Longest outgoing message accepted, in characters.
    pub max_content_chars: usize,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            paths: FeedPaths::default(),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

impl ChatClientConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let messages = parse_path("CHAT_FEED_PATH", DEFAULT_FEED_PATH, &mut lookup)?;
        let liveness = parse_path("CHAT_LIVENESS_PATH", DEFAULT_LIVENESS_PATH, &mut lookup)?;

        let max_content_chars = match lookup("CHAT_MAX_CONTENT_CHARS") {
            None => DEFAULT_MAX_CONTENT_CHARS,
            Some(raw) => {
                let value =
                    raw.trim()
                        .parse::<usize>()
                        .map_err(|err| ConfigError::InvalidValue {
                            key: "CHAT_MAX_CONTENT_CHARS",
                            value: raw.clone(),
                            reason: err.to_string(),
                        })?;
                if value == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "CHAT_MAX_CONTENT_CHARS",
                        value: raw,
                        reason: "must be at least 1".to_owned(),
                    });
                }
                value
            }
        };

        Ok(Self {
            paths: FeedPaths { messages, liveness },
            max_content_chars,
        })
    }
}

/// Errors produced while parsing client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn parse_path<F>(key: &'static str, default: &str, lookup: &mut F) -> Result<String, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default.to_owned());
    };

    let value = raw.trim().trim_matches('/');
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "must not be empty".to_owned(),
        });
    }
    if value.contains(FORBIDDEN_PATH_CHARS) {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "must not contain '#', '$', '[' or ']'".to_owned(),
        });
    }
    Ok(value.to_owned())
}
