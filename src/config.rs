use directories::BaseDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::query::RetryPolicy;

pub const API_URL_ENV: &str = "CONTACTBOOK_API_URL";

/// Accepted chat message length, in characters after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPolicy {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            min_len: 2,
            max_len: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub retry: u32,
    pub session_bucket: String,
    pub toast_timeout_secs: u32,
    pub chat: ChatPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            retry: 1,
            session_bucket: crate::chat::store::DEFAULT_BUCKET.into(),
            toast_timeout_secs: 5,
            chat: ChatPolicy::default(),
        }
    }
}

impl Config {
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("contactbook.toml"))
    }

    /// File values, then the environment override. Anything unreadable falls
    /// back to defaults.
    pub fn load() -> Self {
        let mut config = Self::toml_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|text| Self::from_toml(&text))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn from_toml(text: &str) -> Self {
        toml::from_str(text).unwrap_or_else(|e| {
            warn!("ignoring malformed config: {}", e);
            Self::default()
        })
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        self.api_url = crate::utils::normalize_url(&self.api_url);
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
            api_url = "http://api.local:9000"

            [chat]
            max_len = 100
            "#,
        );
        assert_eq!(cfg.api_url, "http://api.local:9000");
        assert_eq!(cfg.chat, ChatPolicy { min_len: 2, max_len: 100 });
        assert_eq!(cfg.retry, 1);
        assert_eq!(cfg.session_bucket, "chat-storage");
    }

    #[test]
    fn malformed_file_falls_back() {
        assert_eq!(Config::from_toml("api_url = ["), Config::default());
    }

    #[test]
    fn env_override_wins_and_is_normalized() {
        let mut cfg = Config::from_toml(r#"api_url = "http://file.local""#);
        cfg.apply_env(|k| (k == API_URL_ENV).then(|| "api.example.com/".to_string()));
        assert_eq!(cfg.api_url, "https://api.example.com/");

        let mut cfg = Config::from_toml(r#"api_url = "http://file.local""#);
        cfg.apply_env(|_| Some("   ".into()));
        assert_eq!(cfg.api_url, "http://file.local");
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(Config::from_toml(&text), cfg);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
    }
}
