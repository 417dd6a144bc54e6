//! Client configuration, read from `doctask.ron` with environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use extraction_core::{PollPolicy, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use extraction_engine::{BackendSettings, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILENAME: &str = "doctask.ron";
pub const TOKEN_ENV: &str = "DOCTASK_TOKEN";
pub const API_URL_ENV: &str = "DOCTASK_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub token: Option<String>,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Write logs to ./doctask.log instead of the terminal.
    pub log_to_file: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let backend = BackendSettings::default();
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            connect_timeout_secs: backend.connect_timeout.as_secs(),
            request_timeout_secs: backend.request_timeout.as_secs(),
            log_to_file: true,
        }
    }
}

impl ClientConfig {
    /// Reads the config file and applies environment overrides.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config = match explicit {
            Some(path) => Self::read(path)?,
            None => {
                let path = PathBuf::from(CONFIG_FILENAME);
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Self::default()
                }
            }
        };
        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Applies `DOCTASK_TOKEN` and `DOCTASK_API_URL`; blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.token = Some(token);
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_poll_attempts == 0 {
            bail!("max_poll_attempts must be at least 1");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            base_url: self.api_base_url.clone(),
            token: self.token.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_poll_every_five_seconds_sixty_times() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_policy(), PollPolicy::default());
        assert_eq!(config.api_base_url, "http://localhost:8080/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = ClientConfig::parse(
            r#"(api_base_url: "https://tasks.example.test/api", max_poll_attempts: 12)"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://tasks.example.test/api");
        assert_eq!(config.max_poll_attempts, 12);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.token, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(ClientConfig::parse("(max_poll_attempts: \"many\")").is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> =
            HashMap::from([(TOKEN_ENV, "env-token"), (API_URL_ENV, "  ")]);
        let config = ClientConfig {
            token: Some("file-token".into()),
            ..ClientConfig::default()
        }
        .with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.token.as_deref(), Some("env-token"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(ClientConfig::load(Some(missing.as_path())).is_err());

        let present = dir.path().join("doctask.ron");
        fs::write(&present, "(poll_interval_secs: 2, log_to_file: false)").unwrap();
        let config = ClientConfig::read(&present).unwrap();
        assert_eq!(config.poll_interval_secs, 2);
        assert!(!config.log_to_file);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = ClientConfig {
            max_poll_attempts: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
