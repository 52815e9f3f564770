use crate::model::ConfigError;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub urls: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_drain_timeout_seconds")]
    pub drain_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_millis")]
    pub fetch_timeout_millis: u64,
    #[serde(default)]
    pub download_photos: bool,
}

fn default_concurrency() -> usize {
    4
}

fn default_drain_timeout_seconds() -> u64 {
    60
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fetch_timeout_millis() -> u64 {
    10_000
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be a positive worker count"));
        }
        if self.drain_timeout_seconds == 0 {
            return Err(invalid("drain_timeout_seconds", "must be positive"));
        }
        if self.fetch_timeout_millis == 0 {
            return Err(invalid("fetch_timeout_millis", "must be positive"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be blank"));
        }
        Ok(())
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_millis)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults_for_optional_keys() {
        let config = parse_config(r#"{ "urls": ["https://www.agrofy.com.br/a"] }"#).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.drain_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_timeout(), Duration::from_millis(10_000));
        assert!(!config.download_photos);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = parse_config(r#"{ "urls": [], "concurrency": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "concurrency", .. }));
    }

    #[test]
    fn rejects_negative_values_at_parse_time() {
        let err = parse_config(r#"{ "urls": [], "concurrency": -2 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_timeouts_and_blank_user_agent() {
        let err = parse_config(r#"{ "urls": [], "drain_timeout_seconds": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "drain_timeout_seconds", .. }));

        let err = parse_config(r#"{ "urls": [], "fetch_timeout_millis": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fetch_timeout_millis", .. }));

        let err = parse_config(r#"{ "urls": [], "user_agent": "  " }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "user_agent", .. }));
    }
}
