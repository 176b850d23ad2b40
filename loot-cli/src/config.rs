use anyhow::{Context, Result};
use loot_core::MeanPolicy;
use loot_ingest::{RetryPolicy, ServiceConfig, DEFAULT_API_VERSION, DEFAULT_WORKERS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::{ensure_loot_home, loot_home};

pub const ENV_ENDPOINT: &str = "LOOT_ENDPOINT";
pub const ENV_KEY: &str = "LOOT_KEY";
pub const ENV_MODEL_ID: &str = "LOOT_MODEL_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub service: ServiceSection,
    pub retry: RetrySection,
    pub batch: BatchSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSection {
    /// e.g. https://<resource>.cognitiveservices.azure.com
    pub endpoint: String,
    pub model_id: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchSection {
    pub workers: usize,
    pub template: String,
    /// Unset means each template's own policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_policy: Option<MeanPolicy>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model_id: "prebuilt-bankStatement.us".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: 120,
            poll_interval_ms: 2000,
            max_polls: 60,
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            base_delay_ms: p.base_delay.as_millis() as u64,
            max_delay_ms: p.max_delay.as_millis() as u64,
        }
    }
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            template: "generic".to_string(),
            mean_policy: None,
        }
    }
}

impl Config {
    /// Endpoint and model id from the environment win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            self.service.endpoint = endpoint;
        }
        if let Some(model_id) = non_empty(ENV_MODEL_ID) {
            self.service.model_id = model_id;
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn service_config(&self, key: String) -> Result<ServiceConfig> {
        let endpoint = self.service.endpoint.trim();
        if endpoint.is_empty() {
            anyhow::bail!(
                "no service endpoint configured (set {} or [service].endpoint in {})",
                ENV_ENDPOINT,
                loot_home()
                    .map(|p| p.join("config.toml").display().to_string())
                    .unwrap_or_else(|_| "~/.loot/config.toml".to_string())
            );
        }
        let mut cfg = ServiceConfig::new(endpoint, key);
        cfg.api_version = self.service.api_version.clone();
        cfg.timeout = Duration::from_secs(self.service.timeout_secs);
        cfg.poll_interval = Duration::from_millis(self.service.poll_interval_ms);
        cfg.max_polls = self.service.max_polls;
        Ok(cfg)
    }
}

/// Subscription key; only ever read from the environment (or `.env`).
pub fn service_key() -> Result<String> {
    std::env::var(ENV_KEY)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .with_context(|| format!("{} is not set", ENV_KEY))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_loot_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    let mut cfg = if p.exists() {
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        parse_config(&s)?
    } else {
        Config::default()
    };
    cfg.apply_env(|k| std::env::var(k).ok());
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    println!("Set {} (and optionally {}) in your environment or a .env file.", ENV_KEY, ENV_ENDPOINT);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse_config(
            r#"
            [service]
            endpoint = "https://loot.cognitiveservices.azure.com"

            [batch]
            workers = 8
            mean_policy = "weighted"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.service.endpoint, "https://loot.cognitiveservices.azure.com");
        assert_eq!(cfg.service.max_polls, 60);
        assert_eq!(cfg.batch.workers, 8);
        assert_eq!(cfg.batch.template, "generic");
        assert_eq!(cfg.batch.mean_policy, Some(MeanPolicy::Weighted));
        assert_eq!(cfg.retry, RetrySection::default());
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(parse_config(&s).unwrap(), Config::default());
    }

    #[test]
    fn test_default_batch_is_sequential_and_defers_mean_policy() {
        let cfg = Config::default();
        assert_eq!(cfg.batch.workers, 1);
        assert_eq!(cfg.batch.mean_policy, None);
        let s = toml::to_string_pretty(&cfg).unwrap();
        assert!(!s.contains("mean_policy"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut cfg = Config::default();
        cfg.service.endpoint = "https://from-file".to_string();
        cfg.apply_env(|k| match k {
            ENV_ENDPOINT => Some("https://from-env".to_string()),
            ENV_MODEL_ID => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.service.endpoint, "https://from-env");
        assert_eq!(cfg.service.model_id, "prebuilt-bankStatement.us");
    }

    #[test]
    fn test_service_config_requires_endpoint() {
        let mut cfg = Config::default();
        assert!(cfg.service_config("k".into()).is_err());

        cfg.service.endpoint = "https://x".to_string();
        cfg.service.poll_interval_ms = 250;
        let sc = cfg.service_config("k".into()).unwrap();
        assert_eq!(sc.poll_interval, Duration::from_millis(250));
        assert_eq!(sc.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_retry_policy_from_section() {
        let mut cfg = Config::default();
        cfg.retry.max_attempts = 5;
        cfg.retry.base_delay_ms = 10;
        let p = cfg.retry_policy();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.base_delay, Duration::from_millis(10));
    }
}
