//! Configuration management for Sprout
//!
//! Handles model selection, provider mode and pricing, persisted as TOML.
//! The API credential is never stored here; it only comes from the environment.

use crate::cost::Pricing;
use crate::llm::anthropic::ANTHROPIC_API_URL;
use crate::llm::ProviderMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
/// Environment override for the stub flag
pub const USE_STUB_ENV: &str = "SPROUT_USE_STUB";
/// Environment override for the model id
pub const MODEL_ENV: &str = "SPROUT_MODEL";

/// Sprout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier sent to the provider
    pub model: String,
    /// Output token budget per call
    pub max_tokens: u32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Messages endpoint
    pub api_url: String,
    /// Use the deterministic offline stub instead of the live provider
    pub use_stub: bool,
    /// Simulated latency of the stub in milliseconds
    pub stub_delay_ms: u64,
    /// Per-million-token rates
    pub pricing: Pricing,
    /// Version of config schema (for future migrations)
    pub version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            api_url: ANTHROPIC_API_URL.to_string(),
            use_stub: false,
            stub_delay_ms: 15_000,
            pricing: Pricing::default(),
            version: 1,
        }
    }
}

impl Config {
    /// Get the config file path (~/.sprout/config.toml)
    pub fn path() -> Result<PathBuf> {
        Ok(sprout_dir()?.join("config.toml"))
    }

    /// Check if config exists
    pub fn exists() -> bool {
        Self::path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Load config from disk, or return None if it doesn't exist
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::path()?)
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(Some(config))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply `SPROUT_*` environment overrides
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(USE_STUB_ENV) {
            match parse_flag(&value) {
                Some(flag) => self.use_stub = flag,
                None => warn!(var = USE_STUB_ENV, value = %value, "ignoring unrecognised flag value"),
            }
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn provider_mode(&self) -> ProviderMode {
        if self.use_stub {
            ProviderMode::Stub
        } else {
            ProviderMode::Live
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stub_delay(&self) -> Duration {
        Duration::from_millis(self.stub_delay_ms)
    }
}

/// Read the provider credential from the environment
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Get the base sprout directory path (~/.sprout)
pub fn sprout_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".sprout"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "claude-sonnet-4-5-20250929");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.provider_mode(), ProviderMode::Live);
        assert_eq!(config.stub_delay(), Duration::from_secs(15));
        assert_eq!(config.pricing, Pricing::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            use_stub: true,
            ..Config::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("use_stub = true\n[pricing]\ninput_per_million = 1.0\noutput_per_million = 5.0\n").unwrap();
        assert!(parsed.use_stub);
        assert_eq!(parsed.pricing.input_per_million, 1.0);
        assert_eq!(parsed.max_tokens, 4096);
        assert_eq!(parsed.version, 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(Config::load_from(&path).unwrap().is_none());

        let config = Config {
            model: "claude-test".to_string(),
            stub_delay_ms: 0,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_tokens = \"lots\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .apply_overrides_from(lookup(&[(USE_STUB_ENV, "YES"), (MODEL_ENV, " claude-x ")]));
        assert!(config.use_stub);
        assert_eq!(config.provider_mode(), ProviderMode::Stub);
        assert_eq!(config.model, "claude-x");

        let config = Config {
            use_stub: true,
            ..Config::default()
        }
        .apply_overrides_from(lookup(&[(USE_STUB_ENV, "0")]));
        assert!(!config.use_stub);
    }

    #[test]
    fn test_unrecognised_flag_is_ignored() {
        let config = Config::default().apply_overrides_from(lookup(&[(USE_STUB_ENV, "maybe")]));
        assert!(!config.use_stub);
    }
}
