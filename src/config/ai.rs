// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_daily_limit() -> u32 {
    500
}
fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "openai" is implemented (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Per-call bound on oracle latency.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            daily_limit: default_daily_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Missing file → disabled defaults; a present but broken file is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data)?;

        // Normalize provider
        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV"; a disabled oracle never needs one
        if cfg.enabled && cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        // Sanitize
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }

        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = AiConfig::from_json(r#"{"enabled": true, "provider": " OpenAI "}"#).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.daily_limit, 500);
        assert_eq!(cfg.timeout(), Duration::from_secs(20));
    }

    #[test]
    fn zero_timeout_is_reset() {
        let cfg = AiConfig::from_json(r#"{"enabled": false, "timeout_secs": 0}"#).unwrap();
        assert_eq!(cfg.timeout_secs, 20);
    }

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let cfg = AiConfig::from_json(r#"{"enabled": true, "api_key": "ENV"}"#).unwrap();
        assert_eq!(cfg.api_key, "sk-test");
        std::env::remove_var("OPENAI_API_KEY");
        assert!(AiConfig::from_json(r#"{"enabled": true, "api_key": "env"}"#).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn shipped_config_loads_without_key() {
        std::env::remove_var("OPENAI_API_KEY");
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_AI_CONFIG_PATH);
        let cfg = AiConfig::load_or_default(path).unwrap();
        assert!(!cfg.enabled);

        let cfg = AiConfig::from_json(r#"{"enabled": false, "api_key": "ENV"}"#).unwrap();
        assert_eq!(cfg.api_key, "ENV");
    }

    #[test]
    fn missing_file_means_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AiConfig::load_or_default(tmp.path().join("nope.json")).unwrap();
        assert!(!cfg.enabled);
    }
}
