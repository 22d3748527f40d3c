// src/config/pipeline.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

/// Knobs for the batch sweep and the trend job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max posts fetched per batch sweep.
    pub batch_limit: usize,
    /// Concurrent oracle calls during a sweep.
    pub batch_concurrency: usize,
    /// Default trend window in days.
    pub trend_days: i64,
    /// Descriptions/contents sampled into the trend digest.
    pub trend_sample: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_limit: 100,
            batch_concurrency: 4,
            trend_days: 7,
            trend_sample: 10,
        }
    }
}

#[derive(Deserialize)]
struct Root {
    #[serde(default)]
    pipeline: PipelineConfig,
}

impl PipelineConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        let root: Root = toml::from_str(s).context("parsing pipeline config")?;
        Ok(root.pipeline.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// 1) $PIPELINE_CONFIG_PATH  2) config/pipeline.toml  3) defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let p = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Self {
        let d = Self::default();
        if self.batch_limit == 0 {
            self.batch_limit = d.batch_limit;
        }
        if self.batch_concurrency == 0 {
            self.batch_concurrency = 1;
        }
        if self.trend_days <= 0 {
            self.trend_days = d.trend_days;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = PipelineConfig::from_toml("[pipeline]\nbatch_concurrency = 8\n").unwrap();
        assert_eq!(cfg.batch_concurrency, 8);
        assert_eq!(cfg.batch_limit, 100);
        assert_eq!(cfg.trend_sample, 10);
    }

    #[test]
    fn zero_values_are_sanitized() {
        let cfg =
            PipelineConfig::from_toml("[pipeline]\nbatch_concurrency = 0\ntrend_days = -3\n")
                .unwrap();
        assert_eq!(cfg.batch_concurrency, 1);
        assert_eq!(cfg.trend_days, 7);
    }

    #[serial_test::serial]
    #[test]
    fn env_path_takes_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("pipeline.toml");
        fs::write(&p, "[pipeline]\ntrend_days = 3\n").unwrap();
        env::set_var(ENV_PIPELINE_CONFIG_PATH, p.display().to_string());
        let cfg = PipelineConfig::load_default().unwrap();
        env::remove_var(ENV_PIPELINE_CONFIG_PATH);
        assert_eq!(cfg.trend_days, 3);
    }
}
