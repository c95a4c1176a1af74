use anyhow::{Context, Result};
use facefind_core::{DetectionMethod, MatchSettings, QualityThresholds};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// CLI configuration: optional TOML file, then `FACEFIND_*` overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matching: MatchSettings,
    pub quality: QualityThresholds,
}

impl Config {
    /// Load from `path` (defaults when absent), apply environment overrides,
    /// and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply `FACEFIND_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let m = &mut self.matching;
        m.match_threshold = env_or(&lookup, "FACEFIND_MATCH_THRESHOLD", m.match_threshold);
        m.batch_size = env_or(&lookup, "FACEFIND_BATCH_SIZE", m.batch_size);
        m.detect_timeout_secs = env_or(&lookup, "FACEFIND_DETECT_TIMEOUT_SECS", m.detect_timeout_secs);
        m.detection_method = env_or::<DetectionMethod>(&lookup, "FACEFIND_DETECTION_METHOD", m.detection_method);
        if let Some(v) = lookup("FACEFIND_ANGLE_MATCHING") {
            m.enable_angle_matching = !matches!(v.trim(), "0" | "false" | "off");
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate().context("invalid matching configuration")
    }
}

fn env_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            default
        }),
        None => default,
    }
}
