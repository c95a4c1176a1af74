//! Tunable parameters for validation and matching.
//!
//! A matching run copies its [`MatchSettings`] at start; changes made by the
//! caller afterwards do not reach in-flight work.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("match threshold must be within 0..=100, got {0}")]
    ThresholdOutOfRange(f32),
    #[error("batch size must be greater than 0")]
    ZeroBatchSize,
    #[error("detect timeout must be greater than 0")]
    ZeroTimeout,
    #[error("unknown detection method: {0} (expected tiny, accurate or both)")]
    UnknownDetectionMethod(String),
}

/// Which detector variant(s) a run may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Fast detector only.
    Tiny,
    /// Accurate detector only.
    #[serde(alias = "ssd")]
    Accurate,
    /// Accurate detector, falling back to the fast one when it finds nothing.
    #[default]
    Both,
}

impl FromStr for DetectionMethod {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiny" => Ok(Self::Tiny),
            "accurate" | "ssd" => Ok(Self::Accurate),
            "both" => Ok(Self::Both),
            other => Err(SettingsError::UnknownDetectionMethod(other.to_string())),
        }
    }
}

/// Per-variant detector options handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub accurate_min_confidence: f32,
    pub fast_input_size: u32,
    pub fast_score_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            accurate_min_confidence: 0.2,
            fast_input_size: 512,
            fast_score_threshold: 0.1,
        }
    }
}

/// Configuration captured by one matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Minimum confidence (0–100) for an image to count as a match.
    pub match_threshold: f32,
    pub enable_angle_matching: bool,
    pub detection_method: DetectionMethod,
    pub batch_size: usize,
    /// Pause between batches, yielding to other tasks.
    pub batch_delay_ms: u64,
    /// Upper bound on a single provider call.
    pub detect_timeout_secs: u64,
    pub detector: DetectorSettings,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            match_threshold: 50.0,
            enable_angle_matching: true,
            detection_method: DetectionMethod::Both,
            batch_size: 3,
            batch_delay_ms: 50,
            detect_timeout_secs: 30,
            detector: DetectorSettings::default(),
        }
    }
}

impl MatchSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=100.0).contains(&self.match_threshold) {
            return Err(SettingsError::ThresholdOutOfRange(self.match_threshold));
        }
        if self.batch_size == 0 {
            return Err(SettingsError::ZeroBatchSize);
        }
        if self.detect_timeout_secs == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_secs(self.detect_timeout_secs)
    }
}

/// Selfie quality cutoffs. Brightness and contrast are on the 0–255 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_dimension: u32,
    pub dark_brightness: f32,
    pub bright_brightness: f32,
    pub low_contrast: f32,
    /// Face area as a percentage of image area.
    pub small_face_pct: f32,
    pub large_face_pct: f32,
    pub max_selfie_bytes: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_dimension: 120,
            dark_brightness: 30.0,
            bright_brightness: 220.0,
            low_contrast: 15.0,
            small_face_pct: 3.0,
            large_face_pct: 80.0,
            max_selfie_bytes: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(MatchSettings::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let settings = MatchSettings { match_threshold: 120.0, ..Default::default() };
        assert_eq!(settings.validate(), Err(SettingsError::ThresholdOutOfRange(120.0)));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let settings = MatchSettings { batch_size: 0, ..Default::default() };
        assert_eq!(settings.validate(), Err(SettingsError::ZeroBatchSize));
    }

    #[test]
    fn test_detection_method_parse() {
        assert_eq!("tiny".parse::<DetectionMethod>().unwrap(), DetectionMethod::Tiny);
        assert_eq!("SSD".parse::<DetectionMethod>().unwrap(), DetectionMethod::Accurate);
        assert_eq!(" both ".parse::<DetectionMethod>().unwrap(), DetectionMethod::Both);
        assert!("fastest".parse::<DetectionMethod>().is_err());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: MatchSettings =
            serde_json::from_str(r#"{"match_threshold": 65, "detection_method": "ssd"}"#).unwrap();
        assert_eq!(settings.match_threshold, 65.0);
        assert_eq!(settings.detection_method, DetectionMethod::Accurate);
        assert_eq!(settings.batch_size, 3);
        assert!(settings.enable_angle_matching);
    }
}
