//! Selfie validation: face count, pose, and image quality diagnostics.

use crate::matcher::MatchReference;
use crate::pose::{classify_pose, PoseLabel};
use crate::provider::{ImageSource, ProviderHandle};
use crate::quality::{to_percent, ImageStats};
use crate::settings::{DetectionMethod, DetectorSettings, QualityThresholds};
use crate::types::{Embedding, FaceBox};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("face recognition models not loaded")]
    ModelsNotLoaded,
    #[error("selfie is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("selfie is not a readable image: {0}")]
    NotAnImage(String),
}

/// Advisory finding about a selfie. Only [`ValidationIssue::NoFace`] blocks matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    NoFace,
    MultipleFaces,
    LowResolution,
    TooDark,
    Overexposed,
    LowContrast,
    FaceTooSmall,
    FaceTooClose,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationIssue::NoFace => {
                "No face detected in the image. Try a clearer photo with better lighting."
            }
            ValidationIssue::MultipleFaces => {
                "Multiple faces detected. The most prominent face will be used; a photo with only one person works best."
            }
            ValidationIssue::LowResolution => "Image resolution is low. Higher resolution works better.",
            ValidationIssue::TooDark => "Image is quite dark. Brighter photos work better.",
            ValidationIssue::Overexposed => "Image is very bright. Avoid overexposure.",
            ValidationIssue::LowContrast => "Low contrast image. Face features may not be clear.",
            ValidationIssue::FaceTooSmall => "Face is quite small in the image. Closer photos work better.",
            ValidationIssue::FaceTooClose => "Face is very close/cropped. Some background helps.",
        };
        f.write_str(text)
    }
}

/// Verdict for one selfie upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub face_count: usize,
    /// `"{width}x{height}"`.
    pub resolution: String,
    /// Mean brightness, 0–100.
    pub brightness: u8,
    /// Brightness standard deviation, 0–100.
    pub contrast: u8,
    pub face_angle: PoseLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_box: Option<FaceBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
}

impl ValidationResult {
    pub fn has_issue(&self, issue: ValidationIssue) -> bool {
        self.issues.contains(&issue)
    }

    /// Reference face for matching, present only for a valid selfie.
    pub fn reference(&self) -> Option<MatchReference> {
        if !self.is_valid {
            return None;
        }
        self.embedding.as_ref().map(|embedding| MatchReference {
            embedding: embedding.clone(),
            pose: self.face_angle,
        })
    }
}

/// Runs the provider on a selfie and grades it.
#[derive(Debug, Clone)]
pub struct SelfieValidator {
    thresholds: QualityThresholds,
    detector: DetectorSettings,
    timeout: Duration,
}

impl SelfieValidator {
    pub fn new(thresholds: QualityThresholds, detector: DetectorSettings, timeout: Duration) -> Self {
        Self {
            thresholds,
            detector,
            timeout,
        }
    }

    /// Validate raw selfie bytes.
    pub async fn validate(
        &self,
        provider: &ProviderHandle,
        name: &str,
        bytes: &[u8],
    ) -> Result<ValidationResult, ValidationError> {
        provider.ensure_ready().map_err(|_| ValidationError::ModelsNotLoaded)?;

        if bytes.len() > self.thresholds.max_selfie_bytes {
            return Err(ValidationError::TooLarge {
                size: bytes.len(),
                limit: self.thresholds.max_selfie_bytes,
            });
        }

        let image =
            image::load_from_memory(bytes).map_err(|e| ValidationError::NotAnImage(e.to_string()))?;
        self.validate_image(provider, name, Arc::new(image)).await
    }

    /// Validate an already-decoded selfie.
    ///
    /// Detector failures are logged and treated as zero faces, so a result
    /// is always produced once the provider is ready.
    pub async fn validate_image(
        &self,
        provider: &ProviderHandle,
        name: &str,
        image: Arc<DynamicImage>,
    ) -> Result<ValidationResult, ValidationError> {
        provider.ensure_ready().map_err(|_| ValidationError::ModelsNotLoaded)?;

        let stats = ImageStats::compute(&image);
        let source = ImageSource::Decoded {
            name: name.to_string(),
            image,
        };

        // Selfies always prefer accuracy and fall back to recall.
        let detections = match provider
            .detect_faces(&source, DetectionMethod::Both, &self.detector, self.timeout)
            .await
        {
            Ok(detections) => detections,
            Err(err) => {
                tracing::warn!(selfie = name, error = %err, "selfie detection failed; treating as no face");
                Vec::new()
            }
        };

        let primary = detections.first();
        let face_angle = primary
            .map(|d| classify_pose(d.landmarks.as_ref()))
            .unwrap_or_default();
        let face_box = primary.map(|d| d.face_box);

        let issues = self.assess(&stats, detections.len(), face_box.as_ref());
        let result = ValidationResult {
            is_valid: !detections.is_empty(),
            issues,
            face_count: detections.len(),
            resolution: stats.resolution(),
            brightness: to_percent(stats.brightness),
            contrast: to_percent(stats.contrast),
            face_angle,
            face_box,
            embedding: primary.map(|d| d.embedding.clone()),
        };

        tracing::info!(
            selfie = name,
            valid = result.is_valid,
            faces = result.face_count,
            angle = %result.face_angle,
            issues = ?result.issues,
            "selfie validated"
        );

        Ok(result)
    }

    fn assess(&self, stats: &ImageStats, face_count: usize, face_box: Option<&FaceBox>) -> Vec<ValidationIssue> {
        let t = &self.thresholds;
        let mut issues = Vec::new();

        match face_count {
            0 => issues.push(ValidationIssue::NoFace),
            1 => {}
            _ => issues.push(ValidationIssue::MultipleFaces),
        }

        if stats.width < t.min_dimension || stats.height < t.min_dimension {
            issues.push(ValidationIssue::LowResolution);
        }

        if stats.brightness < t.dark_brightness {
            issues.push(ValidationIssue::TooDark);
        } else if stats.brightness > t.bright_brightness {
            issues.push(ValidationIssue::Overexposed);
        }

        if stats.contrast < t.low_contrast {
            issues.push(ValidationIssue::LowContrast);
        }

        if let Some(face_box) = face_box.filter(|b| b.has_extent()) {
            let area = stats.area();
            if area > 0.0 {
                let face_pct = face_box.area() / area * 100.0;
                if face_pct < t.small_face_pct {
                    issues.push(ValidationIssue::FaceTooSmall);
                } else if face_pct > t.large_face_pct {
                    issues.push(ValidationIssue::FaceTooClose);
                }
            }
        }

        issues
    }
}

impl Default for SelfieValidator {
    fn default() -> Self {
        Self::new(
            QualityThresholds::default(),
            DetectorSettings::default(),
            Duration::from_secs(30),
        )
    }
}
