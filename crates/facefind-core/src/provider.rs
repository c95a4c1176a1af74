//! Face descriptor provider contract and the capability handle around it.
//!
//! The provider (model-backed detection, landmarks and embeddings) lives
//! outside this crate. [`ProviderHandle::initialize`] loads its models once
//! and records which detector variants are usable; every core operation takes
//! the handle explicitly and checks readiness before detecting.

use crate::settings::{DetectionMethod, DetectorSettings};
use crate::types::Detection;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("face recognition models not loaded")]
    ModelsNotLoaded,
    #[error("model loading failed: {0}")]
    LoadFailed(String),
    #[error("image fetch failed: {0}")]
    FetchFailed(String),
    #[error("image decode failed: {0}")]
    DecodeFailed(String),
    #[error("detection failed: {0}")]
    DetectionFailed(String),
    #[error("no image registered under {0}")]
    UnknownImage(String),
    #[error("{variant} detector timed out after {timeout:?}")]
    Timeout { variant: DetectorVariant, timeout: Duration },
}

/// Detector variants with a speed/accuracy tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorVariant {
    /// Higher precision, slower.
    Accurate,
    /// Lower fidelity, faster; run at a larger input size.
    Fast,
}

impl fmt::Display for DetectorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorVariant::Accurate => f.write_str("accurate"),
            DetectorVariant::Fast => f.write_str("fast"),
        }
    }
}

/// Options for one provider detection call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
    pub variant: DetectorVariant,
    /// Minimum detector score for a face to be returned.
    pub min_confidence: f32,
    pub input_size: Option<u32>,
}

impl DetectorSettings {
    pub fn options_for(&self, variant: DetectorVariant) -> DetectOptions {
        match variant {
            DetectorVariant::Accurate => DetectOptions {
                variant,
                min_confidence: self.accurate_min_confidence,
                input_size: None,
            },
            DetectorVariant::Fast => DetectOptions {
                variant,
                min_confidence: self.fast_score_threshold,
                input_size: Some(self.fast_input_size),
            },
        }
    }
}

/// Image handed to the provider: a remote URL the provider fetches and
/// decodes itself, or an image already decoded by the caller.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Url(String),
    Decoded { name: String, image: Arc<DynamicImage> },
}

impl ImageSource {
    /// Stable key used for logging and provider lookups.
    pub fn key(&self) -> &str {
        match self {
            ImageSource::Url(url) => url,
            ImageSource::Decoded { name, .. } => name,
        }
    }
}

/// Which model groups the provider should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSet {
    /// Both detectors plus landmark and embedding models.
    Full,
    /// Fast detector only, used when the full set cannot be loaded.
    FastOnly,
}

/// External face detection / embedding capability.
#[async_trait]
pub trait FaceProvider: Send + Sync {
    /// One-time model loading.
    async fn load_models(&self, set: ModelSet) -> Result<(), ProviderError>;

    /// Detect all faces in `image`, each with box, score, landmarks and embedding.
    async fn detect(
        &self,
        image: &ImageSource,
        options: &DetectOptions,
    ) -> Result<Vec<Detection>, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Ready,
    /// Only the fast detector could be loaded.
    Limited,
    Failed,
}

/// Snapshot of provider readiness, suitable for a status display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReport {
    pub status: ProviderStatus,
    pub variants: Vec<DetectorVariant>,
    pub initialized_at: DateTime<Utc>,
}

/// Capability handle for an initialized provider.
#[derive(Clone)]
pub struct ProviderHandle {
    provider: Arc<dyn FaceProvider>,
    report: ProviderReport,
}

impl ProviderHandle {
    /// Load provider models, degrading to the fast detector alone if the
    /// full set fails. Never fails itself: an unusable provider yields a
    /// handle with [`ProviderStatus::Failed`].
    pub async fn initialize(provider: Arc<dyn FaceProvider>) -> Self {
        tracing::info!("loading face models");

        let (status, variants) = match provider.load_models(ModelSet::Full).await {
            Ok(()) => {
                tracing::info!("face models loaded");
                (ProviderStatus::Ready, vec![DetectorVariant::Accurate, DetectorVariant::Fast])
            }
            Err(err) => {
                tracing::warn!(error = %err, "full model set failed to load; trying fast detector only");
                match provider.load_models(ModelSet::FastOnly).await {
                    Ok(()) => {
                        tracing::info!("fast detector loaded; running in limited mode");
                        (ProviderStatus::Limited, vec![DetectorVariant::Fast])
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "fast detector failed to load");
                        (ProviderStatus::Failed, Vec::new())
                    }
                }
            }
        };

        Self {
            provider,
            report: ProviderReport {
                status,
                variants,
                initialized_at: Utc::now(),
            },
        }
    }

    pub fn status(&self) -> ProviderStatus {
        self.report.status
    }

    pub fn report(&self) -> &ProviderReport {
        &self.report
    }

    pub fn supports(&self, variant: DetectorVariant) -> bool {
        self.report.variants.contains(&variant)
    }

    pub fn ensure_ready(&self) -> Result<(), ProviderError> {
        match self.report.status {
            ProviderStatus::Ready | ProviderStatus::Limited => Ok(()),
            ProviderStatus::Failed => Err(ProviderError::ModelsNotLoaded),
        }
    }

    /// Variants to try, in order, for a detection-method preference.
    ///
    /// Variants the provider did not load are skipped; if that leaves
    /// nothing, whatever is loaded is used instead.
    pub fn detection_plan(&self, method: DetectionMethod) -> Vec<DetectorVariant> {
        let preferred: &[DetectorVariant] = match method {
            DetectionMethod::Both => &[DetectorVariant::Accurate, DetectorVariant::Fast],
            DetectionMethod::Accurate => &[DetectorVariant::Accurate],
            DetectionMethod::Tiny => &[DetectorVariant::Fast],
        };
        let plan: Vec<_> = preferred.iter().copied().filter(|v| self.supports(*v)).collect();
        if plan.is_empty() {
            tracing::debug!(?method, available = ?self.report.variants, "preferred detector unavailable");
            return self.report.variants.clone();
        }
        plan
    }

    /// Detect faces following the method's fallback order.
    ///
    /// Each variant is tried until one returns at least one face. A variant
    /// error or timeout is logged and the next variant tried. Returns `Err`
    /// only when no attempted variant succeeded.
    pub async fn detect_faces(
        &self,
        image: &ImageSource,
        method: DetectionMethod,
        detector: &DetectorSettings,
        timeout: Duration,
    ) -> Result<Vec<Detection>, ProviderError> {
        self.ensure_ready()?;

        let mut last_err = None;
        let mut succeeded = false;

        for variant in self.detection_plan(method) {
            let options = detector.options_for(variant);
            let attempt = tokio::time::timeout(timeout, self.provider.detect(image, &options))
                .await
                .unwrap_or(Err(ProviderError::Timeout { variant, timeout }));

            match attempt {
                Ok(faces) if !faces.is_empty() => {
                    tracing::debug!(image = image.key(), %variant, faces = faces.len(), "faces detected");
                    return Ok(faces);
                }
                Ok(_) => {
                    tracing::debug!(image = image.key(), %variant, "no faces; trying next detector");
                    succeeded = true;
                }
                Err(err) => {
                    tracing::warn!(image = image.key(), %variant, error = %err, "detector failed");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if !succeeded => Err(err),
            _ => Ok(Vec::new()),
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle").field("report", &self.report).finish()
    }
}
