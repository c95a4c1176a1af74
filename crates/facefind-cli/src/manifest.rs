//! Detection manifest provider: replays precomputed detections from JSON.
//!
//! ```json
//! {
//!   "models": ["accurate", "fast"],
//!   "images": {
//!     "https://cdn.example/1.jpg": { "accurate": [ ... ], "fast": [ ... ] },
//!     "selfie.jpg": { "accurate": [ ... ] }
//!   }
//! }
//! ```
//!
//! Images are keyed by URL, or by file name for a decoded selfie. A variant
//! missing from an entry yields no faces for that variant.

use anyhow::{Context, Result};
use async_trait::async_trait;
use facefind_core::provider::{DetectOptions, DetectorVariant, FaceProvider, ImageSource, ModelSet};
use facefind_core::{Detection, ProviderError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    accurate: Vec<Detection>,
    #[serde(default)]
    fast: Vec<Detection>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestProvider {
    /// Detector variants whose models are available.
    #[serde(default = "all_variants")]
    models: Vec<DetectorVariant>,
    images: HashMap<String, ManifestEntry>,
}

fn all_variants() -> Vec<DetectorVariant> {
    vec![DetectorVariant::Accurate, DetectorVariant::Fast]
}

impl ManifestProvider {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection manifest {}", path.display()))?;
        let manifest = Self::from_json(&contents)
            .with_context(|| format!("failed to parse detection manifest {}", path.display()))?;
        tracing::debug!(path = %path.display(), images = manifest.images.len(), "detection manifest loaded");
        Ok(manifest)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn has(&self, variant: DetectorVariant) -> bool {
        self.models.contains(&variant)
    }
}

#[async_trait]
impl FaceProvider for ManifestProvider {
    async fn load_models(&self, set: ModelSet) -> Result<(), ProviderError> {
        let ok = match set {
            ModelSet::Full => self.has(DetectorVariant::Accurate) && self.has(DetectorVariant::Fast),
            ModelSet::FastOnly => self.has(DetectorVariant::Fast),
        };
        if ok {
            Ok(())
        } else {
            Err(ProviderError::LoadFailed(format!("{set:?} model set not present in manifest")))
        }
    }

    async fn detect(
        &self,
        image: &ImageSource,
        options: &DetectOptions,
    ) -> Result<Vec<Detection>, ProviderError> {
        let entry = self
            .images
            .get(image.key())
            .ok_or_else(|| ProviderError::UnknownImage(image.key().to_string()))?;
        let faces = match options.variant {
            DetectorVariant::Accurate => &entry.accurate,
            DetectorVariant::Fast => &entry.fast,
        };
        Ok(faces
            .iter()
            .filter(|d| d.score_or_default() >= options.min_confidence)
            .cloned()
            .collect())
    }
}
