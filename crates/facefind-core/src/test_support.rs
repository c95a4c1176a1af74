//! Scripted provider for unit tests.

use crate::provider::{DetectOptions, DetectorVariant, FaceProvider, ImageSource, ModelSet, ProviderError};
use crate::types::{Detection, Embedding, FaceBox, Landmarks};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Detection with a fixed 50×50 box at (10, 10) and score 0.9.
pub(crate) fn detection(embedding: Vec<f32>, landmarks: Option<Landmarks>) -> Detection {
    Detection {
        landmarks,
        face_box: FaceBox { x: 10.0, y: 10.0, width: 50.0, height: 50.0 },
        score: Some(0.9),
        embedding: Embedding::new(embedding),
    }
}

/// Vector whose Euclidean distance from `reference(dim)` is `distance`.
pub(crate) fn embedding_at_distance(dim: usize, distance: f32) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[0] = 1.0 - distance;
    v
}

/// Unit vector along the first axis.
pub(crate) fn reference(dim: usize) -> Vec<f32> {
    embedding_at_distance(dim, 0.0)
}

#[derive(Default)]
pub(crate) struct MockProvider {
    /// Faces returned for any variant.
    faces: HashMap<String, Vec<Detection>>,
    /// Faces returned for one variant only.
    by_variant: HashMap<(String, DetectorVariant), Vec<Detection>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    fail_full_load: bool,
    fail_all_loads: bool,
    calls: Mutex<Vec<(String, DetectOptions)>>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_faces(mut self, key: &str, faces: Vec<Detection>) -> Self {
        self.faces.insert(key.to_string(), faces);
        self
    }

    pub(crate) fn with_variant(mut self, key: &str, variant: DetectorVariant, faces: Vec<Detection>) -> Self {
        self.by_variant.insert((key.to_string(), variant), faces);
        self
    }

    pub(crate) fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub(crate) fn hanging(mut self, key: &str) -> Self {
        self.hanging.insert(key.to_string());
        self
    }

    pub(crate) fn failing_full_load(mut self) -> Self {
        self.fail_full_load = true;
        self
    }

    pub(crate) fn failing_all_loads(mut self) -> Self {
        self.fail_all_loads = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, DetectOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaceProvider for MockProvider {
    async fn load_models(&self, set: ModelSet) -> Result<(), ProviderError> {
        match set {
            _ if self.fail_all_loads => Err(ProviderError::LoadFailed("mock: all loads fail".into())),
            ModelSet::Full if self.fail_full_load => {
                Err(ProviderError::LoadFailed("mock: full set unavailable".into()))
            }
            _ => Ok(()),
        }
    }

    async fn detect(
        &self,
        image: &ImageSource,
        options: &DetectOptions,
    ) -> Result<Vec<Detection>, ProviderError> {
        let key = image.key().to_string();
        self.calls.lock().unwrap().push((key.clone(), *options));

        if self.hanging.contains(&key) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&key) {
            return Err(ProviderError::DetectionFailed(format!("mock: {key} is corrupt")));
        }
        if let Some(faces) = self.by_variant.get(&(key.clone(), options.variant)) {
            return Ok(faces.clone());
        }
        Ok(self.faces.get(&key).cloned().unwrap_or_default())
    }
}
