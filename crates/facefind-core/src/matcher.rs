//! Batched face matching over an event's media collection.
//!
//! Images are processed in fixed-size batches. All images of a batch run
//! concurrently; the next batch starts only once the previous one has fully
//! resolved. A failing image is logged and skipped, never failing the run.

use crate::angle::adjust_confidence_for_angle;
use crate::pose::{classify_pose, PoseLabel};
use crate::provider::{ImageSource, ProviderHandle};
use crate::session::RunId;
use crate::settings::{MatchSettings, SettingsError};
use crate::stats::MatchSessionStats;
use crate::types::{Detection, Embedding, EmbeddingError, FaceBox, MediaItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("no reference face: validate a selfie with a detectable face first")]
    NoReference,
    #[error("face recognition models not loaded")]
    ModelsNotLoaded,
    #[error("invalid match settings: {0}")]
    Settings(#[from] SettingsError),
}

/// The selfie face every target face is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReference {
    pub embedding: Embedding,
    pub pose: PoseLabel,
}

/// One target face scored against the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// 0–100, after angle adjustment.
    pub similarity: f32,
    pub distance: f32,
    /// Same value as `similarity`; kept separate for display.
    pub confidence: f32,
    pub angle: PoseLabel,
    pub position: FaceBox,
}

/// Overlay data for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceLocation {
    #[serde(flatten)]
    pub face_box: FaceBox,
    pub score: f32,
    pub angle: PoseLabel,
}

/// Match outcome for one target image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMatchResult {
    pub source: MediaItem,
    pub matches: Vec<MatchCandidate>,
    pub best_match: MatchCandidate,
    pub face_count: usize,
    pub face_locations: Vec<FaceLocation>,
    /// Faces at or above the run's threshold.
    pub matched_face_count: usize,
    pub processing_ms: u64,
}

/// Result of one matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub run_id: RunId,
    /// Kept images, best confidence first.
    pub results: Vec<ImageMatchResult>,
    pub stats: MatchSessionStats,
    pub elapsed_ms: u64,
}

impl MatchOutcome {
    /// Guidance shown when nothing cleared the threshold.
    pub fn hint(&self) -> Option<&'static str> {
        if self.results.is_empty() {
            Some("No matching photos found. Try lowering the match threshold or using a different selfie.")
        } else {
            None
        }
    }
}

/// Map an embedding distance to a 0–100 similarity.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (100.0 - distance * 100.0).clamp(0.0, 100.0)
}

/// Score one detected face against the reference.
pub fn score_detection(
    reference: &MatchReference,
    detection: &Detection,
    angle_matching: bool,
) -> Result<MatchCandidate, EmbeddingError> {
    let distance = reference.embedding.euclidean_distance(&detection.embedding)?;
    let angle = classify_pose(detection.landmarks.as_ref());

    let mut similarity = similarity_from_distance(distance);
    if angle_matching {
        similarity = adjust_confidence_for_angle(similarity, reference.pose, angle).clamp(0.0, 100.0);
    }

    Ok(MatchCandidate {
        similarity,
        distance,
        confidence: similarity,
        angle,
        position: detection.face_box,
    })
}

/// Score every face in one image and apply the threshold gate.
///
/// Returns `Ok(None)` when the image has no faces or its best face falls
/// below the threshold.
pub fn evaluate_image(
    reference: &MatchReference,
    source: &MediaItem,
    detections: &[Detection],
    settings: &MatchSettings,
) -> Result<Option<ImageMatchResult>, EmbeddingError> {
    let matches = detections
        .iter()
        .map(|d| score_detection(reference, d, settings.enable_angle_matching))
        .collect::<Result<Vec<_>, _>>()?;

    // First of equal maxima wins.
    let Some(best_match) = matches
        .iter()
        .reduce(|best, c| if c.confidence > best.confidence { c } else { best })
        .cloned()
    else {
        return Ok(None);
    };

    if best_match.confidence.is_nan() || best_match.confidence < settings.match_threshold {
        return Ok(None);
    }

    let face_locations = detections
        .iter()
        .zip(&matches)
        .map(|(d, m)| FaceLocation {
            face_box: d.face_box,
            score: d.score_or_default(),
            angle: m.angle,
        })
        .collect();
    let matched_face_count = matches
        .iter()
        .filter(|m| m.confidence >= settings.match_threshold)
        .count();

    Ok(Some(ImageMatchResult {
        source: source.clone(),
        face_count: detections.len(),
        matches,
        best_match,
        face_locations,
        matched_face_count,
        processing_ms: 0,
    }))
}

/// Runs matching sessions against one provider.
#[derive(Debug, Clone)]
pub struct BatchMatcher {
    provider: ProviderHandle,
}

impl BatchMatcher {
    pub fn new(provider: ProviderHandle) -> Self {
        Self { provider }
    }

    /// Match `reference` against every image in `media`.
    ///
    /// `settings` is copied at start. When `progress` is given, a
    /// [`MatchSessionStats::progress`] snapshot is sent after every batch;
    /// a dropped receiver does not affect the run.
    pub async fn run_match_session(
        &self,
        run_id: RunId,
        reference: Option<&MatchReference>,
        media: &[MediaItem],
        settings: &MatchSettings,
        progress: Option<&mpsc::UnboundedSender<MatchSessionStats>>,
    ) -> Result<MatchOutcome, MatchError> {
        let Some(reference) = reference else {
            tracing::error!(%run_id, "matching requested without a reference face");
            return Err(MatchError::NoReference);
        };
        if self.provider.ensure_ready().is_err() {
            tracing::error!(%run_id, "matching requested before models loaded");
            return Err(MatchError::ModelsNotLoaded);
        }
        settings.validate()?;

        let started = Instant::now();
        let settings = Arc::new(settings.clone());
        let reference = Arc::new(reference.clone());
        let images: Vec<MediaItem> = media.iter().filter(|m| m.is_image()).cloned().collect();
        let batch_count = images.len().div_ceil(settings.batch_size);

        tracing::info!(
            %run_id,
            images = images.len(),
            batches = batch_count,
            threshold = settings.match_threshold,
            method = ?settings.detection_method,
            "matching session started"
        );

        let mut results = Vec::new();
        let mut processed = 0usize;

        for (batch_idx, batch) in images.chunks(settings.batch_size).enumerate() {
            let kept = self.run_batch(batch, &reference, &settings).await;
            results.extend(kept);
            processed += batch.len();

            tracing::debug!(%run_id, batch = batch_idx + 1, processed, matched = results.len(), "batch complete");
            if let Some(tx) = progress {
                let _ = tx.send(MatchSessionStats::progress(processed, results.len()));
            }

            if batch_idx + 1 < batch_count && settings.batch_delay_ms > 0 {
                tokio::time::sleep(settings.batch_delay()).await;
            }
        }

        results.sort_by(|a, b| b.best_match.confidence.total_cmp(&a.best_match.confidence));

        let stats = MatchSessionStats::summarize(&results, processed);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            %run_id,
            processed = stats.images_processed,
            matched = stats.images_with_matches,
            faces = stats.total_faces_detected,
            avg_confidence = stats.average_confidence,
            elapsed_ms,
            "matching session finished"
        );

        Ok(MatchOutcome {
            run_id,
            results,
            stats,
            elapsed_ms,
        })
    }

    /// Process one batch concurrently; kept results come back in input order.
    async fn run_batch(
        &self,
        batch: &[MediaItem],
        reference: &Arc<MatchReference>,
        settings: &Arc<MatchSettings>,
    ) -> Vec<ImageMatchResult> {
        let mut tasks = JoinSet::new();
        for (idx, item) in batch.iter().cloned().enumerate() {
            let provider = self.provider.clone();
            let reference = Arc::clone(reference);
            let settings = Arc::clone(settings);
            tasks.spawn(async move { (idx, match_image(&provider, &reference, item, &settings).await) });
        }

        let mut slots: Vec<Option<ImageMatchResult>> = vec![None; batch.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = result,
                Err(err) => tracing::warn!(error = %err, "image task aborted"),
            }
        }
        slots.into_iter().flatten().collect()
    }
}

async fn match_image(
    provider: &ProviderHandle,
    reference: &MatchReference,
    item: MediaItem,
    settings: &MatchSettings,
) -> Option<ImageMatchResult> {
    let started = Instant::now();
    let source = ImageSource::Url(item.url.clone());

    let detections = match provider
        .detect_faces(
            &source,
            settings.detection_method,
            &settings.detector,
            settings.detect_timeout(),
        )
        .await
    {
        Ok(detections) => detections,
        Err(err) => {
            tracing::warn!(media = %item.id, url = %item.url, error = %err, "failed to process image");
            return None;
        }
    };

    match evaluate_image(reference, &item, &detections, settings) {
        Ok(Some(mut result)) => {
            result.processing_ms = started.elapsed().as_millis() as u64;
            Some(result)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(media = %item.id, error = %err, "embedding incompatible with reference");
            None
        }
    }
}
