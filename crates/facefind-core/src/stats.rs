//! Match session tallies: live progress counters and the final summary.

use crate::matcher::ImageMatchResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSessionStats {
    pub images_processed: usize,
    pub images_with_matches: usize,
    pub total_faces_detected: usize,
    /// Mean best-match confidence over kept images, 0 when none were kept.
    pub average_confidence: f32,
}

impl MatchSessionStats {
    /// Batch-granular progress snapshot. Carries counts only.
    pub fn progress(images_processed: usize, images_with_matches: usize) -> Self {
        Self {
            images_processed,
            images_with_matches,
            ..Default::default()
        }
    }

    /// Final tally over the kept results of a session.
    pub fn summarize(results: &[ImageMatchResult], images_processed: usize) -> Self {
        let total_faces_detected = results.iter().map(|r| r.face_count).sum();
        let average_confidence = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.best_match.confidence).sum::<f32>() / results.len() as f32
        };

        Self {
            images_processed,
            images_with_matches: results.len(),
            total_faces_detected,
            average_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchCandidate;
    use crate::pose::PoseLabel;
    use crate::types::{FaceBox, MediaItem, MediaKind};

    fn result(confidence: f32, face_count: usize) -> ImageMatchResult {
        let best = MatchCandidate {
            similarity: confidence,
            distance: 0.0,
            confidence,
            angle: PoseLabel::Frontal,
            position: FaceBox::default(),
        };
        ImageMatchResult {
            source: MediaItem {
                id: "m".into(),
                url: "u".into(),
                kind: MediaKind::Image,
                original_name: None,
            },
            matches: vec![best.clone()],
            best_match: best,
            face_count,
            face_locations: Vec::new(),
            matched_face_count: 1,
            processing_ms: 0,
        }
    }

    #[test]
    fn test_summarize_empty() {
        let stats = MatchSessionStats::summarize(&[], 7);
        assert_eq!(stats.images_processed, 7);
        assert_eq!(stats.images_with_matches, 0);
        assert_eq!(stats.total_faces_detected, 0);
        assert_eq!(stats.average_confidence, 0.0);
    }

    #[test]
    fn test_summarize_folds_counts_and_mean() {
        let results = vec![result(90.0, 3), result(60.0, 1)];
        let stats = MatchSessionStats::summarize(&results, 10);
        assert_eq!(stats.images_with_matches, 2);
        assert_eq!(stats.total_faces_detected, 4);
        assert!((stats.average_confidence - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_progress_has_no_confidence() {
        let stats = MatchSessionStats::progress(6, 2);
        assert_eq!(stats.images_processed, 6);
        assert_eq!(stats.images_with_matches, 2);
        assert_eq!(stats.average_confidence, 0.0);
    }
}
