//! Landmark-based head pose classification.
//!
//! Maps a 68-point landmark set to one of eight coarse pose labels using
//! eye-corner and nose-tip geometry. Any missing or degenerate input falls
//! back to [`PoseLabel::Frontal`].

use crate::types::{Landmarks, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Landmark indices (68-point convention) ---
const LEFT_EYE_OUTER: usize = 36;
const LEFT_EYE_INNER: usize = 39;
const RIGHT_EYE_INNER: usize = 42;
const RIGHT_EYE_OUTER: usize = 45;
const NOSE_TIP: usize = 30;

/// Face width estimated as a multiple of the inter-eye distance.
const FACE_WIDTH_PER_EYE_DISTANCE: f32 = 2.5;
/// Eye distance below this fraction of the face width reads as a profile.
const PROFILE_EYE_FRACTION: f32 = 0.2;
/// Vertical eye offset above this fraction of the eye distance reads as a tilt.
const TILT_FRACTION: f32 = 0.15;
/// Nose ratio bounds for the slight-turn labels.
const NOSE_RATIO_LOW: f32 = 0.4;
const NOSE_RATIO_HIGH: f32 = 0.6;
/// Eye visibility weights and the dominance factor for profile sides.
const EYE_VISIBLE: f32 = 1.0;
const EYE_PARTIAL: f32 = 0.8;
const PROFILE_DOMINANCE: f32 = 1.5;

/// Discretized head orientation relative to the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoseLabel {
    #[default]
    Frontal,
    SlightLeft,
    SlightRight,
    TiltedLeft,
    TiltedRight,
    LeftProfile,
    RightProfile,
    Profile,
}

impl PoseLabel {
    pub const ALL: [PoseLabel; 8] = [
        PoseLabel::Frontal,
        PoseLabel::SlightLeft,
        PoseLabel::SlightRight,
        PoseLabel::TiltedLeft,
        PoseLabel::TiltedRight,
        PoseLabel::LeftProfile,
        PoseLabel::RightProfile,
        PoseLabel::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoseLabel::Frontal => "frontal",
            PoseLabel::SlightLeft => "slight-left",
            PoseLabel::SlightRight => "slight-right",
            PoseLabel::TiltedLeft => "tilted-left",
            PoseLabel::TiltedRight => "tilted-right",
            PoseLabel::LeftProfile => "left-profile",
            PoseLabel::RightProfile => "right-profile",
            PoseLabel::Profile => "profile",
        }
    }
}

impl fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify head pose from a landmark set.
///
/// Returns [`PoseLabel::Frontal`] when landmarks are absent, when any of the
/// eye-corner or nose-tip points is missing, or when the geometry produces
/// non-finite intermediate values.
pub fn classify_pose(landmarks: Option<&Landmarks>) -> PoseLabel {
    let Some(landmarks) = landmarks else {
        return PoseLabel::Frontal;
    };
    match classify_points(landmarks) {
        Some(label) => label,
        None => {
            tracing::trace!(points = landmarks.len(), "pose: landmarks unusable, assuming frontal");
            PoseLabel::Frontal
        }
    }
}

fn classify_points(landmarks: &Landmarks) -> Option<PoseLabel> {
    let left_outer = landmarks.get(LEFT_EYE_OUTER)?;
    let left_inner = landmarks.get(LEFT_EYE_INNER)?;
    let right_inner = landmarks.get(RIGHT_EYE_INNER)?;
    let right_outer = landmarks.get(RIGHT_EYE_OUTER)?;
    let nose = landmarks.get(NOSE_TIP)?;

    let left_eye = left_outer.midpoint(left_inner);
    let right_eye = right_outer.midpoint(right_inner);

    let eye_distance = (right_eye.x - left_eye.x).abs();
    let face_width = eye_distance * FACE_WIDTH_PER_EYE_DISTANCE;
    if !face_width.is_finite() {
        return None;
    }

    if eye_distance < face_width * PROFILE_EYE_FRACTION {
        let left_vis = eye_visibility(landmarks, LEFT_EYE_OUTER, LEFT_EYE_INNER);
        let right_vis = eye_visibility(landmarks, RIGHT_EYE_INNER, RIGHT_EYE_OUTER);
        return Some(profile_side(left_vis, right_vis));
    }

    let vertical = (right_eye.y - left_eye.y).abs();
    if vertical > eye_distance * TILT_FRACTION {
        // Image y grows downwards: a larger y is a lower eye.
        return Some(if right_eye.y > left_eye.y {
            PoseLabel::TiltedRight
        } else {
            PoseLabel::TiltedLeft
        });
    }

    Some(turn_from_nose(nose, left_eye, right_eye))
}

fn eye_visibility(landmarks: &Landmarks, a: usize, b: usize) -> f32 {
    if landmarks.get(a).is_some() && landmarks.get(b).is_some() {
        EYE_VISIBLE
    } else {
        EYE_PARTIAL
    }
}

/// Pick the profile side from per-eye visibility weights.
fn profile_side(left_visibility: f32, right_visibility: f32) -> PoseLabel {
    if left_visibility > right_visibility * PROFILE_DOMINANCE {
        PoseLabel::RightProfile
    } else if right_visibility > left_visibility * PROFILE_DOMINANCE {
        PoseLabel::LeftProfile
    } else {
        PoseLabel::Profile
    }
}

/// Horizontal nose position between the eyes; NaN ratios land on frontal.
fn turn_from_nose(nose: Point, left_eye: Point, right_eye: Point) -> PoseLabel {
    let to_left = (nose.x - left_eye.x).abs();
    let to_right = (nose.x - right_eye.x).abs();
    let ratio = to_left / (to_left + to_right);

    if ratio < NOSE_RATIO_LOW {
        PoseLabel::SlightRight
    } else if ratio > NOSE_RATIO_HIGH {
        PoseLabel::SlightLeft
    } else {
        PoseLabel::Frontal
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a 68-point set with the five key points placed explicitly.
    pub(crate) fn landmarks_with(
        left_eye: (f32, f32),
        right_eye: (f32, f32),
        nose: (f32, f32),
    ) -> Landmarks {
        let mut positions = vec![Point::new(0.0, 0.0); 68];
        positions[LEFT_EYE_OUTER] = Point::new(left_eye.0 - 5.0, left_eye.1);
        positions[LEFT_EYE_INNER] = Point::new(left_eye.0 + 5.0, left_eye.1);
        positions[RIGHT_EYE_INNER] = Point::new(right_eye.0 - 5.0, right_eye.1);
        positions[RIGHT_EYE_OUTER] = Point::new(right_eye.0 + 5.0, right_eye.1);
        positions[NOSE_TIP] = Point::new(nose.0, nose.1);
        Landmarks::new(positions)
    }

    #[test]
    fn test_missing_landmarks_is_frontal() {
        assert_eq!(classify_pose(None), PoseLabel::Frontal);
        assert_eq!(classify_pose(Some(&Landmarks::default())), PoseLabel::Frontal);
    }

    #[test]
    fn test_missing_key_index_is_frontal() {
        for idx in [LEFT_EYE_OUTER, LEFT_EYE_INNER, RIGHT_EYE_INNER, RIGHT_EYE_OUTER, NOSE_TIP] {
            let mut lm = landmarks_with((40.0, 50.0), (80.0, 50.0), (45.0, 70.0));
            lm.positions[idx] = Point::new(f32::NAN, f32::NAN);
            assert_eq!(classify_pose(Some(&lm)), PoseLabel::Frontal, "index {idx}");
        }

        // Truncated set: indices past 30 are gone.
        let mut lm = landmarks_with((40.0, 50.0), (80.0, 50.0), (45.0, 70.0));
        lm.positions.truncate(31);
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::Frontal);
    }

    #[test]
    fn test_centered_nose_is_frontal() {
        let lm = landmarks_with((40.0, 50.0), (80.0, 50.0), (60.0, 70.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::Frontal);
    }

    #[test]
    fn test_nose_near_left_eye_is_slight_right() {
        // ratio = 10 / (10 + 30) = 0.25
        let lm = landmarks_with((40.0, 50.0), (80.0, 50.0), (50.0, 70.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::SlightRight);
    }

    #[test]
    fn test_nose_near_right_eye_is_slight_left() {
        // ratio = 30 / (30 + 10) = 0.75
        let lm = landmarks_with((40.0, 50.0), (80.0, 50.0), (70.0, 70.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::SlightLeft);
    }

    #[test]
    fn test_lower_right_eye_is_tilted_right() {
        // vertical 10 > 0.15 * 40
        let lm = landmarks_with((40.0, 50.0), (80.0, 60.0), (60.0, 75.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::TiltedRight);
    }

    #[test]
    fn test_lower_left_eye_is_tilted_left() {
        let lm = landmarks_with((40.0, 60.0), (80.0, 50.0), (60.0, 75.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::TiltedLeft);
    }

    #[test]
    fn test_small_vertical_offset_is_not_a_tilt() {
        // vertical 5 < 0.15 * 40 = 6
        let lm = landmarks_with((40.0, 50.0), (80.0, 55.0), (60.0, 75.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::Frontal);
    }

    #[test]
    fn test_coincident_eyes_and_nose_is_frontal() {
        let lm = landmarks_with((60.0, 50.0), (60.0, 50.0), (60.0, 70.0));
        assert_eq!(classify_pose(Some(&lm)), PoseLabel::Frontal);
    }

    #[test]
    fn test_profile_side_selection() {
        assert_eq!(profile_side(EYE_VISIBLE, EYE_VISIBLE), PoseLabel::Profile);
        assert_eq!(profile_side(EYE_VISIBLE, EYE_PARTIAL), PoseLabel::Profile);
        assert_eq!(profile_side(1.0, 0.5), PoseLabel::RightProfile);
        assert_eq!(profile_side(0.5, 1.0), PoseLabel::LeftProfile);
    }

    #[test]
    fn test_label_names_match_serde() {
        for label in PoseLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
        assert_eq!(PoseLabel::RightProfile.to_string(), "right-profile");
    }
}
