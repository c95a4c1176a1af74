//! Pose compatibility table and angle-aware confidence adjustment.

use crate::pose::PoseLabel;

/// Multiplier applied when two poses share no compatible neighbours.
pub const INCOMPATIBLE_FACTOR: f32 = 0.6;
/// Floor of the multiplier for compatible but unequal poses.
const COMPATIBLE_BASE: f32 = 0.85;
const COMPATIBLE_SPAN: f32 = 0.15;

impl PoseLabel {
    /// Poses whose embeddings are considered comparable with this one,
    /// including the pose itself.
    pub fn compatible_poses(self) -> &'static [PoseLabel] {
        use PoseLabel::*;
        match self {
            Frontal => &[Frontal, SlightLeft, SlightRight, TiltedLeft, TiltedRight],
            SlightLeft => &[Frontal, SlightLeft, TiltedLeft, LeftProfile],
            SlightRight => &[Frontal, SlightRight, TiltedRight, RightProfile],
            TiltedLeft => &[Frontal, SlightLeft, TiltedLeft, LeftProfile],
            TiltedRight => &[Frontal, SlightRight, TiltedRight, RightProfile],
            LeftProfile => &[SlightLeft, TiltedLeft, LeftProfile, Profile],
            RightProfile => &[SlightRight, TiltedRight, RightProfile, Profile],
            Profile => &[LeftProfile, RightProfile, Profile],
        }
    }
}

/// Overlap score in (0, 1] for compatible poses, `None` when the
/// compatible sets are disjoint.
pub fn compatibility(a: PoseLabel, b: PoseLabel) -> Option<f32> {
    let set_a = a.compatible_poses();
    let set_b = b.compatible_poses();
    let shared = set_a.iter().filter(|p| set_b.contains(p)).count();
    if shared == 0 {
        return None;
    }
    Some(shared as f32 / set_a.len().max(set_b.len()) as f32)
}

/// Scale a confidence score by how comparable the two poses are.
///
/// Equal poses return `confidence` unchanged. Compatible poses keep
/// 85–100 % of it; incompatible poses keep 60 %.
pub fn adjust_confidence_for_angle(confidence: f32, reference: PoseLabel, candidate: PoseLabel) -> f32 {
    if reference == candidate {
        return confidence;
    }
    match compatibility(reference, candidate) {
        Some(score) => confidence * (COMPATIBLE_BASE + COMPATIBLE_SPAN * score),
        None => confidence * INCOMPATIBLE_FACTOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_unchanged() {
        for label in PoseLabel::ALL {
            for c in [0.0, 12.5, 50.0, 99.9, 100.0] {
                assert_eq!(adjust_confidence_for_angle(c, label, label), c);
            }
        }
    }

    #[test]
    fn test_penalty_bounds_all_pairs() {
        let c = 80.0;
        for a in PoseLabel::ALL {
            for b in PoseLabel::ALL {
                let adjusted = adjust_confidence_for_angle(c, a, b);
                assert!(
                    adjusted >= INCOMPATIBLE_FACTOR * c - 1e-4 && adjusted <= c + 1e-4,
                    "{a} vs {b}: {adjusted}"
                );
            }
        }
    }

    #[test]
    fn test_opposite_profiles_are_compatible_via_profile() {
        // Both sets contain Profile, so the penalty is mild.
        let score = compatibility(PoseLabel::LeftProfile, PoseLabel::RightProfile).unwrap();
        assert!((score - 0.25).abs() < 1e-6);
        let adjusted = adjust_confidence_for_angle(100.0, PoseLabel::LeftProfile, PoseLabel::RightProfile);
        assert!((adjusted - (100.0 * (0.85 + 0.15 * 0.25))).abs() < 1e-4);
    }

    #[test]
    fn test_frontal_vs_profile_is_incompatible() {
        assert!(compatibility(PoseLabel::Frontal, PoseLabel::Profile).is_none());
        let adjusted = adjust_confidence_for_angle(90.0, PoseLabel::Frontal, PoseLabel::Profile);
        assert!((adjusted - 54.0).abs() < 1e-4);
    }

    #[test]
    fn test_slight_left_vs_slight_right() {
        // Shared: {Frontal}; max set size 4.
        let score = compatibility(PoseLabel::SlightLeft, PoseLabel::SlightRight).unwrap();
        assert!((score - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_frontal_vs_slight_left() {
        // Shared: {Frontal, SlightLeft, TiltedLeft}; max set size 5.
        let score = compatibility(PoseLabel::Frontal, PoseLabel::SlightLeft).unwrap();
        assert!((score - 0.6).abs() < 1e-6);
        let adjusted = adjust_confidence_for_angle(100.0, PoseLabel::Frontal, PoseLabel::SlightLeft);
        assert!((adjusted - 94.0).abs() < 1e-4);
    }

    #[test]
    fn test_every_pose_lists_itself() {
        for label in PoseLabel::ALL {
            assert!(label.compatible_poses().contains(&label));
        }
    }
}
