//! facefind-core — Selfie validation and face matching over an event gallery.
//!
//! Detection, landmarks and embeddings come from an external
//! [`provider::FaceProvider`]. This crate grades the selfie, classifies face
//! pose from landmarks, and runs batched matching with angle-aware scoring.

pub mod angle;
pub mod matcher;
pub mod pose;
pub mod provider;
pub mod quality;
pub mod session;
pub mod settings;
pub mod stats;
pub mod types;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use matcher::{BatchMatcher, ImageMatchResult, MatchError, MatchOutcome, MatchReference};
pub use pose::PoseLabel;
pub use provider::{FaceProvider, ProviderError, ProviderHandle, ProviderStatus};
pub use settings::{DetectionMethod, MatchSettings, QualityThresholds};
pub use stats::MatchSessionStats;
pub use types::{Detection, Embedding, FaceBox, MediaItem, MediaKind};
pub use validator::{SelfieValidator, ValidationError, ValidationIssue, ValidationResult};
