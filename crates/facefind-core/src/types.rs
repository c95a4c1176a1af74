use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detector score assumed for detections that arrive without one.
pub const DEFAULT_DETECTION_SCORE: f32 = 0.3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("embedding is empty")]
    Empty,
    #[error("embedding distance is not finite")]
    NonFinite,
}

/// A 2-D point in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Ordered facial landmarks for one face (68-point convention).
///
/// Indices carry fixed anatomical meaning, e.g. 36/39 are the outer/inner
/// corners of the left eye, 42/45 the inner/outer corners of the right eye
/// and 30 the nose tip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Landmarks {
    pub positions: Vec<Point>,
}

impl Landmarks {
    pub fn new(positions: Vec<Point>) -> Self {
        Self { positions }
    }

    /// Point at `index`, or `None` if absent or not finite.
    pub fn get(&self, index: usize) -> Option<Point> {
        self.positions
            .get(index)
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Axis-aligned face rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when the box has a non-zero extent on both axes.
    pub fn has_extent(&self) -> bool {
        self.width != 0.0 && self.height != 0.0
    }
}

/// Face identity vector (128-dimensional for the stock provider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance between two embeddings of equal dimension.
    pub fn euclidean_distance(&self, other: &Embedding) -> Result<f32, EmbeddingError> {
        if self.dim() != other.dim() {
            return Err(EmbeddingError::DimensionMismatch {
                left: self.dim(),
                right: other.dim(),
            });
        }
        if self.values.is_empty() {
            return Err(EmbeddingError::Empty);
        }

        let distance = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt();
        if !distance.is_finite() {
            return Err(EmbeddingError::NonFinite);
        }
        Ok(distance)
    }
}

/// One face found by the provider in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub landmarks: Option<Landmarks>,
    #[serde(rename = "box")]
    pub face_box: FaceBox,
    /// Detector confidence in [0, 1].
    #[serde(default)]
    pub score: Option<f32>,
    pub embedding: Embedding,
}

impl Detection {
    pub fn score_or_default(&self) -> f32 {
        self.score.unwrap_or(DEFAULT_DETECTION_SCORE)
    }
}

/// Kind of an entry in an event's media collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

/// One entry of the target media collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

impl MediaItem {
    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}
