use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbImage;

use super::detection::Algorithm;

/// An RGB frame as produced by a capture device. Cheap to clone; the pixel
/// buffer is shared and never written after construction.
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    captured_at: DateTime<Utc>,
    image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(sequence: u64, image: RgbImage) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            image: Arc::new(image),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// New frame carrying this frame's tags with different pixels.
    pub fn with_image(&self, image: RgbImage) -> Self {
        Self {
            sequence: self.sequence,
            captured_at: self.captured_at,
            image: Arc::new(image),
        }
    }
}

/// Output of one capture-loop iteration.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub annotated: Frame,
    pub count: usize,
    pub algorithm: Algorithm,
    pub sequence: u64,
    /// Set when the detector failed for this frame; `count` is then 0.
    pub error: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// A detector's output for one frame: a drawn-on copy and the count.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub image: RgbImage,
    pub count: usize,
}
