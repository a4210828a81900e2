use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::UnknownAlgorithm;

/// A single box produced by the learned detector, in frame pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let l = self.x1.max(other.x1);
        let r = self.x2.min(other.x2);
        let t = self.y1.max(other.y1);
        let b = self.y2.min(other.y2);
        let inter = (r - l).max(0.0) * (b - t).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// The closed set of frame-analysis pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Otsu,
    Canny,
    Learned,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Otsu, Algorithm::Canny, Algorithm::Learned];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Otsu => "otsu",
            Algorithm::Canny => "canny",
            Algorithm::Learned => "learned",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Algorithm::Otsu => 0,
            Algorithm::Canny => 1,
            Algorithm::Learned => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Algorithm::Otsu,
            2 => Algorithm::Learned,
            _ => Algorithm::Canny,
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Canny
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    /// Accepts the dashboard's legacy `algorithmN` names as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "otsu" | "algorithm1" => Ok(Algorithm::Otsu),
            "canny" | "algorithm2" => Ok(Algorithm::Canny),
            "learned" | "yolo" | "algorithm3" => Ok(Algorithm::Learned),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}
