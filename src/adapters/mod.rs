pub mod http;
pub mod onnx;
pub mod v4l2;
pub mod vision;

use std::sync::Arc;

use crate::application::detectors::DetectorBank;
use crate::domain::model::InferenceConfig;

/// The production detector set: both contour pipelines plus the ONNX model.
pub fn standard_detectors(inference: InferenceConfig) -> DetectorBank {
    DetectorBank::new(
        Arc::new(vision::ContourOtsu),
        Arc::new(vision::ContourCanny),
        Arc::new(onnx::LearnedDetector::new(inference)),
    )
}
