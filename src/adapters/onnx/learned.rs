use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info};

use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::adapters::vision::overlay::{draw_box, draw_count};
use crate::application::ports::Detector;
use crate::domain::{
    detection::Algorithm,
    errors::DetectionError,
    frame::{Annotated, Frame},
    model::InferenceConfig,
};

enum ModelState {
    NotLoaded,
    Ready(OnnxYoloEngine),
    /// Load failed once; never retried until restart.
    Unavailable(String),
}

/// Object detector backed by an ONNX YOLO model, loaded on first use.
pub struct LearnedDetector {
    config: InferenceConfig,
    model: Mutex<ModelState>,
}

impl LearnedDetector {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config, model: Mutex::new(ModelState::NotLoaded) }
    }

    fn model(&self) -> MutexGuard<'_, ModelState> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.model(), ModelState::Ready(_))
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        match &*self.model() {
            ModelState::Unavailable(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    fn load(&self) -> ModelState {
        let path = &self.config.model.onnx_path;
        if path.trim().is_empty() {
            return ModelState::Unavailable("no model path configured".into());
        }
        if !Path::new(path).exists() {
            return ModelState::Unavailable(format!("model file not found: {}", path));
        }
        match OnnxYoloEngine::load(path) {
            Ok(engine) => {
                info!("🧠 Model {} loaded from {}", self.config.model.name, path);
                ModelState::Ready(engine)
            }
            Err(e) => ModelState::Unavailable(format!("{}: {}", path, e)),
        }
    }
}

impl Detector for LearnedDetector {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Learned
    }

    fn detect(&self, frame: &Frame) -> Result<Annotated, DetectionError> {
        // Inference runs under the model lock; only the capture loop calls this.
        let mut model = self.model();
        if matches!(*model, ModelState::NotLoaded) {
            *model = self.load();
            if let ModelState::Unavailable(reason) = &*model {
                error!("Model load failed, learned detection disabled: {}", reason);
            }
        }

        let engine = match &mut *model {
            ModelState::Ready(engine) => engine,
            ModelState::Unavailable(reason) => return Err(DetectionError::ModelUnavailable(reason.clone())),
            ModelState::NotLoaded => return Err(DetectionError::ModelUnavailable("model not loaded".into())),
        };

        let detections = engine
            .infer(frame.image(), &self.config.params)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        drop(model);

        let mut image = frame.image().clone();
        for det in &detections {
            let label = format!("ID {} {:.2}", det.class_id, det.score);
            draw_box(&mut image, det.x1, det.y1, det.x2, det.y2, &label);
        }
        draw_count(&mut image, detections.len());

        Ok(Annotated { image, count: detections.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ModelId, YoloParams};
    use image::RgbImage;

    fn missing_model() -> LearnedDetector {
        LearnedDetector::new(InferenceConfig {
            model: ModelId { name: "yolo".into(), onnx_path: "/nonexistent/model.onnx".into() },
            params: YoloParams::default(),
        })
    }

    #[test]
    fn missing_model_is_permanently_unavailable() {
        let detector = missing_model();
        let frame = Frame::new(1, RgbImage::new(16, 16));

        for _ in 0..3 {
            match detector.detect(&frame) {
                Err(DetectionError::ModelUnavailable(reason)) => assert!(reason.contains("not found")),
                other => panic!("expected ModelUnavailable, got {:?}", other.map(|a| a.count)),
            }
        }
        assert!(!detector.is_loaded());
        assert!(detector.unavailable_reason().is_some());
    }

    #[test]
    fn loading_is_deferred_until_first_detect() {
        let detector = missing_model();
        assert!(detector.unavailable_reason().is_none());
    }
}
