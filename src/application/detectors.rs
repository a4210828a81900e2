use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use image::RgbImage;

use crate::application::ports::Detector;
use crate::domain::{detection::Algorithm, frame::Frame};

/// Outcome of running one detector over one frame, failures folded in.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub image: RgbImage,
    pub count: usize,
    pub error: Option<String>,
}

/// Holds one detector per [`Algorithm`] and dispatches on the enum.
#[derive(Clone)]
pub struct DetectorBank {
    otsu: Arc<dyn Detector>,
    canny: Arc<dyn Detector>,
    learned: Arc<dyn Detector>,
}

impl DetectorBank {
    pub fn new(
        otsu: Arc<dyn Detector>,
        canny: Arc<dyn Detector>,
        learned: Arc<dyn Detector>,
    ) -> Self {
        Self { otsu, canny, learned }
    }

    pub fn get(&self, algorithm: Algorithm) -> &dyn Detector {
        match algorithm {
            Algorithm::Otsu => self.otsu.as_ref(),
            Algorithm::Canny => self.canny.as_ref(),
            Algorithm::Learned => self.learned.as_ref(),
        }
    }

    /// Runs the selected detector. Errors and panics become a zero count on
    /// the untouched frame, with the reason attached.
    pub fn evaluate(&self, algorithm: Algorithm, frame: &Frame) -> Evaluation {
        let detector = self.get(algorithm);
        match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(frame))) {
            Ok(Ok(annotated)) => Evaluation {
                image: annotated.image,
                count: annotated.count,
                error: None,
            },
            Ok(Err(err)) => Evaluation {
                image: frame.image().clone(),
                count: 0,
                error: Some(err.to_string()),
            },
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Evaluation {
                    image: frame.image().clone(),
                    count: 0,
                    error: Some(format!("{} detector panicked: {}", algorithm, reason)),
                }
            }
        }
    }
}
