use async_trait::async_trait;

use crate::domain::{
    camera::{CameraInfo, CaptureSettings, EffectiveCapture},
    detection::Algorithm,
    errors::{DetectionError, DomainResult, OpenError, ReadError},
    frame::{Annotated, Frame},
};

#[async_trait]
pub trait CameraCatalogPort: Send + Sync {
    async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>>;
}

/// An open capture device. Dropping it releases the hardware.
pub trait CaptureDevice: Send {
    /// Re-applies the requested settings. Rejected values are skipped; the
    /// configuration actually in effect is returned.
    fn configure(&mut self, settings: &CaptureSettings) -> EffectiveCapture;

    fn read(&mut self) -> Result<Frame, ReadError>;

    fn effective(&self) -> &EffectiveCapture;
}

/// Opens capture devices. Used both at start and by loop recovery.
pub trait FrameSource: Send + Sync {
    fn open(
        &self,
        preferred_index: u32,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn CaptureDevice>, OpenError>;
}

/// One frame-analysis pipeline. Must not mutate the input frame.
pub trait Detector: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn detect(&self, frame: &Frame) -> Result<Annotated, DetectionError>;
}
