use std::sync::Arc;
use crate::application::{controller::CameraController, services::CameraService, sessions::SessionRegistry};
use crate::config::AppConfig;

/// Shared state for the axum handlers. Holds the use cases, never adapters.
#[derive(Clone)]
pub struct HttpState {
    /// Owns the camera and the capture loop.
    pub controller: Arc<CameraController>,
    pub sessions: Arc<SessionRegistry>,
    /// Hardware inventory for `/api/cameras`.
    pub cameras: Arc<CameraService>,
    pub config: Arc<AppConfig>,
}
