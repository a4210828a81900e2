use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::application::capture_loop::{CaptureLoop, LoopSettings};
use crate::application::detectors::DetectorBank;
use crate::application::ports::FrameSource;
use crate::application::sessions::SessionRegistry;
use crate::application::shared::SharedState;
use crate::domain::{
    camera::{CaptureSettings, EffectiveCapture},
    detection::Algorithm,
    errors::{OpenError, StartError, UnknownAlgorithm},
    frame::DetectionResult,
    stream::{ControllerState, StatusSnapshot},
};

#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    /// Used when neither the request nor a device session names an index.
    pub default_camera_index: u32,
    pub capture: CaptureSettings,
    pub pacing: LoopSettings,
    pub initial_algorithm: Algorithm,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    pub requested_index: u32,
    pub capture: EffectiveCapture,
}

#[derive(Default)]
struct Lifecycle {
    worker: Option<JoinHandle<()>>,
    stop: Option<Arc<AtomicBool>>,
}

/// Coordinates the camera, the capture loop and algorithm selection.
///
/// Built once in `main` and shared with the HTTP layer through an `Arc`.
/// `start` and `stop` block (device open, thread join) and should be called
/// from a blocking context; every other method returns immediately.
pub struct CameraController {
    source: Arc<dyn FrameSource>,
    detectors: Arc<DetectorBank>,
    sessions: Arc<SessionRegistry>,
    settings: ControllerSettings,
    shared: Arc<SharedState>,
    lifecycle: Mutex<Lifecycle>,
}

impl CameraController {
    pub fn new(
        source: Arc<dyn FrameSource>,
        detectors: Arc<DetectorBank>,
        sessions: Arc<SessionRegistry>,
        settings: ControllerSettings,
    ) -> Self {
        let shared = Arc::new(SharedState::new(settings.initial_algorithm));
        Self {
            source,
            detectors,
            sessions,
            settings,
            shared,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the camera and spawns the capture loop.
    pub fn start(&self, camera_index: Option<u32>, device_id: Option<&str>) -> Result<StartReport, StartError> {
        let mut lifecycle = self.lifecycle();

        {
            let mut slot = self.shared.slot();
            if matches!(slot.state, ControllerState::Starting | ControllerState::Streaming) {
                return Err(StartError::AlreadyRunning);
            }
            slot.state = ControllerState::Starting;
            slot.latest = None;
            slot.last_error = None;
        }

        // A loop that died in Failed still has a joinable handle.
        if let Some(old) = lifecycle.worker.take() {
            let _ = old.join();
        }
        lifecycle.stop = None;

        let index = self.resolve_index(camera_index, device_id);
        info!("Starting camera (preferred index {})", index);

        let device = match self.source.open(index, &self.settings.capture) {
            Ok(device) => device,
            Err(e) => {
                warn!("Camera start failed: {}", e);
                self.shared.set_state(ControllerState::Idle);
                return Err(StartError::from(e));
            }
        };
        let capture = device.effective().clone();

        let stop = Arc::new(AtomicBool::new(false));
        self.shared.reset_failures();
        let worker = CaptureLoop {
            source: self.source.clone(),
            detectors: self.detectors.clone(),
            shared: self.shared.clone(),
            stop: stop.clone(),
            settings: self.settings.pacing.clone(),
            capture: self.settings.capture.clone(),
            preferred_index: index,
        };

        // Streaming must be visible before the loop can fail and overwrite it.
        self.shared.set_state(ControllerState::Streaming);
        match worker.spawn(device) {
            Ok(handle) => {
                lifecycle.worker = Some(handle);
                lifecycle.stop = Some(stop);
            }
            Err(e) => {
                error!("Could not spawn capture thread: {}", e);
                self.shared.set_state(ControllerState::Idle);
                return Err(StartError::NoDeviceAvailable(OpenError::NoDeviceAvailable { tried: 0 }));
            }
        }

        info!(
            "📷 Camera streaming from {} [{} {}x{} @ {} fps]",
            capture.path, capture.backend, capture.width, capture.height, capture.fps
        );
        Ok(StartReport { requested_index: index, capture })
    }

    /// Stops the loop and releases the camera. Safe to call at any time.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle();

        if let Some(stop) = lifecycle.stop.take() {
            self.shared.set_state(ControllerState::Stopping);
            stop.store(true, Ordering::SeqCst);
        }
        if let Some(handle) = lifecycle.worker.take() {
            if handle.join().is_err() {
                error!("Capture loop panicked during shutdown");
            }
            info!("Camera stopped");
        }

        self.shared.set_detection_active(false);
        self.shared.reset_failures();
        self.shared.reset();
    }

    /// Final stop at process exit.
    pub fn shutdown(&self) {
        info!("Shutting down camera controller");
        self.stop();
    }

    pub fn set_detection_active(&self, active: bool) {
        self.shared.set_detection_active(active);
        info!("Detection {}", if active { "enabled" } else { "disabled" });
    }

    /// Selects the algorithm for the next frame. Unknown names leave the
    /// current selection in place.
    pub fn set_algorithm(&self, name: &str) -> Result<Algorithm, UnknownAlgorithm> {
        let algorithm: Algorithm = name.parse()?;
        self.select_algorithm(algorithm);
        Ok(algorithm)
    }

    pub fn select_algorithm(&self, algorithm: Algorithm) {
        self.shared.set_algorithm(algorithm);
        info!("Algorithm set to {}", algorithm);
    }

    pub fn algorithm(&self) -> Algorithm {
        self.shared.algorithm()
    }

    pub fn latest(&self) -> Option<Arc<DetectionResult>> {
        self.shared.latest()
    }

    pub fn state(&self) -> ControllerState {
        self.shared.state()
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == ControllerState::Streaming
    }

    /// Recovery cycles attempted since the controller was built.
    pub fn recovery_attempts(&self) -> u32 {
        self.shared.recoveries()
    }

    pub fn status(&self, device_id: Option<&str>) -> StatusSnapshot {
        if let Some(id) = device_id {
            self.sessions.lookup(id);
        }
        let active_sessions = self.sessions.active_count();
        let latest = self.shared.latest();
        let state = self.shared.state();

        StatusSnapshot {
            count: latest.as_ref().map(|r| r.count).unwrap_or(0),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            is_streaming: state == ControllerState::Streaming,
            detection_active: self.shared.detection_active(),
            algorithm: self.shared.algorithm(),
            active_sessions,
            state,
            sequence: latest.as_ref().map(|r| r.sequence),
            consecutive_failures: self.shared.consecutive_failures(),
            last_error: self.shared.last_error(),
            detection_error: latest.as_ref().and_then(|r| r.error.clone()),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn resolve_index(&self, camera_index: Option<u32>, device_id: Option<&str>) -> u32 {
        if let Some(index) = camera_index {
            return index;
        }
        device_id
            .and_then(|id| self.sessions.lookup(id))
            .map(|s| s.preferred_camera_index)
            .unwrap_or(self.settings.default_camera_index)
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.stop();
    }
}
