use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::application::detectors::DetectorBank;
use crate::application::ports::{CaptureDevice, FrameSource};
use crate::application::shared::SharedState;
use crate::domain::{
    camera::CaptureSettings,
    errors::LoopError,
    frame::{DetectionResult, Frame},
};

const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Timing and recovery knobs for the capture loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Consecutive read failures before the device is reopened.
    pub failure_threshold: u32,
    pub retry_backoff: Duration,
    pub recovery_delay: Duration,
    pub target_fps: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            retry_backoff: Duration::from_millis(100),
            recovery_delay: Duration::from_millis(500),
            target_fps: 30,
        }
    }
}

impl LoopSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.target_fps.max(1)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Recovering,
}

/// The single background worker: read, detect, publish, pace.
pub(crate) struct CaptureLoop {
    pub(crate) source: Arc<dyn FrameSource>,
    pub(crate) detectors: Arc<DetectorBank>,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) settings: LoopSettings,
    pub(crate) capture: CaptureSettings,
    pub(crate) preferred_index: u32,
}

impl CaptureLoop {
    pub(crate) fn spawn(self, device: Box<dyn CaptureDevice>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("capture-loop".into())
            .spawn(move || self.run(device))
    }

    fn run(self, device: Box<dyn CaptureDevice>) {
        let mut device = Some(device);
        let mut state = LoopState::Running;
        let mut last_logged_error: Option<String> = None;
        let frame_interval = self.settings.frame_interval();

        info!(
            "Capture loop started on {} (target {} fps)",
            device.as_ref().map(|d| d.effective().path.as_str()).unwrap_or("?"),
            self.settings.target_fps
        );

        while !self.stop_requested() {
            match state {
                LoopState::Running => {
                    let Some(dev) = device.as_mut() else {
                        state = LoopState::Recovering;
                        continue;
                    };
                    let started = Instant::now();

                    // 1. Read
                    let frame = match dev.read() {
                        Ok(frame) => frame,
                        Err(e) => {
                            let failures = self.shared.record_failure();
                            debug!("Frame read failed ({}/{}): {}", failures, self.settings.failure_threshold, e);
                            if failures >= self.settings.failure_threshold {
                                warn!("{} consecutive read failures, reopening camera", failures);
                                state = LoopState::Recovering;
                            } else {
                                self.pause(self.settings.retry_backoff);
                            }
                            continue;
                        }
                    };
                    self.shared.reset_failures();

                    // 2. Detect and publish
                    let result = self.process(frame);
                    match &result.error {
                        Some(err) if last_logged_error.as_deref() != Some(err.as_str()) => {
                            warn!("Detector error, publishing zero count: {}", err);
                            last_logged_error = Some(err.clone());
                        }
                        None => last_logged_error = None,
                        _ => {}
                    }
                    self.shared.publish(result);

                    // 3. Pace
                    self.pause(frame_interval.saturating_sub(started.elapsed()));
                }
                LoopState::Recovering => match self.recover(&mut device) {
                    Ok(true) => state = LoopState::Running,
                    Ok(false) => break,
                    Err(e) => {
                        error!("{}", e);
                        self.shared.fail(e.to_string());
                        break;
                    }
                },
            }
        }

        drop(device);
        info!("Capture loop exited");
    }

    fn process(&self, frame: Frame) -> DetectionResult {
        let algorithm = self.shared.algorithm();

        let (annotated, count, error) = if self.shared.detection_active() {
            let eval = self.detectors.evaluate(algorithm, &frame);
            (frame.with_image(eval.image), eval.count, eval.error)
        } else {
            (frame, 0, None)
        };

        DetectionResult {
            annotated,
            count,
            algorithm,
            sequence: self.shared.next_sequence(),
            error,
            published_at: Utc::now(),
        }
    }

    /// One reopen attempt. `Ok(false)` means a stop arrived while waiting.
    fn recover(&self, device: &mut Option<Box<dyn CaptureDevice>>) -> Result<bool, LoopError> {
        self.shared.record_recovery();
        *device = None;

        if !self.pause(self.settings.recovery_delay) {
            return Ok(false);
        }

        match self.source.open(self.preferred_index, &self.capture) {
            Ok(reopened) => {
                info!("Camera recovered on {}", reopened.effective().path);
                *device = Some(reopened);
                self.shared.reset_failures();
                Ok(true)
            }
            Err(e) => Err(LoopError::CameraUnavailable(e.to_string())),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Sleeps in short slices so a stop is seen promptly. Returns `false` if
    /// the stop flag was raised.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stop_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_interval_tracks_target_fps() {
        let settings = LoopSettings { target_fps: 20, ..LoopSettings::default() };
        assert_eq!(settings.frame_interval(), Duration::from_millis(50));

        let zero = LoopSettings { target_fps: 0, ..LoopSettings::default() };
        assert_eq!(zero.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = LoopSettings::default();
        assert_eq!(settings.failure_threshold, 10);
        assert_eq!(settings.retry_backoff, Duration::from_millis(100));
        assert_eq!(settings.target_fps, 30);
    }
}
