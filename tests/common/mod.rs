//! Scripted in-memory camera shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use contour_cam::adapters::standard_detectors;
use contour_cam::application::capture_loop::LoopSettings;
use contour_cam::application::controller::{CameraController, ControllerSettings};
use contour_cam::application::ports::{CaptureDevice, FrameSource};
use contour_cam::application::sessions::SessionRegistry;
use contour_cam::domain::{
    camera::{CaptureSettings, EffectiveCapture},
    errors::{OpenError, ReadError},
    frame::Frame,
    model::{InferenceConfig, ModelId, YoloParams},
};

/// Knobs and counters observed by every handle the source hands out.
#[derive(Default)]
pub struct Probe {
    pub failing_reads: AtomicBool,
    pub refuse_opens: AtomicBool,
    pub opens: AtomicUsize,
    pub live_handles: AtomicUsize,
    pub peak_handles: AtomicUsize,
    pub requested_indices: Mutex<Vec<u32>>,
}

pub struct ScriptedSource {
    pub probe: Arc<Probe>,
    image: RgbImage,
}

impl ScriptedSource {
    pub fn new(image: RgbImage) -> Self {
        Self { probe: Arc::new(Probe::default()), image }
    }
}

impl FrameSource for ScriptedSource {
    fn open(&self, preferred_index: u32, settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>, OpenError> {
        self.probe.requested_indices.lock().unwrap().push(preferred_index);
        if self.probe.refuse_opens.load(Ordering::SeqCst) {
            return Err(OpenError::NoDeviceAvailable { tried: 1 });
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        let live = self.probe.live_handles.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak_handles.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(ScriptedDevice {
            probe: self.probe.clone(),
            image: self.image.clone(),
            effective: EffectiveCapture {
                index: preferred_index,
                path: format!("/dev/video{}", preferred_index),
                backend: "MJPG".into(),
                width: self.image.width(),
                height: self.image.height(),
                fps: settings.fps,
                buffer_depth: settings.buffer_depth,
            },
            sequence: 0,
        }))
    }
}

struct ScriptedDevice {
    probe: Arc<Probe>,
    image: RgbImage,
    effective: EffectiveCapture,
    sequence: u64,
}

impl CaptureDevice for ScriptedDevice {
    fn configure(&mut self, _settings: &CaptureSettings) -> EffectiveCapture {
        self.effective.clone()
    }

    fn read(&mut self) -> Result<Frame, ReadError> {
        if self.probe.failing_reads.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
            return Err(ReadError::Transient("scripted timeout".into()));
        }
        self.sequence += 1;
        Ok(Frame::new(self.sequence, self.image.clone()))
    }

    fn effective(&self) -> &EffectiveCapture {
        &self.effective
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        self.probe.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn fast_settings() -> ControllerSettings {
    ControllerSettings {
        pacing: LoopSettings {
            failure_threshold: 10,
            retry_backoff: Duration::from_millis(2),
            recovery_delay: Duration::from_millis(200),
            target_fps: 100,
        },
        ..ControllerSettings::default()
    }
}

pub fn missing_model() -> InferenceConfig {
    InferenceConfig {
        model: ModelId { name: "yolo".into(), onnx_path: "/nonexistent/yolo.onnx".into() },
        params: YoloParams::default(),
    }
}

pub fn controller_with(image: RgbImage) -> (Arc<CameraController>, Arc<Probe>, Arc<SessionRegistry>) {
    let source = ScriptedSource::new(image);
    let probe = source.probe.clone();
    let sessions = Arc::new(SessionRegistry::default());
    let controller = CameraController::new(
        Arc::new(source),
        Arc::new(standard_detectors(missing_model())),
        sessions.clone(),
        fast_settings(),
    );
    (Arc::new(controller), probe, sessions)
}

/// Polls `check` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

/// Light background with three well separated dark squares.
pub fn dark_blobs_on_light() -> RgbImage {
    let mut image = RgbImage::from_pixel(240, 120, Rgb([230, 230, 230]));
    for x in [30, 100, 170] {
        draw_filled_rect_mut(&mut image, Rect::at(x, 40).of_size(40, 40), Rgb([20, 20, 20]));
    }
    image
}

/// Black background with three well separated white squares.
pub fn white_blobs_on_black() -> RgbImage {
    let mut image = RgbImage::new(240, 120);
    for x in [30, 100, 170] {
        draw_filled_rect_mut(&mut image, Rect::at(x, 40).of_size(40, 40), Rgb([255, 255, 255]));
    }
    image
}
