//! Runtime configuration: command-line flags, each with an environment
//! variable fallback, split into the typed settings the components take.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use crate::application::capture_loop::LoopSettings;
use crate::application::controller::ControllerSettings;
use crate::domain::{
    camera::CaptureSettings,
    detection::Algorithm,
    model::{InferenceConfig, ModelId, YoloParams},
    session::CameraIndexPolicy,
};

#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "contour-cam", version, about = "Live contour and object counting over HTTP")]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[arg(long, env = "CONTOUR_CAM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "CONTOUR_CAM_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Camera index used when neither the request nor the client session picks one.
    #[arg(long, env = "CONTOUR_CAM_CAMERA_INDEX", default_value_t = 0)]
    pub camera_index: u32,

    #[arg(long, env = "CONTOUR_CAM_WIDTH", default_value_t = 640)]
    pub width: u32,

    #[arg(long, env = "CONTOUR_CAM_HEIGHT", default_value_t = 480)]
    pub height: u32,

    #[arg(long, env = "CONTOUR_CAM_FPS", default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    #[arg(long, env = "CONTOUR_CAM_BUFFERS", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=32))]
    pub buffers: u32,

    #[arg(long, env = "CONTOUR_CAM_READ_TIMEOUT_MS", default_value_t = 2_000)]
    pub read_timeout_ms: u64,

    /// Consecutive failed reads before the camera is reopened.
    #[arg(long, env = "CONTOUR_CAM_FAILURE_THRESHOLD", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub failure_threshold: u32,

    #[arg(long, env = "CONTOUR_CAM_RETRY_BACKOFF_MS", default_value_t = 100)]
    pub retry_backoff_ms: u64,

    #[arg(long, env = "CONTOUR_CAM_RECOVERY_DELAY_MS", default_value_t = 500)]
    pub recovery_delay_ms: u64,

    /// Seconds without activity before a device session is dropped.
    #[arg(long, env = "CONTOUR_CAM_SESSION_TIMEOUT_SECS", default_value_t = 300)]
    pub session_timeout_secs: u64,

    #[arg(long, env = "CONTOUR_CAM_DESKTOP_CAMERA_INDEX", default_value_t = 1)]
    pub desktop_camera_index: u32,

    #[arg(long, env = "CONTOUR_CAM_MOBILE_CAMERA_INDEX", default_value_t = 0)]
    pub mobile_camera_index: u32,

    #[arg(long, env = "CONTOUR_CAM_TABLET_CAMERA_INDEX", default_value_t = 0)]
    pub tablet_camera_index: u32,

    /// otsu, canny or learned (algorithm1..3 also accepted).
    #[arg(long, env = "CONTOUR_CAM_ALGORITHM", default_value = "canny")]
    pub algorithm: Algorithm,

    #[arg(long, env = "CONTOUR_CAM_MODEL_PATH", default_value = "models/yolo11n.onnx")]
    pub model_path: String,

    #[arg(long, env = "CONTOUR_CAM_MODEL_INPUT", default_value_t = 640)]
    pub model_input: u32,

    #[arg(long, env = "CONTOUR_CAM_MODEL_CONF", default_value_t = 0.25)]
    pub model_conf: f32,

    #[arg(long, env = "CONTOUR_CAM_MODEL_IOU", default_value_t = 0.45)]
    pub model_iou: f32,

    #[arg(long, env = "CONTOUR_CAM_MODEL_MAX_DET", default_value_t = 100)]
    pub model_max_det: usize,

    #[arg(long, env = "CONTOUR_CAM_JPEG_QUALITY", default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// Directory served for every path outside `/api`.
    #[arg(long, env = "CONTOUR_CAM_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn capture(&self) -> CaptureSettings {
        CaptureSettings {
            width: self.width,
            height: self.height,
            fps: self.fps,
            buffer_depth: self.buffers,
            read_timeout_ms: self.read_timeout_ms,
        }
    }

    pub fn pacing(&self) -> LoopSettings {
        LoopSettings {
            failure_threshold: self.failure_threshold,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            recovery_delay: Duration::from_millis(self.recovery_delay_ms),
            target_fps: self.fps,
        }
    }

    pub fn controller(&self) -> ControllerSettings {
        ControllerSettings {
            default_camera_index: self.camera_index,
            capture: self.capture(),
            pacing: self.pacing(),
            initial_algorithm: self.algorithm,
        }
    }

    pub fn camera_policy(&self) -> CameraIndexPolicy {
        CameraIndexPolicy {
            desktop: self.desktop_camera_index,
            mobile: self.mobile_camera_index,
            tablet: self.tablet_camera_index,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn inference(&self) -> InferenceConfig {
        let name = std::path::Path::new(&self.model_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());
        InferenceConfig {
            model: ModelId { name, onnx_path: self.model_path.clone() },
            params: YoloParams {
                input_size: self.model_input,
                conf_threshold: self.model_conf,
                iou_threshold: self.model_iou,
                max_detections: self.model_max_det,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_component_defaults() {
        let config = AppConfig::parse_from(["contour-cam"]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.capture(), CaptureSettings::default());
        assert_eq!(config.pacing(), LoopSettings::default());
        assert_eq!(config.camera_policy(), CameraIndexPolicy::default());
        assert_eq!(config.inference().params, YoloParams::default());
        assert_eq!(config.inference().model.name, "yolo11n");
        assert_eq!(config.algorithm, Algorithm::Canny);
        assert_eq!(config.jpeg_quality, 80);
    }

    #[test]
    fn flags_override_defaults() {
        let config = AppConfig::parse_from([
            "contour-cam",
            "--port",
            "9000",
            "--algorithm",
            "algorithm1",
            "--desktop-camera-index",
            "0",
            "--fps",
            "15",
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.algorithm, Algorithm::Otsu);
        assert_eq!(config.camera_policy().desktop, 0);
        assert_eq!(config.pacing().target_fps, 15);
        assert_eq!(config.capture().fps, 15);
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        assert!(AppConfig::try_parse_from(["contour-cam", "--jpeg-quality", "0"]).is_err());
        assert!(AppConfig::try_parse_from(["contour-cam", "--algorithm", "bogus"]).is_err());
    }
}
