use serde::{Deserialize, Serialize};

use crate::application::controller::StartReport;
use crate::domain::session::Session;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCameraRequest {
    pub device_id: Option<String>,
    pub camera_index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeAlgorithmRequest {
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub device_type: String,
    #[serde(default)]
    pub user_agent: String,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<StartReport>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), capture: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), capture: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameResponse {
    /// `data:image/jpeg;base64,...`, or null before the first frame.
    pub frame: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceResponse {
    pub device_id: String,
    pub message: String,
    pub preferred_camera_index: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraEntry {
    pub index: Option<u32>,
    pub name: String,
    pub card: String,
    pub path: String,
    pub driver: String,
    pub bus: String,
}
