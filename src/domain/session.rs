use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl DeviceType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "desktop" | "laptop" | "pc" => DeviceType::Desktop,
            "mobile" | "phone" => DeviceType::Mobile,
            "tablet" => DeviceType::Tablet,
            _ => DeviceType::Unknown,
        }
    }
}

/// Camera index chosen for each kind of client device.
///
/// This is a heuristic: desktops usually have an external camera at index 1,
/// phones and tablets a single camera at index 0. Nothing probes hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraIndexPolicy {
    pub desktop: u32,
    pub mobile: u32,
    pub tablet: u32,
}

impl Default for CameraIndexPolicy {
    fn default() -> Self {
        Self { desktop: 1, mobile: 0, tablet: 0 }
    }
}

impl CameraIndexPolicy {
    pub fn index_for(&self, device_type: DeviceType) -> u32 {
        match device_type {
            DeviceType::Desktop | DeviceType::Unknown => self.desktop,
            DeviceType::Mobile => self.mobile,
            DeviceType::Tablet => self.tablet,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub device_id: String,
    pub device_type: DeviceType,
    pub user_agent: String,
    pub preferred_camera_index: u32,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}
