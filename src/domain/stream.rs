use serde::{Deserialize, Serialize};

use super::detection::Algorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Idle,
    Starting,
    Streaming,
    Stopping,
    Failed,
}

impl Default for ControllerState {
    fn default() -> Self {
        ControllerState::Idle
    }
}

/// Snapshot served by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub count: usize,
    /// Wall-clock time of the snapshot, `HH:MM:SS`.
    pub timestamp: String,
    pub is_streaming: bool,
    pub detection_active: bool,
    pub algorithm: Algorithm,
    pub active_sessions: usize,
    pub state: ControllerState,
    pub sequence: Option<u64>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Why the latest frame was published with a zero count, if it failed.
    pub detection_error: Option<String>,
}
