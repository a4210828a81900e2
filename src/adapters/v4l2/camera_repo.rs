use async_trait::async_trait;
use tracing::debug;
use v4l::video::Capture;
use v4l::Device;
use crate::application::ports::CameraCatalogPort;
use crate::domain::camera::*;
use crate::domain::errors::{DomainError, DomainResult};

/// Enumerates `/dev/video*` nodes that answer a capability query.
pub struct V4l2CameraCatalog;
impl V4l2CameraCatalog { pub fn new() -> Self { Self } }

impl Default for V4l2CameraCatalog {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl CameraCatalogPort for V4l2CameraCatalog {
    async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        let nodes = v4l::context::enum_devices();
        let found = nodes.len();
        let mut out = Vec::new();
        for node in nodes {
            let path = node.path().to_string_lossy().to_string();
            let caps = Device::with_path(&path).and_then(|dev| dev.query_caps());
            match caps {
                Ok(caps) => out.push(CameraInfo {
                    id: CameraId { path },
                    name: node.name().unwrap_or_else(|| "Unknown".to_string()),
                    driver: caps.driver,
                    card: caps.card,
                    bus: caps.bus,
                }),
                Err(e) => debug!("{}: capability query failed: {}", path, e),
            }
        }
        summarize(found, out)
    }
}

/// Nodes that exist but none of which can be queried (permissions, busy
/// driver) are an error; no nodes at all is an empty list.
fn summarize(found: usize, mut cameras: Vec<CameraInfo>) -> DomainResult<Vec<CameraInfo>> {
    if found > 0 && cameras.is_empty() {
        return Err(DomainError::OperationFailed(format!(
            "{} video nodes found but none could be queried",
            found
        )));
    }
    cameras.sort_by_key(|c| (c.id.index(), c.id.path.clone()));
    Ok(cameras)
}
