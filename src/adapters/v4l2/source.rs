use anyhow::Result;
use tracing::{debug, info, warn};

use crate::adapters::v4l2::capture::{V4l2Device, SUPPORTED_FOURCCS};
use crate::application::ports::{CaptureDevice, FrameSource};
use crate::domain::{camera::CaptureSettings, errors::OpenError};

/// Indices tried after the preferred one.
pub const FALLBACK_INDICES: [u32; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub index: u32,
    pub backend: &'static str,
}

/// Preferred index first, then the fallbacks (deduplicated), each crossed
/// with every supported pixel format.
pub fn candidates(preferred: u32, fallback: &[u32]) -> Vec<Candidate> {
    let mut indices = vec![preferred];
    for &i in fallback {
        if !indices.contains(&i) {
            indices.push(i);
        }
    }
    indices
        .into_iter()
        .flat_map(|index| SUPPORTED_FOURCCS.iter().map(move |&backend| Candidate { index, backend }))
        .collect()
}

/// Walks `candidates` and keeps the first handle that opens and delivers a
/// real frame. Handles that open but stay silent are dropped on the spot.
pub fn open_first_working<F>(candidates: &[Candidate], mut open: F) -> Result<Box<dyn CaptureDevice>, OpenError>
where
    F: FnMut(&Candidate) -> Result<Box<dyn CaptureDevice>>,
{
    for candidate in candidates {
        let mut device = match open(candidate) {
            Ok(device) => device,
            Err(e) => {
                debug!("camera {} via {} did not open: {}", candidate.index, candidate.backend, e);
                continue;
            }
        };
        match device.read() {
            Ok(_) => {
                let eff = device.effective();
                info!(
                    "📷 Camera {} open via {} ({}x{} @ {} fps, {} buffers)",
                    eff.path, eff.backend, eff.width, eff.height, eff.fps, eff.buffer_depth
                );
                return Ok(device);
            }
            Err(e) => {
                warn!("camera {} via {} opened but gave no frame: {}", candidate.index, candidate.backend, e);
            }
        }
    }
    Err(OpenError::NoDeviceAvailable { tried: candidates.len() })
}

pub struct V4l2FrameSource {
    fallback: Vec<u32>,
}

impl V4l2FrameSource {
    pub fn new() -> Self {
        Self { fallback: FALLBACK_INDICES.to_vec() }
    }
}

impl Default for V4l2FrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for V4l2FrameSource {
    fn open(&self, preferred_index: u32, settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>, OpenError> {
        let list = candidates(preferred_index, &self.fallback);
        open_first_working(&list, |c| {
            let device = V4l2Device::open(c.index, c.backend, settings)?;
            Ok(Box::new(device) as Box<dyn CaptureDevice>)
        })
    }
}
