use std::time::Duration;

use anyhow::{anyhow, Result};
use image::{ImageFormat, RgbImage};
use tracing::debug;
use v4l::buffer::Type;
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::CaptureDevice;
use crate::domain::{
    camera::{CameraId, CaptureSettings, EffectiveCapture},
    errors::ReadError,
    frame::Frame,
};

/// Pixel formats this pipeline can decode, in preference order.
pub const SUPPORTED_FOURCCS: [&str; 2] = ["MJPG", "YUYV"];

/// An open V4L2 capture node with a memory-mapped stream.
pub struct V4l2Device {
    // Declared before `device` so the stream is torn down first.
    stream: Option<Stream<'static>>,
    device: Device,
    fourcc: FourCC,
    effective: EffectiveCapture,
    next_sequence: u64,
}

impl V4l2Device {
    /// Opens `/dev/video{index}` asking for `fourcc`, then applies `settings`.
    pub fn open(index: u32, fourcc: &str, settings: &CaptureSettings) -> Result<Self> {
        let id = CameraId::from_index(index);
        let device = Device::with_path(&id.path)?;

        let b = fourcc.as_bytes();
        if b.len() != 4 {
            return Err(anyhow!("FourCC must have 4 characters"));
        }
        let wanted = FourCC::new(&[b[0], b[1], b[2], b[3]]);

        let mut fmt = device.format()?;
        fmt.fourcc = wanted;
        let applied = device.set_format(&fmt)?;
        if applied.fourcc != wanted {
            return Err(anyhow!("{} does not support {}", id.path, fourcc));
        }

        let mut dev = Self {
            stream: None,
            device,
            fourcc: applied.fourcc,
            effective: EffectiveCapture {
                index,
                path: id.path,
                backend: fourcc.to_string(),
                width: applied.width,
                height: applied.height,
                fps: settings.fps,
                buffer_depth: settings.buffer_depth,
            },
            next_sequence: 0,
        };
        dev.configure(settings);
        if dev.stream.is_none() {
            return Err(anyhow!("could not start streaming on {}", dev.effective.path));
        }
        Ok(dev)
    }

    fn decode(&self, data: &[u8]) -> Result<RgbImage> {
        let fcc_str = self.fourcc.str().map_err(|_| anyhow!("invalid FourCC"))?;
        match fcc_str {
            "MJPG" => {
                // MJPG frames are standalone JPEGs
                let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
                Ok(img.to_rgb8())
            }
            "YUYV" => Ok(yuyv_to_rgb(data, self.effective.width, self.effective.height)),
            _ => Err(anyhow!("camera format {} is not supported", fcc_str)),
        }
    }
}

impl CaptureDevice for V4l2Device {
    fn configure(&mut self, settings: &CaptureSettings) -> EffectiveCapture {
        // The stream holds the buffers; formats can only change while it is down.
        self.stream = None;

        // 1. Resolution (the driver snaps to the closest supported size)
        match self.device.format() {
            Ok(mut fmt) => {
                fmt.fourcc = self.fourcc;
                fmt.width = settings.width;
                fmt.height = settings.height;
                match self.device.set_format(&fmt) {
                    Ok(actual) => {
                        self.effective.width = actual.width;
                        self.effective.height = actual.height;
                    }
                    Err(e) => debug!("{}: resolution {}x{} rejected: {}", self.effective.path, settings.width, settings.height, e),
                }
            }
            Err(e) => debug!("{}: cannot read format: {}", self.effective.path, e),
        }

        // 2. Frame interval
        match self.device.params() {
            Ok(mut params) => {
                params.interval.numerator = 1;
                params.interval.denominator = settings.fps.max(1);
                match self.device.set_params(&params) {
                    Ok(actual) if actual.interval.numerator > 0 => {
                        self.effective.fps = actual.interval.denominator / actual.interval.numerator;
                    }
                    Ok(_) => {}
                    Err(e) => debug!("{}: {} fps rejected: {}", self.effective.path, settings.fps, e),
                }
            }
            Err(e) => debug!("{}: cannot read stream params: {}", self.effective.path, e),
        }

        // 3. Buffers (MMAP)
        let depth = settings.buffer_depth.max(1);
        match Stream::with_buffers(&self.device, Type::VideoCapture, depth) {
            Ok(mut stream) => {
                stream.set_timeout(Duration::from_millis(settings.read_timeout_ms));
                self.stream = Some(stream);
                self.effective.buffer_depth = depth;
            }
            Err(e) => debug!("{}: cannot map {} buffers: {}", self.effective.path, depth, e),
        }

        self.effective.clone()
    }

    fn read(&mut self) -> Result<Frame, ReadError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ReadError::Transient("stream not running".into()))?;
        let data = {
            let (data, _) = stream.next().map_err(|e| ReadError::Transient(e.to_string()))?;
            data.to_vec()
        };
        let rgb = self.decode(&data).map_err(|e| ReadError::Transient(e.to_string()))?;
        self.next_sequence += 1;
        Ok(Frame::new(self.next_sequence, rgb))
    }

    fn effective(&self) -> &EffectiveCapture {
        &self.effective
    }
}

/// Converts a packed YUYV (YUV 4:2:2) buffer to RGB.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    // Every 4 bytes hold two pixels: [Y0, U, Y1, V]
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let y0 = chunk[0] as f32;
        let u  = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v  = chunk[3] as f32 - 128.0;

        // BT.601
        let r0 = (y0 + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g0 = (y0 - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
        let b0 = (y0 + 1.772 * u).clamp(0.0, 255.0) as u8;

        let r1 = (y1 + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g1 = (y1 - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
        let b1 = (y1 + 1.772 * u).clamp(0.0, 255.0) as u8;

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w.max(1);
        let y = pixel_idx / w.max(1);

        if y < h {
            out.put_pixel(x, y, image::Rgb([r0, g0, b0]));
            if x + 1 < w {
                out.put_pixel(x + 1, y, image::Rgb([r1, g1, b1]));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_grey_maps_to_grey() {
        let data = vec![128u8, 128, 128, 128, 16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&data, 4, 1);
        assert_eq!(rgb.get_pixel(0, 0).0, [128, 128, 128]);
        assert_eq!(rgb.get_pixel(2, 0).0, [16, 16, 16]);
        assert_eq!(rgb.get_pixel(3, 0).0, [235, 235, 235]);
    }

    #[test]
    fn short_buffers_leave_the_rest_black() {
        let rgb = yuyv_to_rgb(&[200, 128, 200, 128], 4, 2);
        assert_eq!(rgb.get_pixel(1, 0).0, [200, 200, 200]);
        assert_eq!(rgb.get_pixel(0, 1).0, [0, 0, 0]);
    }
}
