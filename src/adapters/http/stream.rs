use std::convert::Infallible;

use anyhow::{anyhow, Result};
use async_stream::stream;
use axum::{body::{Body, Bytes}, extract::State, http::header, response::IntoResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use crate::adapters::http::state::HttpState;

pub const BOUNDARY: &str = "frame";

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|err| anyhow!("JPEG encode failed: {err}"))?;
    Ok(buffer)
}

pub fn data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

fn multipart_part(sequence: u64, jpeg: &[u8]) -> Bytes {
    let mut payload = Vec::with_capacity(jpeg.len() + 96);
    payload.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    payload.extend_from_slice(format!("X-Sequence: {}\r\n", sequence).as_bytes());
    payload.extend_from_slice(b"Content-Type: image/jpeg\r\n");
    payload.extend_from_slice(format!("Content-Length: {}\r\n\r\n", jpeg.len()).as_bytes());
    payload.extend_from_slice(jpeg);
    payload.extend_from_slice(b"\r\n");
    Bytes::from(payload)
}

/// MJPEG feed: one part per newly published frame, polled at the capture pace.
pub async fn video_stream(State(st): State<HttpState>) -> impl IntoResponse {
    let controller = st.controller.clone();
    let quality = st.config.jpeg_quality;
    let period = st.config.pacing().frame_interval();

    let parts = stream! {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_sent: Option<u64> = None;
        loop {
            ticker.tick().await;
            let result = match controller.latest() {
                Some(result) if last_sent != Some(result.sequence) => result,
                _ => continue,
            };
            last_sent = Some(result.sequence);
            match encode_jpeg(result.annotated.image(), quality) {
                Ok(jpeg) => yield Ok::<Bytes, Infallible>(multipart_part(result.sequence, &jpeg)),
                Err(e) => warn!("Skipping frame {}: {}", result.sequence, e),
            }
        }
    };

    (
        [
            (header::CONTENT_TYPE, format!("multipart/x-mixed-replace; boundary={}", BOUNDARY)),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(parts),
    )
}
