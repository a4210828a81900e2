use axum::{extract::{Query, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use tracing::error;
use crate::adapters::http::state::HttpState;
use crate::adapters::http::stream::{data_url, encode_jpeg};
use crate::application::dto::*;
use crate::domain::{errors::StartError, session::DeviceType};

pub async fn start_camera(State(st): State<HttpState>, body: Option<Json<StartCameraRequest>>) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let controller = st.controller.clone();
    // Opening the device and probing it blocks.
    let joined = tokio::task::spawn_blocking(move || {
        controller.start(req.camera_index, req.device_id.as_deref())
    }).await;

    match joined {
        Ok(Ok(report)) => {
            let message = format!("Camera started on {}", report.capture.path);
            Json(ActionResponse { success: true, message, capture: Some(report) }).into_response()
        }
        Ok(Err(StartError::AlreadyRunning)) => {
            (StatusCode::CONFLICT, Json(ActionResponse::failed("Camera is already running"))).into_response()
        }
        Ok(Err(e)) => {
            (StatusCode::BAD_REQUEST, Json(ActionResponse::failed(format!("Failed to start camera: {}", e)))).into_response()
        }
        Err(e) => {
            error!("start task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ActionResponse::failed("Failed to start camera"))).into_response()
        }
    }
}

pub async fn stop_camera(State(st): State<HttpState>) -> Response {
    let controller = st.controller.clone();
    match tokio::task::spawn_blocking(move || controller.stop()).await {
        Ok(()) => Json(ActionResponse::ok("Camera stopped")).into_response(),
        Err(e) => {
            error!("stop task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ActionResponse::failed("Failed to stop camera"))).into_response()
        }
    }
}

pub async fn start_detection(State(st): State<HttpState>) -> impl IntoResponse {
    st.controller.set_detection_active(true);
    Json(ActionResponse::ok("Detection started"))
}

pub async fn stop_detection(State(st): State<HttpState>) -> impl IntoResponse {
    st.controller.set_detection_active(false);
    Json(ActionResponse::ok("Detection stopped"))
}

pub async fn change_algorithm(State(st): State<HttpState>, Json(req): Json<ChangeAlgorithmRequest>) -> Response {
    match st.controller.set_algorithm(&req.algorithm) {
        Ok(algorithm) => Json(ActionResponse::ok(format!("Algorithm changed to {}", algorithm))).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ActionResponse::failed(e.to_string()))).into_response(),
    }
}

pub async fn status(State(st): State<HttpState>, Query(q): Query<StatusQuery>) -> impl IntoResponse {
    Json(st.controller.status(q.device_id.as_deref()))
}

/// Latest annotated frame as a data URL. `null` until something is published.
pub async fn video_frame(State(st): State<HttpState>) -> impl IntoResponse {
    // The Arc is cloned out of the slot; encoding happens without the lock.
    let frame = st.controller.latest().and_then(|result| {
        match encode_jpeg(result.annotated.image(), st.config.jpeg_quality) {
            Ok(jpeg) => Some(data_url(&jpeg)),
            Err(e) => {
                error!("frame {}: {}", result.sequence, e);
                None
            }
        }
    });
    Json(FrameResponse { frame })
}

pub async fn register_device(State(st): State<HttpState>, Json(req): Json<RegisterDeviceRequest>) -> impl IntoResponse {
    let session = st.sessions.register(
        DeviceType::parse(&req.device_type),
        &req.user_agent,
        req.device_id.as_deref(),
    );
    Json(RegisterDeviceResponse {
        device_id: session.device_id,
        message: "Device registered successfully".into(),
        preferred_camera_index: session.preferred_camera_index,
    })
}

pub async fn list_sessions(State(st): State<HttpState>) -> impl IntoResponse {
    let sessions = st.sessions.list();
    let count = sessions.len();
    Json(SessionsResponse { sessions, count })
}

pub async fn list_cameras(State(st): State<HttpState>) -> Response {
    match st.cameras.list_cameras().await {
        Ok(cameras) => {
            let res: Vec<CameraEntry> = cameras.into_iter().map(|c| CameraEntry {
                index: c.id.index(),
                name: c.name,
                card: c.card,
                path: c.id.path,
                driver: c.driver,
                bus: c.bus,
            }).collect();
            Json(res).into_response()
        },
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false, "message": e.to_string() }))).into_response(),
    }
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.config.as_ref().clone())
}
