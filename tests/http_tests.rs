//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::{Request, StatusCode}, Router};
use clap::Parser;
use http_body_util::BodyExt;
use image::RgbImage;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::controller_with;
use contour_cam::adapters::http::{router, state::HttpState};
use contour_cam::application::{controller::CameraController, ports::CameraCatalogPort, services::CameraService};
use contour_cam::config::AppConfig;
use contour_cam::domain::{
    camera::{CameraId, CameraInfo},
    detection::Algorithm,
    errors::{DomainError, DomainResult},
};

struct OneCamera;

#[async_trait]
impl CameraCatalogPort for OneCamera {
    async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        Ok(vec![CameraInfo {
            id: CameraId::from_index(2),
            name: "Test Cam".into(),
            card: "Test Cam".into(),
            driver: "uvcvideo".into(),
            bus: "usb-0000:00:14.0-1".into(),
        }])
    }
}

struct Unreadable;

#[async_trait]
impl CameraCatalogPort for Unreadable {
    async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        Err(DomainError::OperationFailed("1 video nodes found but none could be queried".into()))
    }
}

fn app_with(catalog: Arc<dyn CameraCatalogPort>) -> (Router, Arc<CameraController>) {
    let (controller, _, sessions) = controller_with(RgbImage::new(32, 24));
    let state = HttpState {
        controller: controller.clone(),
        sessions,
        cameras: Arc::new(CameraService::new(catalog)),
        config: Arc::new(AppConfig::parse_from(["contour-cam"])),
    };
    (router(state), controller)
}

fn app() -> (Router, Arc<CameraController>) {
    app_with(Arc::new(OneCamera))
}

fn sequence_of(part: &[u8]) -> u64 {
    let text = String::from_utf8_lossy(part);
    text.lines()
        .find_map(|l| l.strip_prefix("X-Sequence: "))
        .and_then(|v| v.trim().parse().ok())
        .expect("part carries X-Sequence")
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn frame_is_null_before_start() {
    let (app, _) = app();
    let (status, body) = call(&app, "GET", "/api/video/frame", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "frame": null }));
}

#[tokio::test]
async fn start_twice_conflicts_and_stop_succeeds() {
    let (app, controller) = app();

    let (status, body) = call(&app, "POST", "/api/camera/start", None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["capture"]["capture"]["width"], 32);

    let (status, body) = call(&app, "POST", "/api/camera/start", Some(json!({ "cameraIndex": 1 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = call(&app, "POST", "/api/camera/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(!controller.is_streaming());

    let (_, body) = call(&app, "GET", "/api/video/frame", None).await;
    assert_eq!(body["frame"], Value::Null);
}

#[tokio::test]
async fn frames_are_served_as_data_urls_once_streaming() {
    let (app, controller) = app();
    call(&app, "POST", "/api/camera/start", None).await;

    let mut frame = Value::Null;
    for _ in 0..200 {
        let (_, body) = call(&app, "GET", "/api/video/frame", None).await;
        frame = body["frame"].clone();
        if !frame.is_null() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(frame.as_str().unwrap().starts_with("data:image/jpeg;base64,"));

    tokio::task::spawn_blocking(move || controller.stop()).await.unwrap();
}

#[tokio::test]
async fn unknown_algorithm_is_a_bad_request() {
    let (app, _) = app();

    let (status, body) = call(&app, "POST", "/api/algorithm/change", Some(json!({ "algorithm": "bogus" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, "POST", "/api/algorithm/change", Some(json!({ "algorithm": "algorithm1" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status_body) = call(&app, "GET", "/api/status", None).await;
    assert_eq!(status_body["algorithm"], "otsu");
    assert_eq!(status_body["isStreaming"], false);
    assert_eq!(status_body["detectionActive"], false);
    assert_eq!(status_body["state"], "idle");
}

#[tokio::test]
async fn detection_toggles_show_up_in_status() {
    let (app, _) = app();
    let (_, body) = call(&app, "POST", "/api/detection/start", None).await;
    assert_eq!(body["success"], true);
    let (_, status) = call(&app, "GET", "/api/status", None).await;
    assert_eq!(status["detectionActive"], true);

    call(&app, "POST", "/api/detection/stop", None).await;
    let (_, status) = call(&app, "GET", "/api/status", None).await;
    assert_eq!(status["detectionActive"], false);
}

#[tokio::test]
async fn device_registration_assigns_camera_indices() {
    let (app, _) = app();

    let (_, desktop) = call(&app, "POST", "/api/device/register", Some(json!({ "deviceType": "desktop", "userAgent": "Firefox" }))).await;
    assert_eq!(desktop["preferredCameraIndex"], 1);
    assert!(!desktop["deviceId"].as_str().unwrap().is_empty());

    let (_, mobile) = call(&app, "POST", "/api/device/register", Some(json!({ "deviceType": "mobile", "userAgent": "Safari", "deviceId": "phone-1" }))).await;
    assert_eq!(mobile["preferredCameraIndex"], 0);
    assert_eq!(mobile["deviceId"], "phone-1");

    let (_, sessions) = call(&app, "GET", "/api/device/sessions", None).await;
    assert_eq!(sessions["count"], 2);

    let (_, status) = call(&app, "GET", "/api/status?deviceId=phone-1", None).await;
    assert_eq!(status["activeSessions"], 2);
}

#[tokio::test]
async fn cameras_and_config_are_listed() {
    let (app, _) = app();

    let (status, cameras) = call(&app, "GET", "/api/cameras", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cameras[0]["index"], 2);
    assert_eq!(cameras[0]["path"], "/dev/video2");
    assert_eq!(cameras[0]["name"], "Test Cam");

    let (_, config) = call(&app, "GET", "/api/config", None).await;
    assert_eq!(config["port"], 8000);
    assert_eq!(config["jpegQuality"], 80);
    assert_eq!(config["algorithm"], "canny");
}

#[tokio::test]
async fn camera_enumeration_failure_is_a_server_error() {
    let (app, _) = app_with(Arc::new(Unreadable));
    let (status, body) = call(&app, "GET", "/api/cameras", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("none could be queried"));
}

#[tokio::test]
async fn mjpeg_stream_sends_each_new_frame_once() {
    let (app, controller) = app();
    call(&app, "POST", "/api/camera/start", None).await;

    let req = Request::builder().uri("/api/video/stream").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "multipart/x-mixed-replace; boundary=frame");

    let mut body = resp.into_body();
    let mut sequences = Vec::new();
    while sequences.len() < 2 {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("a part within the deadline")
            .expect("stream still open")
            .unwrap();
        let part = frame.into_data().unwrap();
        assert!(part.starts_with(b"--frame\r\n"));
        let header_end = part.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        assert_eq!(&part[header_end + 4..header_end + 6], &[0xFF, 0xD8]);
        sequences.push(sequence_of(&part));
    }
    assert!(sequences[0] < sequences[1], "sequence re-sent: {:?}", sequences);

    drop(body);
    tokio::task::spawn_blocking(move || controller.stop()).await.unwrap();
}

#[tokio::test]
async fn status_reports_why_detection_returned_zero() {
    let (app, controller) = app();
    controller.select_algorithm(Algorithm::Learned);
    call(&app, "POST", "/api/detection/start", None).await;
    call(&app, "POST", "/api/camera/start", None).await;

    let mut status = Value::Null;
    for _ in 0..200 {
        status = call(&app, "GET", "/api/status", None).await.1;
        if status["detectionError"].is_string() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(status["detectionError"].as_str().unwrap().contains("unavailable"));
    assert_eq!(status["count"], 0);

    tokio::task::spawn_blocking(move || controller.stop()).await.unwrap();
}
