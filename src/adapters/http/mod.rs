pub mod routes;
pub mod state;
pub mod stream;

use axum::{routing::{get, post}, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .route("/api/camera/start", post(routes::start_camera))
        .route("/api/camera/stop", post(routes::stop_camera))
        .route("/api/detection/start", post(routes::start_detection))
        .route("/api/detection/stop", post(routes::stop_detection))
        .route("/api/algorithm/change", post(routes::change_algorithm))
        .route("/api/status", get(routes::status))
        .route("/api/video/frame", get(routes::video_frame))
        .route("/api/video/stream", get(stream::video_stream))
        .route("/api/device/register", post(routes::register_device))
        .route("/api/device/sessions", get(routes::list_sessions))
        .route("/api/cameras", get(routes::list_cameras))
        .route("/api/config", get(routes::get_config))
        .with_state(state)
        // Dashboard assets
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
