use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use contour_cam::adapters::{
    http::{router, state::HttpState},
    standard_detectors,
    v4l2::{V4l2CameraCatalog, V4l2FrameSource},
};
use contour_cam::application::{
    controller::CameraController, services::CameraService, sessions::SessionRegistry,
};
use contour_cam::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logs (RUST_LOG wins, info otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(AppConfig::parse());
    tracing::info!("🔧 Wiring adapters...");

    // 2. Adapters
    let source = Arc::new(V4l2FrameSource::new());
    let catalog = Arc::new(V4l2CameraCatalog::new());
    let detectors = Arc::new(standard_detectors(config.inference()));

    // 3. Use cases
    let sessions = Arc::new(SessionRegistry::new(config.camera_policy(), config.session_timeout()));
    let controller = Arc::new(CameraController::new(
        source,
        detectors,
        sessions.clone(),
        config.controller(),
    ));
    let cameras = Arc::new(CameraService::new(catalog));

    // 4. HTTP
    let state = HttpState {
        controller: controller.clone(),
        sessions,
        cameras,
        config: config.clone(),
    };
    let app = router(state);

    let addr = config.bind_addr();
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("📂 Static files served from {}", config.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 5. Release the camera before exiting
    tokio::task::spawn_blocking(move || controller.shutdown()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
