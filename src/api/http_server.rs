// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server and routing

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};

use super::detect::detect_handler;
use crate::camera::CameraClient;
use crate::version;
use crate::vision::detector::Detector;

/// Shared per-request state
///
/// The detector is loaded once at startup and handed to every request as a
/// read-only handle; the camera client is reused for its connection pool.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn Detector>,
    pub camera: Arc<CameraClient>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>, camera: Arc<CameraClient>) -> Self {
        Self { detector, camera }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Object detection endpoint
        .route("/detect", get(detect_handler))
        // Health check
        .route("/health", get(health_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind all interfaces on the given port and serve until shutdown
pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::response::Json(json!({
        "status": "ok",
        "model": state.detector.name(),
        "camera": state.camera.capture_url(),
        "version": version::VERSION_NUMBER,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::detector::RawDetection;
    use anyhow::Result;
    use image::DynamicImage;
    use std::time::Duration;

    struct StubDetector;

    impl Detector for StubDetector {
        fn name(&self) -> &str {
            "stub-model"
        }

        fn detect(&self, _frame: &DynamicImage) -> Result<Vec<RawDetection>> {
            Ok(vec![])
        }

        fn class_name(&self, _class_index: usize) -> Option<&str> {
            None
        }
    }

    fn test_state() -> AppState {
        let camera =
            CameraClient::new("http://127.0.0.1:59999/capture", Duration::from_secs(1)).unwrap();
        AppState::new(Arc::new(StubDetector), Arc::new(camera))
    }

    #[test]
    fn test_router_builds() {
        let _router = build_router(test_state());
    }

    #[test]
    fn test_state_is_cloneable() {
        let state = test_state();
        let clone = state.clone();
        assert_eq!(clone.detector.name(), "stub-model");
    }
}
