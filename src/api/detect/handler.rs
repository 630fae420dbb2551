// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, Json};
use tracing::{debug, info, warn};

use super::response::DetectResponse;
use crate::api::errors::DetectError;
use crate::api::http_server::AppState;
use crate::camera::CameraClient;
use crate::detection::{annotate_detections, DetectedObject};
use crate::vision::detector::Detector;
use crate::vision::frame::decode_frame;

/// GET /detect - Detect objects in the current camera frame
///
/// Fetches one still frame from the upstream camera, runs the detection
/// model over it and reports each detected object with its class name,
/// coarse horizontal position (Left/Center/Right) and a proximity estimate
/// derived from bounding-box height. Objects are ordered closest-first.
///
/// # Response
/// - Success: JSON array of `{"name", "position", "proximity"}` objects,
///   descending by `proximity`
/// - Failure: `{"error": "<message>"}`
///
/// Both shapes are served with status 200; callers inspect the payload
/// shape to distinguish them.
pub async fn detect_handler(State(state): State<AppState>) -> Json<DetectResponse> {
    debug!("Detection request received");

    match run_detection(&state.camera, state.detector.as_ref()).await {
        Ok(objects) => {
            info!("Detection complete: {} objects", objects.len());
            Json(DetectResponse::Objects(objects))
        }
        Err(e) => {
            warn!("Detection failed: {}", e);
            Json(DetectResponse::failure(e.to_string()))
        }
    }
}

/// Run the full fetch-decode-detect-derive pipeline once
///
/// All-or-nothing: any failure along the way aborts the request and no
/// partial results are returned.
pub async fn run_detection(
    camera: &CameraClient,
    detector: &dyn Detector,
) -> Result<Vec<DetectedObject>, DetectError> {
    // 1. One still frame from the camera
    let bytes = camera.fetch_frame().await?;

    // 2. Decode and record the frame dimensions
    let (frame, frame_info) = decode_frame(&bytes)?;
    debug!(
        "Decoded frame: {}x{}, {} bytes",
        frame_info.width, frame_info.height, frame_info.size_bytes
    );

    // 3. Run the detector
    let raw_detections = detector.detect(&frame)?;
    debug!("Detector returned {} raw detections", raw_detections.len());

    // 4. Derive position/proximity and sort closest-first
    let objects = annotate_detections(
        &raw_detections,
        frame_info.width,
        frame_info.height,
        detector,
    )?;

    Ok(objects)
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
            "stub"
        }

        fn detect(&self, _frame: &DynamicImage) -> Result<Vec<RawDetection>> {
            Ok(vec![])
        }

        fn class_name(&self, _class_index: usize) -> Option<&str> {
            Some("person")
        }
    }

    #[tokio::test]
    async fn test_run_detection_surfaces_camera_failure() {
        // Nothing listens here; the pipeline must fail with a camera error
        let camera =
            CameraClient::new("http://127.0.0.1:59999/capture", Duration::from_secs(2)).unwrap();

        let result = run_detection(&camera, &StubDetector).await;
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), DetectError::Camera(_)));
    }

    #[test]
    fn test_failure_body_carries_error_text() {
        let response = DetectResponse::failure("Camera returned an empty body");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, "{\"error\":\"Camera returned an empty body\"}");
    }
}
