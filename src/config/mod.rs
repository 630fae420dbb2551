// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default camera capture URL (ESP32-CAM style still-frame endpoint)
pub const DEFAULT_CAMERA_URL: &str = "http://192.168.205.210/capture";

/// Default API listen port
pub const DEFAULT_API_PORT: u16 = 5000;

/// Default detection model path
pub const DEFAULT_MODEL_PATH: &str = "./models/yolov8n.onnx";

/// Default confidence threshold for detections
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Default upstream fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the node
///
/// All values come from environment variables with deployment defaults.
/// Invalid numeric values fall back to the default rather than aborting.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Still-frame capture URL of the upstream camera
    pub camera_url: String,
    /// Port the HTTP API listens on (all interfaces)
    pub api_port: u16,
    /// Path to the ONNX detection model
    pub model_path: PathBuf,
    /// Optional path to a class-names file (one name per line);
    /// the built-in COCO table is used when unset
    pub classes_path: Option<PathBuf>,
    /// Minimum confidence for a detection to be reported
    pub confidence_threshold: f32,
    /// Timeout applied to the camera fetch
    pub fetch_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            camera_url: DEFAULT_CAMERA_URL.to_string(),
            api_port: DEFAULT_API_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            classes_path: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl NodeConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Self {
        let camera_url =
            env::var("CAMERA_URL").unwrap_or_else(|_| DEFAULT_CAMERA_URL.to_string());

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_API_PORT);

        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let classes_path = env::var("CLASSES_PATH").ok().map(PathBuf::from);

        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);

        let fetch_timeout_secs = env::var("FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        Self {
            camera_url,
            api_port,
            model_path,
            classes_path,
            confidence_threshold,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
        }
    }
}
