// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use camsense_node::{
    api::{start_server, AppState},
    camera::CameraClient,
    config::NodeConfig,
    vision::detector::{classes, YoloDetector},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Camsense Node...\n");
    println!("📦 BUILD VERSION: {}", camsense_node::version::VERSION);
    println!("📅 Build Date: {}", camsense_node::version::BUILD_DATE);
    println!();

    let config = NodeConfig::from_env();
    tracing::info!("Camera URL: {}", config.camera_url);
    tracing::info!("Model path: {}", config.model_path.display());
    tracing::info!("Confidence threshold: {}", config.confidence_threshold);

    // Class table: file override or the built-in COCO list
    let class_names = match &config.classes_path {
        Some(path) => classes::read_classes_file(path)
            .with_context(|| format!("Failed to read classes file {}", path.display()))?,
        None => classes::default_class_names(),
    };
    tracing::info!("Class table: {} entries", class_names.len());

    // The node is useless without its model; loading failures are fatal
    let detector = YoloDetector::new(
        &config.model_path,
        class_names,
        config.confidence_threshold,
    )
    .context("Failed to load detection model")?;

    let camera = CameraClient::new(&config.camera_url, config.fetch_timeout)
        .context("Failed to configure camera client")?;

    let state = AppState::new(Arc::new(detector), Arc::new(camera));

    println!("✅ Node initialized, starting API server on port {}\n", config.api_port);

    start_server(state, config.api_port)
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {e}"))?;

    Ok(())
}
