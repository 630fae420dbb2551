// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client for fetching still frames from the upstream camera
//!
//! The camera is an ESP32-CAM style device: a plain GET against its capture
//! URL returns one encoded still image. One fetch per detection request, no
//! retries.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Errors from the camera fetch path
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Invalid camera URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Failed to fetch frame from camera: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("Camera returned status {0}")]
    BadStatus(StatusCode),

    #[error("Camera returned an empty body")]
    EmptyBody,
}

/// Client for the camera's still-frame capture endpoint
#[derive(Debug, Clone)]
pub struct CameraClient {
    client: Client,
    capture_url: Url,
}

impl CameraClient {
    /// Create a new camera client with a bounded request timeout
    pub fn new(capture_url: &str, timeout: Duration) -> Result<Self, CameraError> {
        let capture_url = Url::parse(capture_url).map_err(|source| CameraError::InvalidUrl {
            url: capture_url.to_string(),
            source,
        })?;

        let client = Client::builder().timeout(timeout).build()?;

        info!(
            "Camera client configured: url={}, timeout={}s",
            capture_url,
            timeout.as_secs()
        );

        Ok(Self {
            client,
            capture_url,
        })
    }

    /// The configured capture URL
    pub fn capture_url(&self) -> &str {
        self.capture_url.as_str()
    }

    /// Fetch one encoded still frame from the camera
    ///
    /// Issues a single GET against the capture URL and returns the raw body
    /// bytes. Connection failures, timeouts, non-success statuses and empty
    /// bodies all surface as `CameraError`.
    pub async fn fetch_frame(&self) -> Result<Vec<u8>, CameraError> {
        debug!("Fetching frame from {}", self.capture_url);

        let response = self.client.get(self.capture_url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CameraError::BadStatus(status));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(CameraError::EmptyBody);
        }

        debug!("Fetched {} bytes from camera", bytes.len());

        Ok(bytes.to_vec())
    }
}
