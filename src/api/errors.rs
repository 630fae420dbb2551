// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect pipeline error type

use thiserror::Error;

use crate::camera::CameraError;
use crate::detection::UnknownClassError;
use crate::vision::frame::FrameError;

/// Any failure along the fetch-decode-detect-derive pipeline
///
/// All variants collapse into the flat `{"error": ...}` payload at the
/// handler boundary; the message text is the only distinction the caller
/// sees. No retries, no partial results.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Inference failed: {0}")]
    Inference(#[from] anyhow::Error),

    #[error(transparent)]
    UnknownClass(#[from] UnknownClassError),
}
