// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::detection::DetectedObject;

/// Error payload: `{"error": "<message>"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of a GET /detect response
///
/// Success is a bare JSON array of detected objects ordered by descending
/// proximity; failure is an object with a single `error` key. Both are
/// served with status 200 - callers distinguish by payload shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DetectResponse {
    Objects(Vec<DetectedObject>),
    Failure(ErrorBody),
}

impl DetectResponse {
    /// Build the failure shape from any displayable error
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(ErrorBody {
            error: message.into(),
        })
    }
}
