// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Version information for the Camsense Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-still-frame-detection-2026-08-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-04";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Camsense Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
