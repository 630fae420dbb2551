// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Derived per-object fields: screen position and proximity
//!
//! Raw detections carry only a box and a class; the API reports where the
//! object sits horizontally (Left/Center/Right thirds of the frame) and how
//! close it appears to be (box height relative to frame height).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vision::detector::{Detector, RawDetection};

/// Coarse horizontal zone of an object's box center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Position {
    /// Classify a horizontal center coordinate into a frame third
    ///
    /// With `T = frame_width / 3` (integer division): centers left of `T`
    /// are Left, centers right of `2T` are Right, everything else -
    /// including the boundary values themselves - is Center.
    pub fn from_center(center: i64, frame_width: u32) -> Self {
        let third = i64::from(frame_width) / 3;
        if center < third {
            Position::Left
        } else if center > 2 * third {
            Position::Right
        } else {
            Position::Center
        }
    }
}

/// Proximity heuristic: bounding-box height relative to frame height
///
/// Taller boxes are assumed closer to the camera. The value is not clamped;
/// a detector-reported box with `y2 < y1` yields a negative value and is
/// passed through unchanged.
pub fn proximity(y1: i64, y2: i64, frame_height: u32) -> f32 {
    let box_height = y2 - y1;
    box_height as f32 / frame_height as f32
}

/// One detected object as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label
    pub name: String,
    /// Horizontal zone of the box center
    pub position: Position,
    /// Closeness estimate, larger is closer
    pub proximity: f32,
}

impl DetectedObject {
    /// Derive the reported fields from one raw detection
    ///
    /// Box coordinates are truncated to integers before derivation; the
    /// horizontal center is `floor((x1 + x2) / 2)`.
    pub fn from_raw(
        raw: &RawDetection,
        name: impl Into<String>,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let x1 = raw.x1 as i64;
        let y1 = raw.y1 as i64;
        let x2 = raw.x2 as i64;
        let y2 = raw.y2 as i64;

        let center = (x1 + x2).div_euclid(2);

        Self {
            name: name.into(),
            position: Position::from_center(center, frame_width),
            proximity: proximity(y1, y2, frame_height),
        }
    }
}

/// A raw detection referenced a class index outside the detector's table
#[derive(Debug, Error)]
#[error("Unknown class index {index}")]
pub struct UnknownClassError {
    pub index: usize,
}

/// Build the reported object list from the detector's raw output
///
/// Resolves each class index through the detector's lookup table, derives
/// position and proximity against the frame dimensions, and sorts the
/// result by descending proximity (closest first).
pub fn annotate_detections(
    detections: &[RawDetection],
    frame_width: u32,
    frame_height: u32,
    detector: &dyn Detector,
) -> Result<Vec<DetectedObject>, UnknownClassError> {
    let mut objects = Vec::with_capacity(detections.len());

    for raw in detections {
        let name = detector
            .class_name(raw.class_index)
            .ok_or(UnknownClassError {
                index: raw.class_index,
            })?;
        objects.push(DetectedObject::from_raw(
            raw,
            name,
            frame_width,
            frame_height,
        ));
    }

    objects.sort_by(|a, b| {
        b.proximity
            .partial_cmp(&a.proximity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(objects)
}
