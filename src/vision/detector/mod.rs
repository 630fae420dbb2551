// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection over decoded camera frames
//!
//! The request handler depends on the [`Detector`] trait rather than a
//! concrete model, so it can be exercised with a substitute detector in
//! tests. The production implementation is [`YoloDetector`], a YOLOv8
//! network run through ONNX Runtime.

pub mod classes;
pub mod yolo;

pub use classes::{read_classes_file, COCO_CLASSES};
pub use yolo::YoloDetector;

use anyhow::Result;
use image::DynamicImage;

/// A single raw detection from the model
///
/// Box coordinates are in pixel space of the original frame, top-left
/// origin, corner format (x1,y1 top-left, x2,y2 bottom-right).
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Detection confidence score (0.0-1.0)
    pub score: f32,
    /// Index into the model's class table
    pub class_index: usize,
}

impl RawDetection {
    /// Area of the bounding box (zero for degenerate boxes)
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection-over-union with another box
    pub fn intersection_over_union(&self, other: &RawDetection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Interface to an object detection model
///
/// The model is loaded once at process start and shared read-only for the
/// process lifetime; `detect` must be safe to call from concurrent requests.
pub trait Detector: Send + Sync {
    /// Model name, for logging and the health endpoint
    fn name(&self) -> &str;

    /// Run detection on a decoded frame
    ///
    /// Returns raw detections in original frame pixel space.
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<RawDetection>>;

    /// Resolve a class index to a human-readable label
    fn class_name(&self, class_index: usize) -> Option<&str>;
}

/// Non-maximum suppression to remove duplicate detections
///
/// Detections are sorted by descending confidence; a box is suppressed when
/// a higher-confidence box of the same class overlaps it above
/// `iou_threshold`.
pub fn non_maximum_suppression(
    mut detections: Vec<RawDetection>,
    iou_threshold: f32,
) -> Vec<RawDetection> {
    detections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = vec![true; detections.len()];
    for i in 0..detections.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..detections.len() {
            if !keep[j] {
                continue;
            }
            if detections[i].class_index != detections[j].class_index {
                continue;
            }
            if detections[i].intersection_over_union(&detections[j]) > iou_threshold {
                keep[j] = false;
            }
        }
    }

    let mut index = 0;
    detections.retain(|_| {
        let kept = keep[index];
        index += 1;
        kept
    });
    detections
}
