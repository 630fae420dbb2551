// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 detection model via ONNX Runtime
//!
//! Loads a YOLOv8-family ONNX export and decodes its raw output into
//! per-object detections in original frame coordinates.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{non_maximum_suppression, Detector, RawDetection};
use crate::vision::preprocessing::{letterbox_to_tensor, Letterbox, MODEL_INPUT_SIZE};

/// Default IoU threshold for non-maximum suppression
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// YOLOv8 object detection model
///
/// The ONNX session is loaded once and reused for every request. The
/// underlying run call is not assumed reentrant, so inference is serialized
/// behind a mutex.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class-index to name lookup
    class_names: Vec<String>,
    /// Confidence threshold for detections
    confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression
    iou_threshold: f32,
    /// Model name for logging and the health endpoint
    model_name: String,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("class_count", &self.class_names.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detection model from an ONNX file
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file
    /// - `class_names`: Class table in model output order
    /// - `confidence_threshold`: Minimum score for a detection to be kept
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        class_names: Vec<String>,
        confidence_threshold: f32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        // Validate path exists
        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        // Load ONNX model with CPU-only execution
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detection model loaded - input: {}", input_name);

        let model_name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolov8".to_string());

        info!("✅ Detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            model_name,
        })
    }

    /// Set the IoU threshold for non-maximum suppression
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Get current confidence threshold
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

impl Detector for YoloDetector {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn detect(&self, frame: &DynamicImage) -> Result<Vec<RawDetection>> {
        let (input, geometry) = letterbox_to_tensor(frame, MODEL_INPUT_SIZE);

        // Run inference
        let mut session = self.session.lock().unwrap();

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let detections = parse_predictions(
            output.view(),
            &geometry,
            self.class_names.len(),
            self.confidence_threshold,
        )?;

        debug!("Model produced {} candidate boxes", detections.len());

        Ok(non_maximum_suppression(detections, self.iou_threshold))
    }

    fn class_name(&self, class_index: usize) -> Option<&str> {
        self.class_names.get(class_index).map(|s| s.as_str())
    }
}

/// Decode the raw YOLOv8 output tensor into detections
///
/// The model emits `[1, 4 + num_classes, N]`: per anchor a center-format box
/// (cx, cy, w, h) followed by one score per class. The best-scoring class
/// wins; anchors below the confidence threshold are dropped; surviving boxes
/// are converted to corner format and mapped back to original frame space,
/// clamped to the frame bounds.
fn parse_predictions(
    output: ArrayViewD<f32>,
    geometry: &Letterbox,
    num_classes: usize,
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] != 4 + num_classes {
        anyhow::bail!(
            "Unexpected model output shape: {:?}, expected [1, {}, N]",
            shape,
            4 + num_classes
        );
    }

    let anchors = shape[2];
    let max_x = geometry.frame_width() as f32;
    let max_y = geometry.frame_height() as f32;

    let mut detections = Vec::new();

    for n in 0..anchors {
        // Best class for this anchor
        let mut class_index = 0;
        let mut score = f32::MIN;
        for c in 0..num_classes {
            let value = output[IxDyn(&[0, 4 + c, n])];
            if value > score {
                score = value;
                class_index = c;
            }
        }

        if score < confidence_threshold {
            continue;
        }

        let cx = output[IxDyn(&[0, 0, n])];
        let cy = output[IxDyn(&[0, 1, n])];
        let w = output[IxDyn(&[0, 2, n])];
        let h = output[IxDyn(&[0, 3, n])];

        // Center format to corner format, then back to frame space
        let (x1, y1) = geometry.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.to_frame(cx + w / 2.0, cy + h / 2.0);

        detections.push(RawDetection {
            x1: x1.clamp(0.0, max_x),
            y1: y1.clamp(0.0, max_y),
            x2: x2.clamp(0.0, max_x),
            y2: y2.clamp(0.0, max_y),
            score,
            class_index,
        });
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const MODEL_PATH: &str = "./models/yolov8n.onnx";

    /// Synthetic output tensor: [1, 4 + num_classes, anchors]
    fn empty_output(num_classes: usize, anchors: usize) -> Array3<f32> {
        Array3::zeros((1, 4 + num_classes, anchors))
    }

    fn identity_geometry() -> Letterbox {
        Letterbox::fit(640, 640, MODEL_INPUT_SIZE)
    }

    #[test]
    fn test_parse_predictions_empty() {
        let output = empty_output(2, 4);
        let result =
            parse_predictions(output.view().into_dyn(), &identity_geometry(), 2, 0.25).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_predictions_decodes_box() {
        let mut output = empty_output(2, 4);
        // Anchor 0: box centered at (320, 320), 100x200, class 1 at 0.9
        output[[0, 0, 0]] = 320.0;
        output[[0, 1, 0]] = 320.0;
        output[[0, 2, 0]] = 100.0;
        output[[0, 3, 0]] = 200.0;
        output[[0, 5, 0]] = 0.9;

        let result =
            parse_predictions(output.view().into_dyn(), &identity_geometry(), 2, 0.25).unwrap();
        assert_eq!(result.len(), 1);

        let det = &result[0];
        assert_eq!(det.class_index, 1);
        assert!((det.score - 0.9).abs() < 1e-6);
        assert!((det.x1 - 270.0).abs() < 1e-3);
        assert!((det.y1 - 220.0).abs() < 1e-3);
        assert!((det.x2 - 370.0).abs() < 1e-3);
        assert!((det.y2 - 420.0).abs() < 1e-3);
    }

    #[test]
    fn test_parse_predictions_applies_confidence_threshold() {
        let mut output = empty_output(2, 2);
        output[[0, 0, 0]] = 100.0;
        output[[0, 1, 0]] = 100.0;
        output[[0, 2, 0]] = 50.0;
        output[[0, 3, 0]] = 50.0;
        output[[0, 4, 0]] = 0.2; // below threshold

        let result =
            parse_predictions(output.view().into_dyn(), &identity_geometry(), 2, 0.25).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_predictions_maps_back_to_frame_space() {
        // A 320x320 frame is scaled 2x into the 640x640 model input
        let geometry = Letterbox::fit(320, 320, MODEL_INPUT_SIZE);

        let mut output = empty_output(1, 1);
        output[[0, 0, 0]] = 320.0;
        output[[0, 1, 0]] = 320.0;
        output[[0, 2, 0]] = 200.0;
        output[[0, 3, 0]] = 200.0;
        output[[0, 4, 0]] = 0.8;

        let result = parse_predictions(output.view().into_dyn(), &geometry, 1, 0.25).unwrap();
        assert_eq!(result.len(), 1);

        let det = &result[0];
        assert!((det.x1 - 110.0).abs() < 1e-3);
        assert!((det.y1 - 110.0).abs() < 1e-3);
        assert!((det.x2 - 210.0).abs() < 1e-3);
        assert!((det.y2 - 210.0).abs() < 1e-3);
    }

    #[test]
    fn test_parse_predictions_clamps_to_frame() {
        let mut output = empty_output(1, 1);
        // Box hanging off the top-left corner
        output[[0, 0, 0]] = 10.0;
        output[[0, 1, 0]] = 10.0;
        output[[0, 2, 0]] = 100.0;
        output[[0, 3, 0]] = 100.0;
        output[[0, 4, 0]] = 0.8;

        let result =
            parse_predictions(output.view().into_dyn(), &identity_geometry(), 1, 0.25).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].x1, 0.0);
        assert_eq!(result[0].y1, 0.0);
    }

    #[test]
    fn test_parse_predictions_rejects_bad_shape() {
        let output = empty_output(5, 4);
        // Claim 2 classes against a 9-row tensor
        let result = parse_predictions(output.view().into_dyn(), &identity_geometry(), 2, 0.25);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unexpected model output shape"));
    }

    #[test]
    fn test_model_not_found_error() {
        let result = YoloDetector::new(
            "/nonexistent/path/yolov8n.onnx",
            vec!["person".to_string()],
            0.25,
        );
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    #[ignore] // Only run if model files are downloaded
    fn test_model_loading() {
        let detector = YoloDetector::new(
            MODEL_PATH,
            super::super::classes::default_class_names(),
            0.25,
        );

        if let Ok(detector) = detector {
            assert_eq!(detector.confidence_threshold(), 0.25);
            assert_eq!(detector.class_name(0), Some("person"));
        }
        // If model files don't exist, test is skipped
    }

    #[test]
    #[ignore] // Only run if model files are downloaded
    fn test_detection_inference() {
        let detector = match YoloDetector::new(
            MODEL_PATH,
            super::super::classes::default_class_names(),
            0.25,
        ) {
            Ok(d) => d,
            Err(_) => return, // Skip if model not available
        };

        // A uniform gray frame should produce no confident detections
        let frame = DynamicImage::new_rgb8(640, 480);
        let result = detector.detect(&frame);
        assert!(result.is_ok());
    }
}
