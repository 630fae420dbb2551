// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image analysis
//!
//! This module provides:
//! - Camera frame decoding (format sniffing + size-capped decode)
//! - YOLO object detection via ONNX Runtime
//!
//! Inference runs on CPU only; camera frames are small and the node shares
//! its host with other services.

pub mod detector;
pub mod frame;
pub mod preprocessing;

pub use detector::{Detector, RawDetection, YoloDetector, COCO_CLASSES};
pub use frame::{decode_frame, FrameError, FrameInfo};
pub use preprocessing::{letterbox_to_tensor, Letterbox, MODEL_INPUT_SIZE};
