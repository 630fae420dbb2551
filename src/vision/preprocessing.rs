// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame preprocessing for the YOLO detection model

use image::{imageops, DynamicImage, Rgb, RgbImage};
use ndarray::Array4;

/// Input size expected by the detection model
pub const MODEL_INPUT_SIZE: u32 = 640;

/// Gray used to pad the letterboxed frame (YOLO training convention)
const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Geometry of a frame letterboxed into the square model input
///
/// The frame is scaled uniformly (aspect preserved) and centered on the
/// padded square; the same geometry maps model-space coordinates back onto
/// the frame.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    frame_width: u32,
    frame_height: u32,
}

impl Letterbox {
    /// Compute the letterbox geometry for a frame
    pub fn fit(frame_width: u32, frame_height: u32, target: u32) -> Self {
        if frame_width == 0 || frame_height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                frame_width,
                frame_height,
            };
        }

        let scale =
            (target as f32 / frame_width as f32).min(target as f32 / frame_height as f32);
        let (scaled_w, scaled_h) = scaled_dims(frame_width, frame_height, scale);

        Self {
            scale,
            pad_x: ((target - scaled_w) / 2) as f32,
            pad_y: ((target - scaled_h) / 2) as f32,
            frame_width,
            frame_height,
        }
    }

    /// Frame width in pixels
    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    /// Frame height in pixels
    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    /// Map a model-space coordinate back onto the frame
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Scaled frame size inside the model square, at least one pixel each way
fn scaled_dims(frame_width: u32, frame_height: u32, scale: f32) -> (u32, u32) {
    let w = ((frame_width as f32 * scale).round() as u32).max(1);
    let h = ((frame_height as f32 * scale).round() as u32).max(1);
    (w, h)
}

/// Letterbox a frame into the model input tensor
///
/// Produces the NCHW `[1, 3, target, target]` tensor of `[0, 1]` pixel
/// values together with the geometry needed to map detections back onto
/// the frame.
pub fn letterbox_to_tensor(frame: &DynamicImage, target: u32) -> (Array4<f32>, Letterbox) {
    let geometry = Letterbox::fit(frame.width(), frame.height(), target);

    let mut canvas = RgbImage::from_pixel(target, target, PAD_COLOR);
    if frame.width() > 0 && frame.height() > 0 {
        let (scaled_w, scaled_h) =
            scaled_dims(frame.width(), frame.height(), geometry.scale);
        let scaled = imageops::resize(
            &frame.to_rgb8(),
            scaled_w,
            scaled_h,
            imageops::FilterType::Triangle,
        );
        imageops::replace(
            &mut canvas,
            &scaled,
            geometry.pad_x as i64,
            geometry.pad_y as i64,
        );
    }

    let mut tensor = Array4::zeros((1, 3, target as usize, target as usize));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let Rgb([r, g, b]) = *pixel;
        tensor[[0, 0, y as usize, x as usize]] = r as f32 / 255.0;
        tensor[[0, 1, y as usize, x as usize]] = g as f32 / 255.0;
        tensor[[0, 2, y as usize, x as usize]] = b as f32 / 255.0;
    }

    (tensor, geometry)
}
