//! Shared test utilities for the portrait-crop test suite.
//!
//! Synthetic rasters and canned detectors, so pipeline tests never need
//! image files or a face model on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let image = solid_image(1000, 1000);
//! let detector = face_detector();
//! let out = crop_portrait(&image, &detector, &CropperConfig::default());
//! ```

use crate::face::detector::tests::ScriptedDetector;
use crate::types::BoundingBox;
use image::{Rgb, RgbImage};

/// Uniform mid-grey raster.
pub fn solid_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([128, 128, 128]))
}

/// Detector reporting one 200px face at (400, 300) and no eyes.
pub fn face_detector() -> ScriptedDetector {
    ScriptedDetector::new(vec![bbox(400, 300, 200, 200)], vec![])
}

pub fn bbox(x: i64, y: i64, w: i64, h: i64) -> BoundingBox {
    BoundingBox::new(x, y, w, h).unwrap()
}
