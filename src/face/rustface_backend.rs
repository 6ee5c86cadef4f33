//! Face detector backed by the `rustface` crate (SeetaFace engine).
//!
//! The frontal model has no eye stage, so [`RustfaceDetector::detect_eyes`]
//! always comes back empty and the resolver falls back to its eye-height
//! heuristic.

use super::detector::FaceDetector;
use crate::types::BoundingBox;
use image::GrayImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Model file looked up when the config names none.
pub const DEFAULT_MODEL_PATH: &str = "models/seeta_fd_frontal_v1.0.bin";

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to load face model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
}

pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceDetector {
    /// Load a SeetaFace model file. Failure here is fatal for the caller.
    pub fn from_file(path: &Path, min_face_size: u32) -> Result<Self, DetectorError> {
        let load_error = |message: String| DetectorError::ModelLoad {
            path: path.to_path_buf(),
            message,
        };
        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let model =
            rustface::read_model(BufReader::new(file)).map_err(|e| load_error(e.to_string()))?;
        log::debug!("loaded face model {}", path.display());
        Ok(Self {
            model,
            min_face_size,
        })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect_faces(&self, image: &GrayImage) -> Vec<BoundingBox> {
        // Detectors hold scratch state; one per call keeps this shareable.
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let data = rustface::ImageData::new(image.as_raw(), image.width(), image.height());
        detector
            .detect(&data)
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                BoundingBox::new(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width() as i64,
                    bbox.height() as i64,
                )
            })
            .collect()
    }

    fn detect_eyes(&self, _image: &GrayImage, _within: BoundingBox) -> Vec<BoundingBox> {
        Vec::new()
    }
}
