//! Face detection and anchor resolution.
//!
//! - [`detector`]: the [`FaceDetector`] capability every backend provides.
//! - [`anchor`]: turns raw detections into one face box and the point the
//!   crop is built around.
//! - [`rustface_backend`]: SeetaFace frontal detector via `rustface`.

pub mod anchor;
pub mod detector;
pub mod rustface_backend;

pub use anchor::{FaceAnchor, resolve};
pub use detector::FaceDetector;
pub use rustface_backend::{DEFAULT_MODEL_PATH, DetectorError, RustfaceDetector};
