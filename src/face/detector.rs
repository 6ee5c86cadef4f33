//! Face detector capability.

use crate::types::BoundingBox;
use image::GrayImage;

/// Something that finds face-shaped and eye-shaped rectangles.
///
/// Results carry no scores. Order matters: the resolver breaks ties by the
/// order a detector returns its rectangles in.
///
/// `Sync` so a single detector can be shared by every batch worker.
pub trait FaceDetector: Sync {
    /// All faces in the whole image.
    fn detect_faces(&self, image: &GrayImage) -> Vec<BoundingBox>;

    /// Eye features inside `within`, in full-image coordinates.
    fn detect_eyes(&self, image: &GrayImage, within: BoundingBox) -> Vec<BoundingBox>;
}
