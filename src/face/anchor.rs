//! Face anchor resolution.
//!
//! Picks the largest detected face, looks for eyes in its upper half, and
//! derives the anchor point the crop geometry is built around:
//!
//! - two or more eyes: midpoint of the first two eye centers (detector
//!   order, not left-to-right)
//! - one eye: its center
//! - none: horizontal center of the face, 35% down from its top

use super::detector::FaceDetector;
use crate::types::{AnchorPoint, BoundingBox};
use image::GrayImage;
use serde::Serialize;

/// Fraction of the face height where the eyes are assumed to sit when the
/// detector finds none.
pub const EYE_HEIGHT_HEURISTIC: f64 = 0.35;

/// The chosen face and the point the crop is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceAnchor {
    pub face: BoundingBox,
    pub anchor: AnchorPoint,
}

/// Resolve the face anchor for an image, or `None` when no face is found.
pub fn resolve(image: &GrayImage, detector: &impl FaceDetector) -> Option<FaceAnchor> {
    let faces = detector.detect_faces(image);
    let face = largest_face(&faces)?;
    let eyes = match face.upper_half() {
        Some(upper) => detector.detect_eyes(image, upper),
        None => Vec::new(),
    };
    Some(FaceAnchor {
        face,
        anchor: anchor_point(face, &eyes),
    })
}

/// Largest box by area. Ties go to the earliest one.
pub fn largest_face(faces: &[BoundingBox]) -> Option<BoundingBox> {
    faces.iter().copied().fold(None, |best, face| match best {
        Some(b) if b.area() >= face.area() => Some(b),
        _ => Some(face),
    })
}

pub fn anchor_point(face: BoundingBox, eyes: &[BoundingBox]) -> AnchorPoint {
    match eyes {
        [first, second, ..] => {
            let (a, b) = (first.center(), second.center());
            AnchorPoint {
                x: (a.x + b.x).div_euclid(2),
                y: (a.y + b.y).div_euclid(2),
            }
        }
        [only] => only.center(),
        [] => AnchorPoint {
            x: face.x + face.w / 2,
            y: face.y + (face.h as f64 * EYE_HEIGHT_HEURISTIC).floor() as i64,
        },
    }
}
