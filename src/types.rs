//! Geometry types shared by the detector, the crop calculator and the
//! extraction engine.
//!
//! All coordinates are integer pixels with a top-left origin. Signed 64-bit
//! values are used throughout because crop rectangles routinely start at
//! negative offsets or run past the source edges; only the extraction engine
//! maps them back onto real pixels.

use serde::Serialize;

/// Axis-aligned rectangle returned by a detector.
///
/// Invariant: `w > 0` and `h > 0` for anything produced by
/// [`BoundingBox::new`]. Detectors that construct the struct directly are
/// expected to uphold the same rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl BoundingBox {
    /// Build a box, rejecting empty or negative extents.
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Option<Self> {
        (w > 0 && h > 0).then_some(Self { x, y, w, h })
    }

    pub fn area(&self) -> i64 {
        self.w * self.h
    }

    /// Integer center, rounded toward the top-left like the detector grid.
    pub fn center(&self) -> AnchorPoint {
        AnchorPoint {
            x: self.x + self.w / 2,
            y: self.y + self.h / 2,
        }
    }

    /// Upper half of the box, used to narrow the eye search.
    ///
    /// Returns `None` when the box is too short to have an upper half.
    pub fn upper_half(&self) -> Option<Self> {
        Self::new(self.x, self.y, self.w, self.h / 2)
    }
}

/// The point that must land at a fixed relative position in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorPoint {
    pub x: i64,
    pub y: i64,
}

/// Target rectangle in source coordinates. May lie partially or entirely
/// outside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRegion {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl CropRegion {
    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }

    /// Intersection with `[0, width) × [0, height)`, if non-empty.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<CropRegion> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i64);
        let y1 = self.bottom().min(height as i64);
        (x1 > x0 && y1 > y0).then_some(CropRegion {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

    /// Whether the whole region lies inside a `width × height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= width as i64 && self.bottom() <= height as i64
    }
}
