//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Divisions that can see negative operands use floor semantics
//! (`div_euclid` / `f64::floor`), never truncation toward zero.

use crate::config::CropperConfig;
use crate::types::{AnchorPoint, BoundingBox, CropRegion};
use thiserror::Error;

/// Largest output the pipeline will allocate, in pixels.
pub const MAX_OUTPUT_PIXELS: i64 = 200_000_000;

/// Largest output side the configuration accepts, in pixels.
pub const MAX_OUTPUT_DIMENSION: u32 = 65_535;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    #[error("degenerate crop region {w}x{h}")]
    Degenerate { w: i64, h: i64 },
    #[error("crop region {w}x{h} exceeds the {MAX_OUTPUT_PIXELS} pixel limit")]
    TooLarge { w: i64, h: i64 },
}

fn checked_region(x: i64, y: i64, w: i64, h: i64) -> Result<CropRegion, CropError> {
    if w <= 0 || h <= 0 {
        return Err(CropError::Degenerate { w, h });
    }
    if w.saturating_mul(h) > MAX_OUTPUT_PIXELS {
        return Err(CropError::TooLarge { w, h });
    }
    Ok(CropRegion { x, y, w, h })
}

// Multiply before dividing so exact ratios (850 * 55 / 85) stay exact.
fn width_for_height(h: i64, config: &CropperConfig) -> i64 {
    (h as f64 * config.width_mm / config.height_mm).floor() as i64
}

fn height_for_width(w: i64, config: &CropperConfig) -> i64 {
    (w as f64 * config.height_mm / config.width_mm).floor() as i64
}

/// Face-anchored crop rectangle.
///
/// Height is the face height scaled by the zoom factor; width follows from
/// the aspect ratio. The anchor lands `eye_position` of the way down and
/// horizontally centered, then the offsets shift the window in pixel space.
/// The result is not clipped and may lie partly or wholly outside the image.
///
/// # Examples
/// ```
/// # use portrait_crop::config::CropperConfig;
/// # use portrait_crop::imaging::compute_crop_region;
/// # use portrait_crop::types::{AnchorPoint, BoundingBox};
/// let bbox = BoundingBox::new(400, 300, 200, 200).unwrap();
/// let anchor = AnchorPoint { x: 500, y: 370 };
/// let region = compute_crop_region(bbox, anchor, &CropperConfig::default()).unwrap();
/// assert_eq!((region.w, region.h), (362, 560));
/// assert_eq!((region.x, region.y), (319, 146));
/// ```
pub fn compute_crop_region(
    bbox: BoundingBox,
    anchor: AnchorPoint,
    config: &CropperConfig,
) -> Result<CropRegion, CropError> {
    let crop_h = (bbox.h as f64 * config.zoom_factor).floor() as i64;
    let crop_w = width_for_height(crop_h, config);

    let mut crop_y = anchor.y - (crop_h as f64 * config.eye_position).floor() as i64;
    let mut crop_x = anchor.x - crop_w.div_euclid(2);

    crop_x += (crop_w as f64 * config.offset_x).floor() as i64;
    crop_y += (crop_h as f64 * config.offset_y).floor() as i64;

    checked_region(crop_x, crop_y, crop_w, crop_h)
}

/// Centered crop at the target aspect ratio, used when no face is found.
///
/// Keeps the full height when the source is relatively wider than the target,
/// otherwise the full width. Always inside the source bounds.
pub fn center_crop_region(
    width: u32,
    height: u32,
    config: &CropperConfig,
) -> Result<CropRegion, CropError> {
    let (src_w, src_h) = (width as i64, height as i64);
    if src_w <= 0 || src_h <= 0 {
        return Err(CropError::Degenerate { w: src_w, h: src_h });
    }
    let (w, h) = if src_w as f64 / src_h as f64 > config.aspect_ratio() {
        (width_for_height(src_h, config), src_h)
    } else {
        (src_w, height_for_width(src_w, config))
    };
    checked_region((src_w - w) / 2, (src_h - h) / 2, w, h)
}

/// Output dimensions for the resolution normalizer, or `None` when the
/// image is returned unchanged.
///
/// Preserve mode only ever upscales, and only when the height is below the
/// minimum. Fixed mode always resizes to the physical size at
/// [`FIXED_PIXELS_PER_MM`](crate::config::FIXED_PIXELS_PER_MM). Targets
/// beyond [`MAX_OUTPUT_PIXELS`] or a `u32` side are `TooLarge`.
pub fn normalized_dimensions(
    width: u32,
    height: u32,
    config: &CropperConfig,
) -> Result<Option<(u32, u32)>, CropError> {
    let (target_w, target_h) = if config.preserve_resolution {
        if height >= config.min_output_height || height == 0 {
            return Ok(None);
        }
        let min = config.min_output_height as u64;
        let new_w = (width as u64 * min / height as u64).max(1);
        (new_w, min)
    } else {
        let (w, h) = config.fixed_output_size();
        if (w, h) == (width, height) {
            return Ok(None);
        }
        (w as u64, h as u64)
    };

    let too_large = || CropError::TooLarge {
        w: target_w.min(i64::MAX as u64) as i64,
        h: target_h.min(i64::MAX as u64) as i64,
    };
    let w = u32::try_from(target_w).map_err(|_| too_large())?;
    let h = u32::try_from(target_h).map_err(|_| too_large())?;
    if w == 0 || h == 0 {
        return Err(CropError::Degenerate {
            w: w as i64,
            h: h as i64,
        });
    }
    if w as u64 * h as u64 > MAX_OUTPUT_PIXELS as u64 {
        return Err(too_large());
    }
    Ok(Some((w, h)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: i64, y: i64, w: i64, h: i64) -> BoundingBox {
        BoundingBox::new(x, y, w, h).unwrap()
    }

    #[test]
    fn crop_region_matches_hand_computation() {
        let config = CropperConfig::default();
        // h = floor(200 * 2.8) = 560, w = floor(560 * 55/85) = 362
        // y = 370 - floor(560 * 0.4) = 146, x = 500 - 181 = 319
        let r = compute_crop_region(bbox(400, 300, 200, 200), AnchorPoint { x: 500, y: 370 }, &config)
            .unwrap();
        assert_eq!(r, CropRegion { x: 319, y: 146, w: 362, h: 560 });
    }

    #[test]
    fn crop_region_keeps_aspect_ratio_within_rounding() {
        let config = CropperConfig::default();
        for h in [20, 37, 101, 250, 999] {
            let r = compute_crop_region(bbox(0, 0, h, h), AnchorPoint { x: 0, y: 0 }, &config)
                .unwrap();
            let expected_w = r.h as f64 * config.aspect_ratio();
            assert!((r.w as f64 - expected_w).abs() < 1.0, "h={h}: {r:?}");
        }
    }

    #[test]
    fn offsets_shift_window_in_pixel_space() {
        let base = CropperConfig::default();
        let anchor = AnchorPoint { x: 500, y: 370 };
        let b = bbox(400, 300, 200, 200);
        let plain = compute_crop_region(b, anchor, &base).unwrap();
        let shifted = compute_crop_region(b, anchor, &base.with_offsets(0.1, -0.1)).unwrap();
        // floor(362 * 0.1) = 36, floor(560 * -0.1) = -56
        assert_eq!(shifted.x - plain.x, 36);
        assert_eq!(shifted.y - plain.y, -56);
        assert_eq!((shifted.w, shifted.h), (plain.w, plain.h));
    }

    #[test]
    fn negative_offset_floors_away_from_zero() {
        let config = CropperConfig::default().with_offsets(-0.01, 0.0);
        let r = compute_crop_region(bbox(0, 0, 100, 100), AnchorPoint { x: 0, y: 0 }, &config)
            .unwrap();
        // w = floor(280 * 55/85) = 181; floor(181 * -0.01) = -2; 0 - 90 - 2
        assert_eq!(r.x, -92);
    }

    #[test]
    fn region_may_leave_the_image() {
        let r = compute_crop_region(
            bbox(0, 0, 100, 100),
            AnchorPoint { x: 5, y: 5 },
            &CropperConfig::default(),
        )
        .unwrap();
        assert!(r.x < 0 && r.y < 0);
    }

    #[test]
    fn tiny_zoom_is_degenerate() {
        let config = CropperConfig {
            zoom_factor: 0.001,
            ..CropperConfig::default()
        };
        let err = compute_crop_region(bbox(0, 0, 10, 10), AnchorPoint { x: 0, y: 0 }, &config)
            .unwrap_err();
        assert_eq!(err, CropError::Degenerate { w: 0, h: 0 });
    }

    #[test]
    fn huge_zoom_is_rejected() {
        let config = CropperConfig {
            zoom_factor: 1.0e6,
            ..CropperConfig::default()
        };
        let err = compute_crop_region(bbox(0, 0, 100, 100), AnchorPoint { x: 0, y: 0 }, &config)
            .unwrap_err();
        assert!(matches!(err, CropError::TooLarge { .. }));
    }

    #[test]
    fn center_crop_wide_source_keeps_height() {
        let config = CropperConfig::default();
        let r = center_crop_region(1000, 850, &config).unwrap();
        // floor(850 * 55/85) = 550
        assert_eq!(r, CropRegion { x: 225, y: 0, w: 550, h: 850 });
        assert!(r.is_within(1000, 850));
    }

    #[test]
    fn center_crop_tall_source_keeps_width() {
        let config = CropperConfig::default();
        let r = center_crop_region(550, 2000, &config).unwrap();
        assert_eq!(r, CropRegion { x: 0, y: 575, w: 550, h: 850 });
        assert!(r.is_within(550, 2000));
    }

    #[test]
    fn center_crop_empty_source_is_degenerate() {
        assert!(center_crop_region(0, 10, &CropperConfig::default()).is_err());
    }

    #[test]
    fn preserve_mode_upscales_short_images_to_min_height() {
        let config = CropperConfig::default();
        assert_eq!(normalized_dimensions(181, 280, &config), Ok(Some((549, 850))));
        assert_eq!(normalized_dimensions(550, 850, &config), Ok(None));
        assert_eq!(normalized_dimensions(1100, 1700, &config), Ok(None));
    }

    #[test]
    fn fixed_mode_always_targets_physical_size() {
        let config = CropperConfig {
            preserve_resolution: false,
            ..CropperConfig::default()
        };
        assert_eq!(normalized_dimensions(181, 280, &config), Ok(Some((550, 850))));
        assert_eq!(normalized_dimensions(3000, 4000, &config), Ok(Some((550, 850))));
        assert_eq!(normalized_dimensions(550, 850, &config), Ok(None));
    }

    #[test]
    fn oversized_upscale_target_is_rejected_not_wrapped() {
        let config = CropperConfig {
            min_output_height: 2_000_000_000,
            ..CropperConfig::default()
        };
        // 100 * 2e9 / 1 does not fit a u32 width
        assert!(matches!(
            normalized_dimensions(100, 1, &config),
            Err(CropError::TooLarge { w: 200_000_000_000, h: 2_000_000_000 })
        ));
        // Fits u32 on both sides but not the pixel budget
        assert!(matches!(
            normalized_dimensions(1, 1, &config),
            Err(CropError::TooLarge { .. })
        ));
    }

    #[test]
    fn oversized_fixed_target_is_rejected() {
        let config = CropperConfig {
            preserve_resolution: false,
            width_mm: 1e9,
            ..CropperConfig::default()
        };
        assert!(matches!(
            normalized_dimensions(550, 850, &config),
            Err(CropError::TooLarge { .. })
        ));
    }
}
