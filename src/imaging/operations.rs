//! High-level image operations.
//!
//! These functions combine the face resolver, the geometry calculations and
//! the extraction engine into the per-image crop pipeline. They work on
//! in-memory rasters; loading and saving stay with the backend.

use super::calculations::{CropError, center_crop_region, compute_crop_region, normalized_dimensions};
use super::extract::extract;
use crate::config::CropperConfig;
use crate::face::{FaceAnchor, FaceDetector, resolve};
use crate::types::CropRegion;
use image::RgbImage;
use image::imageops::FilterType;
use serde::Serialize;

/// Result type for crop operations.
pub type Result<T> = std::result::Result<T, CropError>;

/// How the crop rectangle was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CropStrategy {
    Face(FaceAnchor),
    CenterFallback,
}

/// A cropped, normalized image and how it was produced.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub image: RgbImage,
    pub region: CropRegion,
    pub strategy: CropStrategy,
}

/// Plan the crop rectangle without touching any pixels.
///
/// `Ok(None)` means no face was found and the fallback is disabled.
pub fn plan_crop(
    image: &RgbImage,
    detector: &impl FaceDetector,
    config: &CropperConfig,
) -> Result<Option<(CropRegion, CropStrategy)>> {
    let gray = image::imageops::grayscale(image);
    match resolve(&gray, detector) {
        Some(found) => {
            let region = compute_crop_region(found.face, found.anchor, config)?;
            Ok(Some((region, CropStrategy::Face(found))))
        }
        None if config.fallback_on_no_face => {
            let region = center_crop_region(image.width(), image.height(), config)?;
            Ok(Some((region, CropStrategy::CenterFallback)))
        }
        None => Ok(None),
    }
}

/// Run the full per-image pipeline: resolve, compute, extract, normalize.
pub fn crop_portrait(
    image: &RgbImage,
    detector: &impl FaceDetector,
    config: &CropperConfig,
) -> Result<Option<CroppedImage>> {
    let Some((region, strategy)) = plan_crop(image, detector, config)? else {
        return Ok(None);
    };
    let extracted = extract(image, region, config.padding_mode)?;
    Ok(Some(CroppedImage {
        image: normalize(extracted, config)?,
        region,
        strategy,
    }))
}

/// Resize per the resolution policy. Physical metadata is not involved.
pub fn normalize(image: RgbImage, config: &CropperConfig) -> Result<RgbImage> {
    Ok(match normalized_dimensions(image.width(), image.height(), config)? {
        Some((w, h)) => image::imageops::resize(&image, w, h, FilterType::Lanczos3),
        None => image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaddingMode;
    use crate::face::detector::tests::ScriptedDetector;
    use crate::types::{AnchorPoint, BoundingBox};

    fn face_at(x: i64, y: i64, size: i64) -> ScriptedDetector {
        ScriptedDetector::new(vec![BoundingBox::new(x, y, size, size).unwrap()], vec![])
    }

    fn source() -> RgbImage {
        RgbImage::from_pixel(1000, 1000, image::Rgb([90, 120, 150]))
    }

    #[test]
    fn face_path_plans_anchored_region() {
        let (region, strategy) = plan_crop(&source(), &face_at(400, 300, 200), &CropperConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(region, CropRegion { x: 319, y: 146, w: 362, h: 560 });
        match strategy {
            CropStrategy::Face(found) => assert_eq!(found.anchor, AnchorPoint { x: 500, y: 370 }),
            other => panic!("expected face strategy, got {other:?}"),
        }
    }

    #[test]
    fn preserve_mode_upscales_to_min_height() {
        let out = crop_portrait(&source(), &face_at(400, 300, 200), &CropperConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.image.dimensions(), (549, 850));
    }

    #[test]
    fn preserve_mode_never_downscales() {
        let big = RgbImage::from_pixel(3000, 3000, image::Rgb([0, 0, 0]));
        let out = crop_portrait(&big, &face_at(1200, 900, 600), &CropperConfig::default())
            .unwrap()
            .unwrap();
        // 600 * 2.8 = 1680, floor(1680 * 55 / 85) = 1087
        assert_eq!(out.image.dimensions(), (1087, 1680));
    }

    #[test]
    fn fixed_mode_outputs_physical_size() {
        let config = CropperConfig {
            preserve_resolution: false,
            ..CropperConfig::default()
        };
        let out = crop_portrait(&source(), &face_at(400, 300, 200), &config)
            .unwrap()
            .unwrap();
        assert_eq!(out.image.dimensions(), (550, 850));
    }

    #[test]
    fn no_face_falls_back_to_center_crop() {
        let out = crop_portrait(&source(), &ScriptedDetector::no_faces(), &CropperConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.strategy, CropStrategy::CenterFallback);
        // floor(1000 * 55 / 85) = 647 wide, full height kept
        assert_eq!(out.region, CropRegion { x: 176, y: 0, w: 647, h: 1000 });
        assert_eq!(out.image.dimensions(), (647, 1000));
    }

    #[test]
    fn no_face_without_fallback_is_none() {
        let config = CropperConfig {
            fallback_on_no_face: false,
            ..CropperConfig::default()
        };
        assert!(
            crop_portrait(&source(), &ScriptedDetector::no_faces(), &config)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn face_at_corner_is_padded_per_mode() {
        let config = CropperConfig {
            padding_mode: PaddingMode::Solid,
            preserve_resolution: false,
            ..CropperConfig::default()
        };
        let out = crop_portrait(&source(), &face_at(0, 0, 200), &config)
            .unwrap()
            .unwrap();
        assert!(out.region.x < 0 && out.region.y < 0);
        assert_eq!(out.image.dimensions(), (550, 850));
        assert_eq!(out.image.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn degenerate_geometry_is_an_error() {
        let config = CropperConfig {
            zoom_factor: 0.001,
            ..CropperConfig::default()
        };
        let err = crop_portrait(&source(), &face_at(400, 300, 200), &config).unwrap_err();
        assert!(matches!(err, CropError::Degenerate { .. }));
    }

    #[test]
    fn oversized_normalize_target_is_an_error() {
        let config = CropperConfig {
            min_output_height: 2_000_000_000,
            ..CropperConfig::default()
        };
        let err = normalize(source(), &config).unwrap_err();
        assert!(matches!(err, CropError::TooLarge { .. }));
    }
}
