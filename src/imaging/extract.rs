//! Padding / extraction engine.
//!
//! [`extract`] turns a source image and a crop rectangle into a buffer of
//! exactly the rectangle's size, synthesizing pixels where the rectangle
//! leaves the source:
//!
//! | Mode | Out-of-bounds pixels |
//! |---|---|
//! | `solid` | opaque white |
//! | `average` | per-channel mean of the whole source, rounded |
//! | `mirror` | reflection without repeating the edge pixel (`dcb|abcd|cba`) |
//!
//! Output is deterministic: the same inputs always give byte-identical pixels.

use super::calculations::{CropError, MAX_OUTPUT_PIXELS};
use crate::config::PaddingMode;
use crate::types::CropRegion;
use image::{Rgb, RgbImage};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Extract `region` from `image`, padding per `mode`.
pub fn extract(
    image: &RgbImage,
    region: CropRegion,
    mode: PaddingMode,
) -> Result<RgbImage, CropError> {
    if region.w <= 0 || region.h <= 0 {
        return Err(CropError::Degenerate {
            w: region.w,
            h: region.h,
        });
    }
    if region.w.saturating_mul(region.h) > MAX_OUTPUT_PIXELS {
        return Err(CropError::TooLarge {
            w: region.w,
            h: region.h,
        });
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(CropError::Degenerate {
            w: image.width() as i64,
            h: image.height() as i64,
        });
    }

    Ok(match mode {
        PaddingMode::Solid => fill_and_copy(image, region, WHITE),
        PaddingMode::Average => fill_and_copy(image, region, average_color(image)),
        PaddingMode::Mirror => mirror(image, region),
    })
}

/// Per-channel arithmetic mean of every pixel, rounded to nearest.
pub fn average_color(image: &RgbImage) -> Rgb<u8> {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return WHITE;
    }
    let mut sums = [0u64; 3];
    for px in image.pixels() {
        for (sum, &c) in sums.iter_mut().zip(px.0.iter()) {
            *sum += c as u64;
        }
    }
    Rgb(sums.map(|s| ((s + count / 2) / count) as u8))
}

/// Fill with `color`, then copy the part of `region` that overlaps the source.
fn fill_and_copy(image: &RgbImage, region: CropRegion, color: Rgb<u8>) -> RgbImage {
    let mut out = RgbImage::from_pixel(region.w as u32, region.h as u32, color);
    let Some(visible) = region.clip_to(image.width(), image.height()) else {
        return out;
    };

    let row_bytes = visible.w as usize * 3;
    let src_stride = image.width() as usize * 3;
    let dst_stride = region.w as usize * 3;
    let dst_x = (visible.x - region.x) as usize;
    let dst_y = (visible.y - region.y) as usize;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut out;

    for row in 0..visible.h as usize {
        let s = (visible.y as usize + row) * src_stride + visible.x as usize * 3;
        let d = (dst_y + row) * dst_stride + dst_x * 3;
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
    out
}

/// Map an out-of-range index into `[0, n)` by reflection without repeating
/// the edge sample. Periodic, so arbitrarily large pads stay in range.
pub fn reflect_101(i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    if m >= n { period - m } else { m }
}

fn mirror(image: &RgbImage, region: CropRegion) -> RgbImage {
    if region.is_within(image.width(), image.height()) {
        return image::imageops::crop_imm(
            image,
            region.x as u32,
            region.y as u32,
            region.w as u32,
            region.h as u32,
        )
        .to_image();
    }

    let (w, h) = (image.width() as i64, image.height() as i64);
    let cols: Vec<u32> = (region.x..region.right())
        .map(|x| reflect_101(x, w) as u32)
        .collect();
    let rows: Vec<u32> = (region.y..region.bottom())
        .map(|y| reflect_101(y, h) as u32)
        .collect();

    RgbImage::from_fn(region.w as u32, region.h as u32, |x, y| {
        *image.get_pixel(cols[x as usize], rows[y as usize])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x3 image where every pixel encodes its own coordinates.
    fn coords_image() -> RgbImage {
        RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8, y as u8, 7]))
    }

    fn region(x: i64, y: i64, w: i64, h: i64) -> CropRegion {
        CropRegion { x, y, w, h }
    }

    #[test]
    fn output_size_is_always_the_region_size() {
        let img = RgbImage::from_pixel(100, 100, Rgb([10, 20, 30]));
        for mode in [PaddingMode::Solid, PaddingMode::Average, PaddingMode::Mirror] {
            for r in [
                region(-500, -500, 50, 80),
                region(90, 90, 40, 40),
                region(-10, 20, 200, 30),
                region(10, 10, 20, 20),
            ] {
                let out = extract(&img, r, mode).unwrap();
                assert_eq!(out.dimensions(), (r.w as u32, r.h as u32), "{mode} {r:?}");
            }
        }
    }

    #[test]
    fn solid_pads_with_white_and_keeps_source_pixels() {
        let img = coords_image();
        let out = extract(&img, region(-1, -1, 3, 3), PaddingMode::Solid).unwrap();
        assert_eq!(*out.get_pixel(0, 0), WHITE);
        assert_eq!(*out.get_pixel(2, 0), WHITE);
        assert_eq!(*out.get_pixel(0, 2), WHITE);
        assert_eq!(*out.get_pixel(1, 1), Rgb([0, 0, 7]));
        assert_eq!(*out.get_pixel(2, 2), Rgb([1, 1, 7]));
    }

    #[test]
    fn fully_outside_region_is_all_fill() {
        let img = coords_image();
        let out = extract(&img, region(-500, -500, 5, 5), PaddingMode::Solid).unwrap();
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn average_color_rounds_to_nearest() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([1, 3, 255]));
        // means 0.5, 1.5, 127.5 round half up
        assert_eq!(average_color(&img), Rgb([1, 2, 128]));
    }

    #[test]
    fn average_mode_pads_with_mean() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        img.put_pixel(0, 0, Rgb([200, 0, 100]));
        let out = extract(&img, region(-2, 0, 3, 1), PaddingMode::Average).unwrap();
        assert_eq!(*out.get_pixel(0, 0), Rgb([125, 75, 100]));
        assert_eq!(*out.get_pixel(2, 0), Rgb([200, 0, 100]));
    }

    #[test]
    fn reflect_101_does_not_repeat_edges() {
        let mapped: Vec<i64> = (-3..7).map(|i| reflect_101(i, 4)).collect();
        assert_eq!(mapped, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(reflect_101(-100, 1), 0);
        // Periodic far outside
        assert_eq!(reflect_101(-7, 4), reflect_101(-1, 4));
    }

    #[test]
    fn mirror_reflects_across_edges() {
        let img = coords_image();
        let out = extract(&img, region(-2, 0, 4, 1), PaddingMode::Mirror).unwrap();
        let xs: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(xs, vec![2, 1, 0, 1]);

        let out = extract(&img, region(0, 1, 1, 4), PaddingMode::Mirror).unwrap();
        let ys: Vec<u8> = out.pixels().map(|p| p.0[1]).collect();
        assert_eq!(ys, vec![1, 2, 1, 0]);
    }

    #[test]
    fn mirror_in_bounds_is_plain_slice() {
        let img = coords_image();
        let out = extract(&img, region(1, 1, 2, 2), PaddingMode::Mirror).unwrap();
        let solid = extract(&img, region(1, 1, 2, 2), PaddingMode::Solid).unwrap();
        assert_eq!(out, solid);
        assert_eq!(*out.get_pixel(0, 0), Rgb([1, 1, 7]));
    }

    #[test]
    fn extraction_is_deterministic() {
        let img = RgbImage::from_fn(37, 23, |x, y| Rgb([(x * 7) as u8, (y * 11) as u8, 3]));
        for mode in [PaddingMode::Solid, PaddingMode::Average, PaddingMode::Mirror] {
            let r = region(-15, -40, 90, 120);
            assert_eq!(extract(&img, r, mode).unwrap(), extract(&img, r, mode).unwrap());
        }
    }

    #[test]
    fn degenerate_region_is_an_error() {
        let img = coords_image();
        assert!(matches!(
            extract(&img, region(0, 0, 0, 5), PaddingMode::Solid),
            Err(CropError::Degenerate { .. })
        ));
    }
}
