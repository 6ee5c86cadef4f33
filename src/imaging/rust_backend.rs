//! Pure Rust image I/O backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP) | `image` crate, format sniffed from content |
//! | ICC profile (read) | `ImageDecoder::icc_profile` |
//! | DPI + EXIF (read) | [`physical`](super::physical) container parser |
//! | Encode → JPEG | `JpegEncoder` with JFIF density, APP1 EXIF spliced in |
//! | Encode → PNG | `PngEncoder`, `pHYs` + `eXIf` chunks spliced in |
//! | Encode → TIFF | `tiff` crate, LZW, resolution tags, ICC tag 34675 |
//! | Encode → WebP | `WebPEncoder` lossless (no resolution field) |

use super::backend::{BackendError, ImageBackend, ImageMetadata, LoadedImage};
use super::params::{OutputFormat, Quality, SaveParams};
use super::physical;
use image::codecs::jpeg::{JpegEncoder, PixelDensity, PixelDensityUnit};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader, RgbImage};
use log::{debug, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Convert any decoded image to 8-bit RGB, compositing alpha onto white.
fn flatten_onto_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Round a resolution to the nearest whole dot per inch for 16-bit fields.
fn dpi_u16(dpi: f64) -> u16 {
    dpi.round().clamp(1.0, u16::MAX as f64) as u16
}

fn attach_icc<E: ImageEncoder>(encoder: &mut E, metadata: &ImageMetadata) {
    let Some(icc) = &metadata.icc_profile else {
        return;
    };
    if let Err(e) = encoder.set_icc_profile(icc.clone()) {
        warn!("ICC profile not embedded: {e}");
    }
}

fn encode_jpeg(
    image: &RgbImage,
    metadata: &ImageMetadata,
    quality: Quality,
) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.value().max(1) as u8);
    encoder.set_pixel_density(PixelDensity {
        density: (dpi_u16(metadata.dpi.0), dpi_u16(metadata.dpi.1)),
        unit: PixelDensityUnit::Inches,
    });
    attach_icc(&mut encoder, metadata);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| e.to_string())?;

    match &metadata.exif {
        Some(exif) => Ok(physical::insert_jpeg_exif(&buf, exif).unwrap_or_else(|| {
            warn!("EXIF block too large for a JPEG segment; dropped");
            buf
        })),
        None => Ok(buf),
    }
}

fn png_compression(quality: Quality) -> CompressionType {
    match quality.compression_level() {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_png(
    image: &RgbImage,
    metadata: &ImageMetadata,
    quality: Quality,
) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    let mut encoder =
        PngEncoder::new_with_quality(&mut buf, png_compression(quality), PngFilter::Adaptive);
    attach_icc(&mut encoder, metadata);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| e.to_string())?;

    physical::insert_png_chunks(&buf, metadata.dpi, metadata.exif.as_deref())
        .ok_or_else(|| "encoder produced a malformed PNG header".to_string())
}

const TAG_ICC_PROFILE: u16 = 34675;

/// ICC profile from the first IFD of a TIFF file, if tagged.
fn read_tiff_icc(bytes: &[u8]) -> Option<Vec<u8>> {
    use tiff::decoder::Decoder;
    use tiff::tags::Tag;

    let mut decoder = Decoder::new(Cursor::new(bytes)).ok()?;
    match decoder.find_tag(Tag::Unknown(TAG_ICC_PROFILE)) {
        Ok(Some(_)) => decoder
            .get_tag_u8_vec(Tag::Unknown(TAG_ICC_PROFILE))
            .map_err(|e| debug!("TIFF ICC tag unreadable: {e}"))
            .ok(),
        _ => None,
    }
}

fn encode_tiff(image: &RgbImage, metadata: &ImageMetadata) -> Result<Vec<u8>, String> {
    use tiff::encoder::{Compression, Rational, TiffEncoder, colortype};
    use tiff::tags::{ResolutionUnit, Tag};

    let rational = |dpi: f64| Rational {
        n: (dpi * 100.0).round().max(1.0) as u32,
        d: 100,
    };

    let mut buf = Vec::new();
    {
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buf))
            .map_err(|e| e.to_string())?
            .with_compression(Compression::Lzw);
        let mut tiff_image = encoder
            .new_image::<colortype::RGB8>(image.width(), image.height())
            .map_err(|e| e.to_string())?;
        tiff_image.resolution_unit(ResolutionUnit::Inch);
        tiff_image.x_resolution(rational(metadata.dpi.0));
        tiff_image.y_resolution(rational(metadata.dpi.1));
        if let Some(icc) = &metadata.icc_profile {
            tiff_image
                .encoder()
                .write_tag(Tag::Unknown(TAG_ICC_PROFILE), icc.as_slice())
                .map_err(|e| e.to_string())?;
        }
        tiff_image
            .write_data(image.as_raw())
            .map_err(|e| e.to_string())?;
    }
    Ok(buf)
}

fn encode_webp(image: &RgbImage, metadata: &ImageMetadata) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    let mut encoder = WebPEncoder::new_lossless(&mut buf);
    attach_icc(&mut encoder, metadata);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| e.to_string())?;
    Ok(buf)
}

/// The part of `metadata` the target container can hold.
fn carried_metadata(metadata: &ImageMetadata, format: OutputFormat, output: &Path) -> ImageMetadata {
    let mut carried = metadata.clone();
    if carried.exif.is_some() && !format.supports_exif() {
        debug!("{}: {format} has no EXIF block; dropped", output.display());
        carried.exif = None;
    }
    if !format.supports_dpi() {
        debug!(
            "{}: {format} has no resolution field; {:.0} dpi not written",
            output.display(),
            metadata.dpi.0
        );
    }
    carried
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<LoadedImage, BackendError> {
        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes).map_err(|e| decode_error(path, e))?;

        let mut decoder = ImageReader::with_format(Cursor::new(bytes.as_slice()), format)
            .into_decoder()
            .map_err(|e| decode_error(path, e))?;
        let mut icc_profile = decoder.icc_profile().unwrap_or_else(|e| {
            debug!("{}: ICC profile unreadable: {e}", path.display());
            None
        });
        // image's TIFF decoder never reports the profile tag
        if icc_profile.is_none() && format == ImageFormat::Tiff {
            icc_profile = read_tiff_icc(&bytes);
        }
        let decoded = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;

        let container = physical::read_container_metadata(&bytes, format);
        let metadata = ImageMetadata {
            dpi: container.dpi(),
            exif: container.exif,
            icc_profile,
        };
        debug!(
            "{}: {}x{} {:?}, {:.0}x{:.0} dpi",
            path.display(),
            decoded.width(),
            decoded.height(),
            format,
            metadata.dpi.0,
            metadata.dpi.1
        );

        Ok(LoadedImage {
            pixels: flatten_onto_white(decoded),
            metadata,
        })
    }

    fn save(
        &self,
        image: &RgbImage,
        metadata: &ImageMetadata,
        params: &SaveParams,
    ) -> Result<PathBuf, BackendError> {
        let output = params.normalized_output();
        let metadata = &carried_metadata(metadata, params.format, &output);
        let encoded = match params.format {
            OutputFormat::Jpeg => encode_jpeg(image, metadata, params.quality),
            OutputFormat::Png => encode_png(image, metadata, params.quality),
            OutputFormat::Tiff => encode_tiff(image, metadata),
            OutputFormat::WebP => encode_webp(image, metadata),
        }
        .map_err(|message| BackendError::Encode {
            path: output.clone(),
            message,
        })?;

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&output, encoded)?;
        Ok(output)
    }
}
