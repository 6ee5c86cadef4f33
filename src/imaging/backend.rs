//! Image I/O backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the boundary between the pixel pipeline and
//! the filesystem: `load` decodes a file into an RGB raster plus the print
//! metadata that must survive the crop, `save` encodes a raster and writes
//! that metadata back.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! [`MockBackend`](tests::MockBackend), which serves in-memory images and
//! records every save.

use super::params::SaveParams;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

/// Print metadata carried from input to output unchanged.
///
/// `dpi` is never recomputed after a resize: the output is declared at the
/// source's resolution, so its physical size follows from the pixel count.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub dpi: (f64, f64),
    /// Raw EXIF block in APP1 form (`Exif\0\0` + TIFF structure).
    pub exif: Option<Vec<u8>>,
    pub icc_profile: Option<Vec<u8>>,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            dpi: super::physical::DEFAULT_DPI,
            exif: None,
            icc_profile: None,
        }
    }
}

/// A decoded source image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixels: RgbImage,
    pub metadata: ImageMetadata,
}

/// Trait for image I/O backends.
///
/// `Sync` so one backend can be shared by every rayon worker.
pub trait ImageBackend: Sync {
    /// Decode a file into 8-bit RGB. Alpha is composited onto white.
    fn load(&self, path: &Path) -> Result<LoadedImage, BackendError>;

    /// Encode and write an image. Returns the path actually written, whose
    /// extension always matches the requested format.
    fn save(
        &self,
        image: &RgbImage,
        metadata: &ImageMetadata,
        params: &SaveParams,
    ) -> Result<PathBuf, BackendError>;
}
