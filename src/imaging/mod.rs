//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Load** | `image` decoders + ICC from the decoder + [`physical`] DPI/EXIF |
//! | **Crop geometry** | pure integer math in `calculations` |
//! | **Extract / pad** | solid, average or reflect-101 mirror in `extract` |
//! | **Normalize** | `image::imageops::resize` with `Lanczos3` |
//! | **Save** | JPEG / PNG / WebP via `image`, TIFF via `tiff` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop rectangles and output sizes (unit testable)
//! - **Extract**: Padding engine producing exactly-sized buffers
//! - **Parameters**: Data structures describing save operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The per-image pipeline combining face resolution + calculations + extraction

pub mod backend;
mod calculations;
mod extract;
pub mod operations;
mod params;
pub mod physical;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageMetadata, LoadedImage};
pub use calculations::{
    CropError, MAX_OUTPUT_DIMENSION, MAX_OUTPUT_PIXELS, center_crop_region, compute_crop_region,
    normalized_dimensions,
};
pub use extract::{average_color, extract, reflect_101};
pub use operations::{CropStrategy, CroppedImage, crop_portrait, normalize, plan_crop};
pub use params::{OutputFormat, Quality, SaveParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
