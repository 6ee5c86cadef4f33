//! # Portrait Crop
//!
//! Face-anchored portrait cropping for physical print formats. Given a photo,
//! it finds the largest face, builds a crop window of a fixed physical aspect
//! ratio around the eye line, pads whatever falls outside the source, and
//! writes the result with the source's DPI, EXIF and ICC profile intact.
//!
//! # Architecture: Per-Image Pipeline
//!
//! ```text
//! load → resolve face → compute region → extract + pad → normalize → save
//!  │          │               │                 │              │        │
//! backend   face::        imaging::         imaging::      imaging::  backend
//!          resolve   compute_crop_region     extract       normalize
//! ```
//!
//! Everything between load and save is a pure function of the raster and a
//! [`CropperConfig`](config::CropperConfig) snapshot, so the whole pipeline is
//! unit-testable with synthetic images and a scripted detector. The batch
//! orchestrator in [`process`] runs that pipeline over many files in parallel
//! and confines every failure to the file that caused it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Pixel-space value types: `BoundingBox`, `AnchorPoint`, `CropRegion` |
//! | [`config`] | `portrait-crop.toml` loading, merging and validation; size presets |
//! | [`face`] | Detector capability, anchor resolution, SeetaFace backend |
//! | [`imaging`] | Crop geometry, padding, normalization, image I/O with print metadata |
//! | [`scan`] | Bounded, lazy discovery of input images |
//! | [`naming`] | Output path derivation |
//! | [`process`] | Parallel batch orchestrator with per-file error isolation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Physical Size Comes From Metadata
//!
//! The crop keeps the source's pixels per inch. A crop that is 550 pixels wide
//! from a 254 DPI source prints 55 mm wide. Resizing never rewrites the DPI, so
//! output files keep the resolution the camera or scanner declared.
//!
//! ## Integer Geometry
//!
//! Crop sizes and positions are floored to whole pixels at fixed points in the
//! computation, so the same input always produces the same rectangle on every
//! platform.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` and `tiff` crates, and face
//! detection uses `rustface`. The binary has no system library dependencies.

pub mod config;
pub mod face;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
