//! Parameter types for image I/O.
//!
//! These structs describe *what* to write, not *how*. They are the interface
//! between the batch orchestrator (which decides where outputs go) and the
//! [`backend`](super::backend) (which does the encoding), so a mock backend
//! can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: Encoder quality (0–100). Clamped on construction.
//! - [`OutputFormat`]: Target container, with its canonical extension.
//! - [`SaveParams`]: Output path, format and quality for one save.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Encoder quality (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Discrete lossless compression effort (0 = none, 9 = maximum).
    ///
    /// Lossless encoders have no quality knob, so the scale is inverted:
    /// higher quality means less time spent compressing.
    pub fn compression_level(self) -> u8 {
        (100u32.saturating_sub(self.0) / 10).min(9) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "tiff", alias = "tif")]
    Tiff,
    #[serde(rename = "webp")]
    WebP,
}

impl OutputFormat {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
        }
    }

    /// Whether the container can carry a raw EXIF block.
    pub fn supports_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }

    /// Whether the container has a print-resolution field.
    pub fn supports_dpi(self) -> bool {
        !matches!(self, Self::WebP)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "tif" | "tiff" => Ok(Self::Tiff),
            "webp" => Ok(Self::WebP),
            other => Err(format!(
                "unsupported output format '{other}' (expected jpg, png, tiff or webp)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parameters for one save operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveParams {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl SaveParams {
    /// Output path with its extension forced to the format's canonical one.
    ///
    /// `photo.jpeg` saved as JPEG stays as is; `photo.png` saved as JPEG
    /// becomes `photo.jpg`.
    pub fn normalized_output(&self) -> PathBuf {
        let matches = self
            .output
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse::<OutputFormat>().ok())
            == Some(self.format);
        if matches {
            self.output.clone()
        } else {
            with_extension(&self.output, self.format.extension())
        }
    }
}

fn with_extension(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}
