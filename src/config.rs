//! Cropper configuration.
//!
//! Handles loading, validating, and merging `portrait-crop.toml`. The file is
//! sparse: stock defaults are the base layer, the user's file is merged on top
//! key-by-key, and CLI flags are applied last by the binary.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [crop]
//! zoom_factor = 2.8          # Crop height as a multiple of the face height
//! eye_position = 0.4         # Eye line as a fraction of the crop height (0 = top)
//! width_mm = 55.0            # Physical output width
//! height_mm = 85.0           # Physical output height
//! padding_mode = "solid"     # solid | average | mirror
//! fallback_on_no_face = true # Center-crop when no face is found
//! preserve_resolution = true # Keep source pixels; only upscale small crops
//! min_output_height = 850    # Upscale target for small crops (pixels)
//! offset_x = 0.0             # Shift crop window right (fraction of width)
//! offset_y = 0.0             # Shift crop window down (fraction of height)
//!
//! [output]
//! format = "jpg"             # jpg | png | tiff | webp
//! quality = 95               # 0-100
//! suffix = "_cropped"
//! preserve_structure = true  # Mirror input sub-folders in the output dir
//! skip_existing = true
//!
//! [detector]
//! # model = "models/seeta_fd_frontal_v1.0.bin"
//! min_face_size = 50
//!
//! [scan]
//! recursive = true
//! max_depth = 5
//! max_files = 1000
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{MAX_OUTPUT_DIMENSION, MAX_OUTPUT_PIXELS, OutputFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Pixels per physical millimetre used when the output is normalized to a
/// fixed size instead of keeping the source resolution.
pub const FIXED_PIXELS_PER_MM: f64 = 10.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// How pixels outside the source image are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    /// Opaque white.
    #[default]
    #[serde(alias = "white")]
    Solid,
    /// Per-channel mean of the whole source image.
    Average,
    /// Reflect the source across its edges without repeating the edge pixel.
    Mirror,
}

impl FromStr for PaddingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solid" | "white" => Ok(Self::Solid),
            "average" => Ok(Self::Average),
            "mirror" => Ok(Self::Mirror),
            other => Err(format!(
                "unknown padding mode '{other}' (expected solid, average or mirror)"
            )),
        }
    }
}

impl fmt::Display for PaddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Solid => "solid",
            Self::Average => "average",
            Self::Mirror => "mirror",
        })
    }
}

/// Crop engine parameters.
///
/// A plain `Copy` value: every call into the engine receives its own
/// snapshot, and per-file overrides produce a new value via
/// [`with_offsets`](Self::with_offsets) rather than mutating a shared one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropperConfig {
    /// Crop height as a multiple of the detected face height.
    pub zoom_factor: f64,
    /// Where the anchor lands vertically, as a fraction of the crop height.
    pub eye_position: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub padding_mode: PaddingMode,
    pub fallback_on_no_face: bool,
    pub preserve_resolution: bool,
    pub min_output_height: u32,
    /// Horizontal shift of the crop window as a fraction of its width.
    pub offset_x: f64,
    /// Vertical shift of the crop window as a fraction of its height.
    pub offset_y: f64,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            zoom_factor: 2.8,
            eye_position: 0.4,
            width_mm: 55.0,
            height_mm: 85.0,
            padding_mode: PaddingMode::Solid,
            fallback_on_no_face: true,
            preserve_resolution: true,
            min_output_height: 850,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl CropperConfig {
    /// Target width / height ratio.
    pub fn aspect_ratio(&self) -> f64 {
        self.width_mm / self.height_mm
    }

    /// Output size when the resolution is not preserved.
    pub fn fixed_output_size(&self) -> (u32, u32) {
        (
            (self.width_mm * FIXED_PIXELS_PER_MM).floor() as u32,
            (self.height_mm * FIXED_PIXELS_PER_MM).floor() as u32,
        )
    }

    /// Snapshot with different offsets; `self` is left untouched.
    pub fn with_offsets(self, offset_x: f64, offset_y: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            ..self
        }
    }

    /// Snapshot with a different physical size.
    pub fn with_size(self, width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Validation(format!(
                    "crop.{name} must be a positive number, got {v}"
                )))
            }
        };
        positive("zoom_factor", self.zoom_factor)?;
        positive("width_mm", self.width_mm)?;
        positive("height_mm", self.height_mm)?;
        if self.min_output_height == 0 || self.min_output_height > MAX_OUTPUT_DIMENSION {
            return Err(ConfigError::Validation(format!(
                "crop.min_output_height must be 1-{MAX_OUTPUT_DIMENSION}, got {}",
                self.min_output_height
            )));
        }
        for (name, v) in [
            ("eye_position", self.eye_position),
            ("offset_x", self.offset_x),
            ("offset_y", self.offset_y),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "crop.{name} must be finite, got {v}"
                )));
            }
        }
        if !self.preserve_resolution {
            let (w, h) = self.fixed_output_size();
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(format!(
                    "crop size {}x{}mm is too small for fixed-resolution output",
                    self.width_mm, self.height_mm
                )));
            }
            if w > MAX_OUTPUT_DIMENSION
                || h > MAX_OUTPUT_DIMENSION
                || w as i64 * h as i64 > MAX_OUTPUT_PIXELS
            {
                return Err(ConfigError::Validation(format!(
                    "crop size {}x{}mm is too large for fixed-resolution output",
                    self.width_mm, self.height_mm
                )));
            }
        }
        Ok(())
    }
}

/// Output file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Encoder quality on a 0-100 scale.
    pub quality: u32,
    /// Appended to the source file stem.
    pub suffix: String,
    /// Recreate the input's sub-folders inside the output directory.
    pub preserve_structure: bool,
    pub skip_existing: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 95,
            suffix: "_cropped".to_string(),
            preserve_structure: true,
            skip_existing: true,
        }
    }
}

/// Face detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// SeetaFace frontal model file. Required for face-anchored crops.
    pub model: Option<PathBuf>,
    /// Smallest face edge (pixels) the detector reports.
    pub min_face_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: None,
            min_face_size: 50,
        }
    }
}

/// Input discovery limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub recursive: bool,
    pub max_depth: usize,
    pub max_files: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 5,
            max_files: 1000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Everything a `portrait-crop.toml` can set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub crop: CropperConfig,
    pub output: OutputConfig,
    pub detector: DetectorConfig,
    pub scan: ScanConfig,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crop.validate()?;
        if self.output.quality > 100 {
            return Err(ConfigError::Validation(
                "output.quality must be 0-100".into(),
            ));
        }
        if self.output.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.suffix must not contain path separators".into(),
            ));
        }
        if self.detector.min_face_size < 20 {
            return Err(ConfigError::Validation(
                "detector.min_face_size must be at least 20".into(),
            ));
        }
        if self.scan.max_files == 0 {
            return Err(ConfigError::Validation(
                "scan.max_files must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Size presets
// =============================================================================

/// A named physical print size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub label: &'static str,
    pub width_mm: f64,
    pub height_mm: f64,
}

#[rustfmt::skip]
pub const PRESETS: &[Preset] = &[
    Preset { name: "photocard", label: "Photo card", width_mm: 55.0, height_mm: 85.0 },
    Preset { name: "passport", label: "Passport photo", width_mm: 35.0, height_mm: 45.0 },
    Preset { name: "id-3x4", label: "ID photo 3x4", width_mm: 30.0, height_mm: 40.0 },
    Preset { name: "id-4x5", label: "ID photo 4x5", width_mm: 40.0, height_mm: 50.0 },
    Preset { name: "id-card", label: "ID card", width_mm: 54.0, height_mm: 86.0 },
    Preset { name: "instax-mini", label: "Instax Mini", width_mm: 54.0, height_mm: 86.0 },
    Preset { name: "instax-wide", label: "Instax Wide", width_mm: 99.0, height_mm: 62.0 },
    Preset { name: "instax-square", label: "Instax Square", width_mm: 62.0, height_mm: 62.0 },
    Preset { name: "polaroid", label: "Polaroid", width_mm: 79.0, height_mm: 79.0 },
    Preset { name: "business-card", label: "Business card", width_mm: 90.0, height_mm: 50.0 },
];

/// Look up a preset by name, case-insensitively.
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Default config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "portrait-crop.toml";

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Load per-file offset overrides from a JSON object mapping file paths to
/// `[offset_x, offset_y]` pairs.
pub fn load_offsets(path: &Path) -> Result<HashMap<PathBuf, (f64, f64)>, ConfigError> {
    let content = fs::read_to_string(path)?;
    let raw: HashMap<PathBuf, (f64, f64)> = serde_json::from_str(&content)?;
    if let Some((file, _)) = raw
        .iter()
        .find(|(_, (x, y))| !x.is_finite() || !y.is_finite())
    {
        return Err(ConfigError::Validation(format!(
            "offsets for {} must be finite",
            file.display()
        )));
    }
    Ok(raw)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# portrait-crop configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Crop geometry
# ---------------------------------------------------------------------------
[crop]
# Crop height as a multiple of the detected face height (2.5 - 3.5 works well).
zoom_factor = 2.8

# Vertical position of the eyes as a fraction of the crop height (0 = top).
eye_position = 0.4

# Physical output size in millimetres; the aspect ratio is width / height.
width_mm = 55.0
height_mm = 85.0

# Fill for areas outside the source photo: "solid" (white), "average", "mirror".
padding_mode = "solid"

# Center-crop photos where no face is found. When false they are skipped.
fallback_on_no_face = true

# Keep the source resolution. Crops shorter than min_output_height are
# upscaled; nothing is ever downscaled. When false, every output is resized
# to 10 pixels per millimetre (550x850 for 55x85mm).
preserve_resolution = true
min_output_height = 850

# Shift the crop window, as a fraction of its width/height.
# Positive offset_x moves the window right, positive offset_y moves it down.
offset_x = 0.0
offset_y = 0.0

# ---------------------------------------------------------------------------
# Output files
# ---------------------------------------------------------------------------
[output]
# jpg, png, tiff or webp
format = "jpg"

# 0 = smallest, 100 = best. PNG maps this inversely to compression effort.
quality = 95

# Appended to the source file name: photo.jpg -> photo_cropped.jpg
suffix = "_cropped"

# Recreate input sub-folders inside the output directory.
preserve_structure = true

# Leave existing outputs alone.
skip_existing = true

# ---------------------------------------------------------------------------
# Face detection
# ---------------------------------------------------------------------------
[detector]
# SeetaFace frontal face model (seeta_fd_frontal_v1.0.bin).
# model = "models/seeta_fd_frontal_v1.0.bin"

# Smallest face edge in pixels (at least 20).
min_face_size = 50

# ---------------------------------------------------------------------------
# Input discovery
# ---------------------------------------------------------------------------
[scan]
recursive = true
max_depth = 5
max_files = 1000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_crop_config_values() {
        let c = CropperConfig::default();
        assert_eq!(c.zoom_factor, 2.8);
        assert_eq!(c.eye_position, 0.4);
        assert_eq!((c.width_mm, c.height_mm), (55.0, 85.0));
        assert_eq!(c.padding_mode, PaddingMode::Solid);
        assert!(c.fallback_on_no_face);
        assert!(c.preserve_resolution);
        assert_eq!(c.min_output_height, 850);
    }

    #[test]
    fn aspect_ratio_and_fixed_size() {
        let c = CropperConfig::default();
        assert!((c.aspect_ratio() - 55.0 / 85.0).abs() < 1e-12);
        assert_eq!(c.fixed_output_size(), (550, 850));

        let c = c.with_size(35.5, 45.09);
        assert_eq!(c.fixed_output_size(), (355, 450));
    }

    #[test]
    fn with_offsets_leaves_original_untouched() {
        let base = CropperConfig::default();
        let snap = base.with_offsets(0.2, -0.1);
        assert_eq!(snap.offset_x, 0.2);
        assert_eq!(snap.offset_y, -0.1);
        assert_eq!(base.offset_x, 0.0);
        assert_eq!(base.offset_y, 0.0);
    }

    #[test]
    fn padding_mode_parses_aliases() {
        assert_eq!("white".parse::<PaddingMode>(), Ok(PaddingMode::Solid));
        assert_eq!("Mirror".parse::<PaddingMode>(), Ok(PaddingMode::Mirror));
        assert_eq!("average".parse::<PaddingMode>(), Ok(PaddingMode::Average));
        assert!("blur".parse::<PaddingMode>().is_err());
    }

    #[test]
    fn padding_mode_white_alias_in_toml() {
        let config: AppConfig = toml::from_str("[crop]\npadding_mode = \"white\"\n").unwrap();
        assert_eq!(config.crop.padding_mode, PaddingMode::Solid);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_dimensions() {
        for bad in [
            CropperConfig {
                zoom_factor: 0.0,
                ..Default::default()
            },
            CropperConfig {
                width_mm: -1.0,
                ..Default::default()
            },
            CropperConfig {
                height_mm: 0.0,
                ..Default::default()
            },
            CropperConfig {
                zoom_factor: f64::NAN,
                ..Default::default()
            },
            CropperConfig {
                min_output_height: 0,
                ..Default::default()
            },
        ] {
            assert!(
                matches!(bad.validate(), Err(ConfigError::Validation(_))),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn validate_rejects_tiny_fixed_size() {
        let c = CropperConfig {
            preserve_resolution: false,
            width_mm: 0.05,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));
        // Same size is fine when the source resolution is kept.
        let c = CropperConfig {
            preserve_resolution: true,
            ..c
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_outputs() {
        let huge_min = CropperConfig {
            min_output_height: 2_000_000_000,
            ..CropperConfig::default()
        };
        assert!(matches!(huge_min.validate(), Err(ConfigError::Validation(_))));

        let huge_fixed = CropperConfig {
            preserve_resolution: false,
            width_mm: 1e9,
            ..CropperConfig::default()
        };
        assert!(matches!(huge_fixed.validate(), Err(ConfigError::Validation(_))));

        // Each side fits but the area does not
        let wide_and_tall = CropperConfig {
            preserve_resolution: false,
            width_mm: 6000.0,
            height_mm: 6000.0,
            ..CropperConfig::default()
        };
        assert!(wide_and_tall.validate().is_err());

        let largest_side = CropperConfig {
            min_output_height: MAX_OUTPUT_DIMENSION,
            ..CropperConfig::default()
        };
        assert!(largest_side.validate().is_ok());
    }

    #[test]
    fn validate_quality_too_high() {
        let mut config = AppConfig::default();
        config.output.quality = 101;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
        config.output.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_suffix_with_separator() {
        let mut config = AppConfig::default();
        config.output.suffix = "../x".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_min_face_size() {
        let mut config = AppConfig::default();
        config.detector.min_face_size = 10;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Presets
    // =========================================================================

    #[test]
    fn find_preset_case_insensitive() {
        let p = find_preset("Passport").unwrap();
        assert_eq!((p.width_mm, p.height_mm), (35.0, 45.0));
        assert!(find_preset("poster").is_none());
    }

    #[test]
    fn preset_names_are_unique() {
        let mut names: Vec<_> = PRESETS.iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PRESETS.len());
    }

    // =========================================================================
    // Threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // Loading and merging
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value =
            toml::from_str("[crop]\nzoom_factor = 2.8\neye_position = 0.4\n").unwrap();
        let overlay: toml::Value = toml::from_str("[crop]\nzoom_factor = 3.2\n").unwrap();
        let merged = merge_toml(base, overlay);
        let crop = merged.get("crop").unwrap();
        assert_eq!(crop.get("zoom_factor").unwrap().as_float(), Some(3.2));
        assert_eq!(crop.get("eye_position").unwrap().as_float(), Some(0.4));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("quality = 90").unwrap();
        let overlay: toml::Value = toml::from_str("quality = 70").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_config_reads_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
[crop]
width_mm = 35.0
height_mm = 45.0
padding_mode = "mirror"

[output]
format = "png"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.crop.width_mm, 35.0);
        assert_eq!(config.crop.height_mm, 45.0);
        assert_eq!(config.crop.padding_mode, PaddingMode::Mirror);
        assert_eq!(config.output.format, OutputFormat::Png);
        // Untouched values keep their defaults
        assert_eq!(config.crop.zoom_factor, 2.8);
        assert_eq!(config.output.quality, 95);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_rejects_unknown_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[crop]\nzoom = 3.0\n").unwrap();
        let err = load_config(&path).unwrap_err().to_string();
        assert!(err.contains("unknown field"), "{err}");
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[crop]\nheight_mm = 0.0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_offsets_reads_pairs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("offsets.json");
        fs::write(&path, r#"{"in/a.jpg": [0.1, -0.2], "in/b.jpg": [0, 0]}"#).unwrap();
        let offsets = load_offsets(&path).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[Path::new("in/a.jpg")], (0.1, -0.2));
    }

    #[test]
    fn load_offsets_malformed_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("offsets.json");
        fs::write(&path, r#"{"a.jpg": 0.1}"#).unwrap();
        assert!(matches!(load_offsets(&path), Err(ConfigError::Json(_))));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for section in ["crop", "output", "detector", "scan", "processing"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
