//! Output path derivation.
//!
//! Every cropped file is named after its source:
//!
//! ```text
//! <output_dir>/<sub-folder>/<stem><suffix>.<ext>
//! ```
//!
//! - `<sub-folder>` is the source's parent relative to the input root, kept
//!   only when `preserve_structure` is on and the source lies under the root.
//! - `<ext>` is the canonical extension of the output format, not the source's.
//!
//! ```text
//! photos/2024/anna.png  →  cropped/2024/anna_cropped.jpg
//! ```

use crate::config::OutputConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Output file for `source`.
///
/// `input_root` is the directory a batch was discovered from; `None` for a
/// single file, which always lands directly in `output_dir`.
pub fn output_path(
    source: &Path,
    input_root: Option<&Path>,
    output_dir: &Path,
    config: &OutputConfig,
) -> PathBuf {
    let stem = source
        .file_stem()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("image"));
    let mut file_name = stem;
    file_name.push(&config.suffix);
    file_name.push(".");
    file_name.push(config.format.extension());

    let sub_folder = input_root
        .filter(|_| config.preserve_structure)
        .and_then(|root| source.parent()?.strip_prefix(root).ok());

    match sub_folder {
        Some(rel) => output_dir.join(rel).join(file_name),
        None => output_dir.join(file_name),
    }
}
