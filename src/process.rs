//! Batch processing.
//!
//! Runs the crop pipeline over a list of files and aggregates the outcomes.
//!
//! ## Per-file pipeline
//!
//! ```text
//! skip-existing check → load → resolve face / fallback → extract → normalize → save
//! ```
//!
//! Every failure is confined to its file: decode errors, degenerate
//! geometry, save errors and even panics become a [`FileOutcome::Failed`]
//! and the batch moves on. A batch always returns a complete [`BatchStats`].
//!
//! ## Parallel Processing
//!
//! Files are processed in parallel on the global [rayon](https://docs.rs/rayon)
//! pool. Workers send results over a channel; the calling thread puts them
//! back into file order before recording them and invoking the progress
//! callback, so callers observe a sequential run.
//!
//! ## Cancellation
//!
//! The [`BatchOptions::cancel`] flag is checked before each file starts. A
//! file already in flight always finishes, so no output is left half-written.
//! Files that never started are recorded as skipped.

use crate::config::{CropperConfig, OutputConfig};
use crate::face::FaceDetector;
use crate::imaging::{
    BackendError, CropError, CropStrategy, ImageBackend, Quality, SaveParams, crop_portrait,
};
use crate::naming;
use crate::types::CropRegion;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Crop failed: {0}")]
    Crop(#[from] CropError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Everything that stays fixed for a whole batch.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub crop: CropperConfig,
    pub output: OutputConfig,
    pub output_dir: PathBuf,
    /// Directory the files were discovered in, for mirroring sub-folders.
    pub input_root: Option<PathBuf>,
}

/// Per-run controls.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub skip_existing: bool,
    pub cancel: Arc<AtomicBool>,
    /// Per-file `(offset_x, offset_y)` overrides. Looked up by the path as
    /// given, then by bare file name.
    pub offsets: HashMap<PathBuf, (f64, f64)>,
}

impl BatchOptions {
    fn offsets_for(&self, source: &Path) -> Option<(f64, f64)> {
        self.offsets
            .get(source)
            .or_else(|| {
                source
                    .file_name()
                    .and_then(|name| self.offsets.get(Path::new(name)))
            })
            .copied()
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Saved {
        output: PathBuf,
        strategy: CropStrategy,
        /// Crop rectangle in source pixel space.
        region: CropRegion,
        dimensions: (u32, u32),
    },
    SkippedExisting { output: PathBuf },
    SkippedNoFace,
    Cancelled,
    Failed { error: String },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Aggregate counts for a batch.
///
/// Only [`record`](Self::record) changes the counts, and it bumps `total`
/// together with exactly one bucket, so
/// `success + failed + skipped == total` holds at every observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    total: usize,
    success: usize,
    failed: usize,
    skipped: usize,
}

impl BatchStats {
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.success += 1;
        } else if outcome.is_failure() {
            self.failed += 1;
        } else {
            self.skipped += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn success(&self) -> usize {
        self.success
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Progress events, delivered in file order on the calling thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    FileProcessed {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        source: PathBuf,
        outcome: FileOutcome,
    },
}

/// Machine-readable record of a batch: per-file outcomes in file order plus
/// the final counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub stats: BatchStats,
    pub files: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub source: PathBuf,
    pub outcome: FileOutcome,
}

impl BatchReport {
    pub fn record(&mut self, event: &ProcessEvent) {
        let ProcessEvent::FileProcessed {
            source, outcome, ..
        } = event;
        self.stats.record(outcome);
        self.files.push(ReportEntry {
            source: source.clone(),
            outcome: outcome.clone(),
        });
    }
}

/// Initialize the global rayon pool with `threads` workers.
pub fn init_thread_pool(threads: usize) -> Result<(), ProcessError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    Ok(())
}

/// Process one file end to end, writing to `output`.
///
/// The extension of `output` is replaced by the configured format's.
pub fn process_file(
    source: &Path,
    output: PathBuf,
    backend: &impl ImageBackend,
    detector: &impl FaceDetector,
    settings: &BatchSettings,
    options: &BatchOptions,
) -> Result<FileOutcome, ProcessError> {
    if options.skip_existing && output.exists() {
        return Ok(FileOutcome::SkippedExisting { output });
    }

    let loaded = backend.load(source)?;
    let crop = match options.offsets_for(source) {
        Some((x, y)) => settings.crop.with_offsets(x, y),
        None => settings.crop,
    };
    let Some(cropped) = crop_portrait(&loaded.pixels, detector, &crop)? else {
        return Ok(FileOutcome::SkippedNoFace);
    };

    let written = backend.save(
        &cropped.image,
        &loaded.metadata,
        &SaveParams {
            output,
            format: settings.output.format,
            quality: Quality::new(settings.output.quality),
        },
    )?;
    Ok(FileOutcome::Saved {
        output: written,
        strategy: cropped.strategy,
        region: cropped.region,
        dimensions: cropped.image.dimensions(),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one file, converting every error and panic into an outcome.
fn run_guarded(
    source: &Path,
    backend: &impl ImageBackend,
    detector: &impl FaceDetector,
    settings: &BatchSettings,
    options: &BatchOptions,
) -> FileOutcome {
    if options.cancel.load(Ordering::Relaxed) {
        return FileOutcome::Cancelled;
    }
    let output = naming::output_path(
        source,
        settings.input_root.as_deref(),
        &settings.output_dir,
        &settings.output,
    );
    let result = catch_unwind(AssertUnwindSafe(|| {
        process_file(source, output, backend, detector, settings, options)
    }));
    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            log::debug!("{}: {e}", source.display());
            FileOutcome::Failed {
                error: e.to_string(),
            }
        }
        Err(payload) => FileOutcome::Failed {
            error: format!("panicked: {}", panic_message(payload.as_ref())),
        },
    }
}

/// Process `files` in parallel, reporting each in order through `on_event`.
pub fn process_batch(
    files: &[PathBuf],
    backend: &impl ImageBackend,
    detector: &impl FaceDetector,
    settings: &BatchSettings,
    options: &BatchOptions,
    mut on_event: impl FnMut(&ProcessEvent),
) -> BatchStats {
    let total = files.len();
    let mut stats = BatchStats::default();
    let (tx, rx) = mpsc::channel::<(usize, FileOutcome)>();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            files
                .par_iter()
                .enumerate()
                .for_each_with(tx, |tx, (i, source)| {
                    let outcome = run_guarded(source, backend, detector, settings, options);
                    // Receiver only goes away if the caller panicked
                    let _ = tx.send((i, outcome));
                });
        });

        let mut pending = BTreeMap::new();
        let mut next = 0;
        for (i, outcome) in rx {
            pending.insert(i, outcome);
            while let Some(outcome) = pending.remove(&next) {
                stats.record(&outcome);
                on_event(&ProcessEvent::FileProcessed {
                    index: next + 1,
                    total,
                    source: files[next].clone(),
                    outcome,
                });
                next += 1;
            }
        }
    });

    stats
}
