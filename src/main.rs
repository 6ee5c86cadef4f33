use clap::{Parser, Subcommand};
use log::{debug, info};
use portrait_crop::config::{self, AppConfig, PaddingMode};
use portrait_crop::face::{DEFAULT_MODEL_PATH, RustfaceDetector};
use portrait_crop::imaging::{OutputFormat, RustBackend};
use portrait_crop::process::{self, BatchOptions, BatchReport, BatchSettings, ProcessEvent};
use portrait_crop::{naming, output, scan};
use std::path::{Path, PathBuf};

/// Flags shared by the commands that crop images. Each one overrides the
/// matching config file value.
#[derive(clap::Args, Clone, Debug)]
struct CropArgs {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME)]
    config: PathBuf,

    /// Named print size (see `presets`)
    #[arg(long)]
    preset: Option<String>,

    /// Output width in millimetres
    #[arg(short = 'W', long)]
    width: Option<f64>,

    /// Output height in millimetres
    #[arg(short = 'H', long)]
    height: Option<f64>,

    /// Crop height as a multiple of the face height
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Eye line as a fraction of the crop height from the top
    #[arg(short, long)]
    eye_position: Option<f64>,

    /// Shift the crop right by this fraction of its width
    #[arg(long, allow_hyphen_values = true)]
    offset_x: Option<f64>,

    /// Shift the crop down by this fraction of its height
    #[arg(long, allow_hyphen_values = true)]
    offset_y: Option<f64>,

    /// Fill for areas outside the photo: solid, average, mirror
    #[arg(long)]
    padding: Option<PaddingMode>,

    /// Output format: jpg, png, tiff, webp
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Output quality 0-100
    #[arg(short, long)]
    quality: Option<u32>,

    /// SeetaFace frontal model file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Skip photos without a face instead of center-cropping them
    #[arg(long)]
    no_fallback: bool,

    /// Resize every crop to the fixed print size instead of keeping source pixels
    #[arg(long)]
    fixed_resolution: bool,

    /// JSON file mapping photo paths to [offset_x, offset_y]
    #[arg(long)]
    offsets: Option<PathBuf>,

    /// Re-crop photos whose output already exists
    #[arg(long)]
    no_skip_existing: bool,

    /// Parallel workers (default: CPU cores)
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl CropArgs {
    /// Load the config file and apply the command line on top.
    fn resolve(&self) -> Result<AppConfig, Box<dyn std::error::Error>> {
        let mut cfg = config::load_config(&self.config)?;
        let crop = &mut cfg.crop;

        if let Some(name) = &self.preset {
            let preset = config::find_preset(name)
                .ok_or_else(|| format!("unknown preset '{name}' (see `portrait-crop presets`)"))?;
            *crop = crop.with_size(preset.width_mm, preset.height_mm);
        }
        crop.width_mm = self.width.unwrap_or(crop.width_mm);
        crop.height_mm = self.height.unwrap_or(crop.height_mm);
        crop.zoom_factor = self.zoom.unwrap_or(crop.zoom_factor);
        crop.eye_position = self.eye_position.unwrap_or(crop.eye_position);
        crop.offset_x = self.offset_x.unwrap_or(crop.offset_x);
        crop.offset_y = self.offset_y.unwrap_or(crop.offset_y);
        crop.padding_mode = self.padding.unwrap_or(crop.padding_mode);
        crop.fallback_on_no_face &= !self.no_fallback;
        crop.preserve_resolution &= !self.fixed_resolution;

        cfg.output.format = self.format.unwrap_or(cfg.output.format);
        cfg.output.quality = self.quality.unwrap_or(cfg.output.quality);
        cfg.output.skip_existing &= !self.no_skip_existing;
        if self.model.is_some() {
            cfg.detector.model = self.model.clone();
        }
        if self.jobs.is_some() {
            cfg.processing.max_processes = self.jobs;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn batch_options(&self, cfg: &AppConfig) -> Result<BatchOptions, Box<dyn std::error::Error>> {
        let offsets = match &self.offsets {
            Some(path) => config::load_offsets(path)?,
            None => Default::default(),
        };
        Ok(BatchOptions {
            skip_existing: cfg.output.skip_existing,
            offsets,
            ..Default::default()
        })
    }
}

#[derive(Parser)]
#[command(name = "portrait-crop")]
#[command(about = "Face-anchored portrait cropping for print formats")]
#[command(long_about = "\
Face-anchored portrait cropping for print formats

Finds the largest face in each photo and crops a window of the chosen print
size around the eye line. Areas outside the photo are padded. Output files
keep the source DPI, EXIF and ICC profile.

  portrait-crop crop photo.jpg -o card.jpg
  portrait-crop batch photos/ --preset passport
  portrait-crop batch photos/ -o prints/ --padding mirror --format tiff

Settings are read from portrait-crop.toml when present. Run
'portrait-crop gen-config' to generate a documented one.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop a single photo
    Crop {
        /// Photo to crop
        input: PathBuf,
        /// Output file (default: <stem>_cropped.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        args: CropArgs,
    },
    /// Crop every photo in a directory
    Batch {
        /// Directory to scan for photos
        dir: PathBuf,
        /// Output directory (default: DIR/cropped)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write a JSON report of every file's outcome
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        args: CropArgs,
    },
    /// List the named print sizes
    Presets,
    /// Print a stock portrait-crop.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Crop {
            input,
            output,
            args,
        } => {
            let cfg = args.resolve()?;
            let options = BatchOptions {
                skip_existing: false,
                ..args.batch_options(&cfg)?
            };
            let detector = load_detector(&cfg)?;
            let settings = BatchSettings {
                crop: cfg.crop,
                output: cfg.output.clone(),
                output_dir: input.parent().map(Path::to_path_buf).unwrap_or_default(),
                input_root: None,
            };
            let target = output.unwrap_or_else(|| {
                naming::output_path(&input, None, &settings.output_dir, &settings.output)
            });
            let outcome = process::process_file(
                &input,
                target,
                &RustBackend::new(),
                &detector,
                &settings,
                &options,
            )?;
            println!("{}", output::outcome_line(&outcome));
        }
        Command::Batch {
            dir,
            output,
            report,
            args,
        } => {
            let cfg = args.resolve()?;
            let options = args.batch_options(&cfg)?;
            let detector = load_detector(&cfg)?;
            let output_dir = output.unwrap_or_else(|| dir.join("cropped"));

            let files = scan::exclude_dir(scan::scan(&dir, &cfg.scan)?, &output_dir);
            info!(
                "{} photos, print size {}x{} mm → {}",
                files.len(),
                cfg.crop.width_mm,
                cfg.crop.height_mm,
                output_dir.display()
            );

            let threads = config::effective_threads(&cfg.processing);
            debug!("Using {threads} workers");
            process::init_thread_pool(threads)?;

            let settings = BatchSettings {
                crop: cfg.crop,
                output: cfg.output.clone(),
                output_dir,
                input_root: Some(dir),
            };
            let mut batch_report = BatchReport::default();
            let stats = process::process_batch(
                &files,
                &RustBackend::new(),
                &detector,
                &settings,
                &options,
                |event| {
                    print_event(event);
                    batch_report.record(event);
                },
            );
            output::print_summary(&stats);
            if let Some(path) = report {
                std::fs::write(&path, serde_json::to_string_pretty(&batch_report)?)?;
                info!("Report written to {}", path.display());
            }
            if stats.failed() > 0 {
                std::process::exit(1);
            }
        }
        Command::Presets => {
            output::print_presets(config::PRESETS);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn print_event(event: &ProcessEvent) {
    for line in output::format_process_event(event) {
        println!("{}", line);
    }
}

fn load_detector(cfg: &AppConfig) -> Result<RustfaceDetector, Box<dyn std::error::Error>> {
    let model = cfg
        .detector
        .model
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
    debug!("Loading face model {}", model.display());
    Ok(RustfaceDetector::from_file(&model, cfg.detector.min_face_size)?)
}
