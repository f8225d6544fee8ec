use clap::{Parser, Subcommand};
use imgprep::archive::{self, Delivery};
use imgprep::config::{self, ExportConfig, Overrides};
use imgprep::imaging::{ImageBackend, RustBackend};
use imgprep::pipeline::{self, PipelineParams};
use imgprep::{input, logging, output};
use std::path::{Path, PathBuf};

/// Inputs shared by every command that reads images.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Image files, directories (walked recursively), or ZIP archives
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Parser)]
#[command(name = "imgprep")]
#[command(about = "Batch image preparation for the web and Instagram")]
#[command(long_about = "\
Batch image preparation for the web and Instagram

Each image is converted to sRGB, downscaled to a target long edge (never
upscaled), optionally watermarked, and re-encoded as JPEG, WebP, or PNG.

Inputs:
  photo.jpg                         # jpg, jpeg, png, webp, tif, tiff
  shoot/                            # directories are walked recursively
  batch.zip                         # image entries inside the archive

Output:
  1 image   -> IMG_0001_web.jpg     # {name}{suffix}.{ext}
  2+ images -> exports_20240309_070542.zip

Presets (long edge):
  web 2048, instagram-post 1080, instagram-portrait 1350, instagram-story 1920

Settings come from ./imgprep.toml (or --config FILE) and can be overridden
per run with flags. Run 'imgprep gen-config' for a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./imgprep.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log per-image decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every image and write one file or a ZIP archive
    Export {
        #[command(flatten)]
        inputs: InputArgs,
        /// Directory for the exported file
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Process the first image and report size estimates
    Preview {
        #[command(flatten)]
        inputs: InputArgs,
        /// Also write the preview file here
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// List decodable images without processing them
    Check {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Print a stock imgprep.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let backend = RustBackend::new();

    match cli.command {
        Command::Export {
            inputs,
            out_dir,
            overrides,
        } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            let loaded = input::read_paths(&backend, &inputs.inputs);
            if loaded.images.is_empty() {
                println!("{}", output::NO_IMAGES_MESSAGE);
                return Ok(());
            }
            let params = pipeline_params(&backend, &config);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline::process_all(&backend, &loaded.images, &params, Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;

            let exported = result.outputs.len();
            let skipped = loaded.skipped.len() + result.skipped.len();
            let now = chrono::Local::now().naive_local();
            match archive::package(result.outputs, now)? {
                Some(delivery) => {
                    let path = archive::write_delivery(&delivery, &out_dir)?;
                    output::print_export(exported, skipped, &delivery, &path);
                }
                None => println!("{}", output::NO_IMAGES_MESSAGE),
            }
        }
        Command::Preview {
            inputs,
            out_dir,
            overrides,
        } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            let loaded = input::read_paths(&backend, &inputs.inputs);
            let Some(first) = loaded.images.first() else {
                println!("{}", output::NO_IMAGES_MESSAGE);
                return Ok(());
            };
            let params = pipeline_params(&backend, &config);

            let preview = pipeline::preview(&backend, first, &params)?;
            let written = match out_dir {
                Some(dir) => Some(archive::write_delivery(
                    &Delivery::Single(preview.output.clone()),
                    &dir,
                )?),
                None => None,
            };
            output::print_preview(&preview, written.as_deref());
        }
        Command::Check { inputs } => {
            let loaded = input::read_paths(&backend, &inputs.inputs);
            output::print_check(&loaded);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Stock defaults ← config file ← flags, resolved against the working directory.
fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<ExportConfig, config::ConfigError> {
    let cwd = std::env::current_dir()?;
    config::load_config(path, &cwd, overrides)
}

/// Resolve pipeline parameters, loading the watermark if one is configured.
///
/// A watermark that fails to load is logged and the run continues without it.
fn pipeline_params(backend: &impl ImageBackend, config: &ExportConfig) -> PipelineParams {
    let watermark = config
        .watermark
        .path
        .as_deref()
        .and_then(|path| input::read_watermark(backend, path));
    config.pipeline_params(watermark)
}
