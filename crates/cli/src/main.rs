//! bandcalc CLI - spectral band algebra with GeoTIFF output and PNG previews
//!
//! Every command prints its structured result as one JSON object per line on
//! stdout; logs and spinners go to stderr.

mod naming;
mod report;
mod run;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use bandcalc_colormap::{ColorScheme, PreviewOptions, DEFAULT_MAX_SIZE};

use naming::{default_prefix, OutputNaming};
use report::{FailureRecord, JsonLineSink, ResultSink};
use run::{execute, inspect_bands, inspect_roles, render_standalone, Operation, RunRequest};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bandcalc")]
#[command(
    author,
    version,
    about = "Spectral band algebra for multiband GeoTIFFs",
    long_about = None
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Root directory for TRANSFORM/, Calculator/ and COMPOSITE/ outputs
    #[arg(long, global = true, env = "BANDCALC_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct RenderArgs {
    /// Longer preview side in pixels
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_preview: u32,
    /// Color scheme for single-band previews: jet, grayscale, ndvi, water, divergent
    #[arg(long, default_value = "jet", value_parser = parse_scheme)]
    colormap: ColorScheme,
}

impl RenderArgs {
    fn options(&self) -> PreviewOptions {
        PreviewOptions::default()
            .with_max_size(self.max_preview)
            .with_scheme(self.colormap)
    }
}

#[derive(Args, Clone)]
struct PreviewArgs {
    #[command(flatten)]
    render: RenderArgs,
    /// Skip the PNG preview
    #[arg(long)]
    no_preview: bool,
}

impl PreviewArgs {
    fn options(&self) -> Option<PreviewOptions> {
        (!self.no_preview).then(|| self.render.options())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a named spectral index (NDVI, EVI, TCI, ...)
    Index {
        /// Input multiband GeoTIFF
        #[arg(short, long)]
        input: PathBuf,
        /// Index identifier (case-insensitive)
        #[arg(short, long)]
        algo: String,
        /// Output name prefix (default: input file stem)
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        preview: PreviewArgs,
    },
    /// Evaluate a band expression such as "(b5-b4)/(b5+b4)"
    Calc {
        /// Input multiband GeoTIFF
        #[arg(short, long)]
        input: PathBuf,
        /// Expression over b1..bN
        #[arg(short, long)]
        formula: String,
        /// Output name prefix (default: input file stem)
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        preview: PreviewArgs,
    },
    /// Build an RGB composite from three bands
    Composite {
        /// Input multiband GeoTIFF
        #[arg(short, long)]
        input: PathBuf,
        /// Red band (1-based)
        #[arg(short, long)]
        red: usize,
        /// Green band (1-based)
        #[arg(short, long)]
        green: usize,
        /// Blue band (1-based)
        #[arg(short, long)]
        blue: usize,
        /// Output scaling: raw, stretch, display
        #[arg(short, long, default_value = "raw")]
        mode: String,
        /// Explicit output path (default: COMPOSITE/<name>/...)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output name prefix (default: input file stem)
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        preview: PreviewArgs,
    },
    /// List band labels of a raster
    Bands {
        /// Input raster file
        input: PathBuf,
    },
    /// Show the band role mapping that index runs would use
    Roles {
        /// Input raster file
        input: PathBuf,
    },
    /// Render the PNG preview of an existing raster
    Preview {
        /// Input raster file
        input: PathBuf,
        /// Output PNG file
        output: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn parse_scheme(s: &str) -> std::result::Result<ColorScheme, String> {
    s.parse().map_err(|e: bandcalc_core::Error| e.to_string())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn request(
    output_dir: PathBuf,
    input: PathBuf,
    name: Option<String>,
    operation: Operation,
    preview: &PreviewArgs,
) -> RunRequest {
    let prefix = name.unwrap_or_else(|| default_prefix(&input));
    RunRequest {
        naming: OutputNaming::new(output_dir, prefix),
        input,
        operation,
        preview: preview.options(),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let mut sink = JsonLineSink::new(io::stdout().lock());

    let success = match cli.command {
        Commands::Index {
            input,
            algo,
            name,
            preview,
        } => {
            let req = request(cli.output_dir, input, name, Operation::Index { algo }, &preview);
            execute(&req, &mut sink)?.is_success()
        }

        Commands::Calc {
            input,
            formula,
            name,
            preview,
        } => {
            let req = request(
                cli.output_dir,
                input,
                name,
                Operation::Expression { formula },
                &preview,
            );
            execute(&req, &mut sink)?.is_success()
        }

        Commands::Composite {
            input,
            red,
            green,
            blue,
            mode,
            output,
            name,
            preview,
        } => {
            let operation = Operation::Composite {
                bands: [red, green, blue],
                mode,
                output,
            };
            let req = request(cli.output_dir, input, name, operation, &preview);
            execute(&req, &mut sink)?.is_success()
        }

        Commands::Bands { input } => {
            let report = inspect_bands(&input);
            sink.emit(&report)?;
            report.is_success()
        }

        Commands::Roles { input } => match inspect_roles(&input) {
            Ok(info) => {
                sink.emit(&info)?;
                true
            }
            Err(e) => {
                sink.emit(&FailureRecord::new(e.to_string()))?;
                false
            }
        },

        Commands::Preview {
            input,
            output,
            render,
        } => {
            let result = render_standalone(&input, &output, &render.options());
            sink.emit(&result)?;
            result.is_success()
        }
    };

    Ok(exit_code(success))
}
