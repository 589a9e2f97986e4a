//! Storyreel CLI Tool
//!
//! Command-line interface for assembling per-scene illustrations and
//! narration into a single video.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use storyreel_core::{AssetLocator, DEFAULT_OUTPUT_FILENAME};
use storyreel_encoder::{FfmpegExporter, FileMediaLoader, Pipeline};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "storyreel")]
#[command(about = "Storyreel - Assemble scene illustrations and narration into a video")]
#[command(version)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a project directory into a video
    Assemble {
        /// Directory holding scene_<n>.jpg and scene_<n>.mp3 files
        project_dir: PathBuf,

        /// Scene numbers in playback order (default: every scene found)
        #[arg(long, value_delimiter = ',')]
        scenes: Option<Vec<u32>>,

        /// Output file name, written inside the project directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_FILENAME)]
        output: String,

        /// Print the assembly report as JSON
        #[arg(long)]
        report: bool,
    },

    /// List the scenes found in a project directory
    Scan {
        /// Directory holding scene_<n>.jpg and scene_<n>.mp3 files
        project_dir: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

fn init_logging(level: LogLevel) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.to_string().parse()?)
        .from_env_lossy();

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Commands::Assemble {
            project_dir,
            scenes,
            output,
            report,
        } => assemble(&project_dir, scenes, &output, report)?,

        Commands::Scan { project_dir } => scan(&project_dir)?,
    }

    Ok(())
}

fn scene_numbers(project_dir: &Path, scenes: Option<Vec<u32>>) -> Result<Vec<u32>> {
    if let Some(scenes) = scenes {
        return Ok(scenes);
    }

    let found = AssetLocator::new(project_dir)
        .discover_scenes()
        .with_context(|| format!("Failed to scan {}", project_dir.display()))?;
    if found.is_empty() {
        bail!("No scene assets found in {}", project_dir.display());
    }
    debug!("Discovered scenes {found:?}");
    Ok(found)
}

fn assemble(
    project_dir: &Path,
    scenes: Option<Vec<u32>>,
    output: &str,
    print_report: bool,
) -> Result<()> {
    if !project_dir.is_dir() {
        bail!("{} is not a directory", project_dir.display());
    }

    let scenes = scene_numbers(project_dir, scenes)?;
    info!("Assembling {} scenes from {}", scenes.len(), project_dir.display());

    let pipeline = Pipeline::new(FileMediaLoader, FfmpegExporter::new());
    let report = pipeline
        .run(project_dir, &scenes, output)
        .context("Failed to assemble video")?;

    if print_report {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        println!(
            "Wrote {} ({:.2}s, {} scenes, {} degraded)",
            report.output_path.display(),
            report.total_duration,
            report.scenes.len(),
            report.degraded_scenes()
        );
    }

    Ok(())
}

fn scan(project_dir: &Path) -> Result<()> {
    let locator = AssetLocator::new(project_dir);
    let scenes = locator
        .discover_scenes()
        .with_context(|| format!("Failed to scan {}", project_dir.display()))?;

    println!("Project: {}", project_dir.display());
    println!("Scenes: {}", scenes.len());
    for scene_number in scenes {
        let assets = locator.locate(scene_number);
        println!(
            "  scene {:>3}  image: {:<7}  audio: {}",
            scene_number,
            presence(assets.image_exists()),
            presence(assets.audio_exists())
        );
    }

    Ok(())
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "missing"
    }
}
