//! Evidence Capture CLI
//!
//! Demonstrates the capture pipeline against the mock host, and runs the
//! delivery compression on files from disk (the same routine the capture
//! flow applies to gallery imports).

use clap::{Parser, Subcommand};
use evidence_capture::{
    analysis::evaluate_quality,
    capture::CaptureEngine,
    compress::Compressor,
    config::FileConfig,
    host::{MockHost, MockSurface},
    session::SessionController,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "evidence-capture", version, about = "Camera capture and compression pipeline")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline against the mock camera host.
    Demo {
        /// Directory to write the captured artifact into.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Compress an image file for delivery.
    Compress {
        /// Input image path.
        input: PathBuf,
        /// Output path; defaults to `<stem>_compressed.jpg`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    info!("Evidence Capture v{}", evidence_capture::VERSION);

    let result = match cli.command {
        Command::Demo { save } => run_demo(config, save.as_deref()).await,
        Command::Compress { input, output } => run_compress(config, &input, output),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run_demo(config: FileConfig, save: Option<&Path>) -> Result<(), String> {
    info!("This is a demonstration using the mock camera host");

    let host = Arc::new(MockHost::with_cameras(2));
    let session = SessionController::new(host, config.session);
    session
        .start()
        .await
        .map_err(|e| format!("Failed to start camera session: {}", e))?;
    info!(
        facing = %session.facing(),
        cameras = session.available_cameras().len(),
        switchable = session.can_switch_facing(),
        "session ready"
    );

    let surface = MockSurface::gradient(1280, 720);
    let engine = CaptureEngine::new(config.capture);
    let frame = engine
        .capture(&session, &surface)
        .map_err(|e| format!("Capture failed: {}", e))?;

    match evaluate_quality(&frame) {
        Ok(score) => info!(grade = %score.grade, variance = score.variance, "photo quality"),
        Err(e) => warn!(error = %e, "quality evaluation failed"),
    }

    let artifact = Compressor::new(config.compression).compress(frame.delivery_bytes());
    println!(
        "Captured {}x{}, delivery artifact {} bytes ({} pass{})",
        artifact.width,
        artifact.height,
        artifact.final_size,
        artifact.pass_count,
        if artifact.pass_count == 1 { "" } else { "es" },
    );

    if let Some(dir) = save {
        let name = format!(
            "evidence_{}.jpg",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(name);
        std::fs::write(&path, &artifact.bytes)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        println!("Saved {}", path.display());
    }

    session.dispose();
    Ok(())
}

fn run_compress(config: FileConfig, input: &Path, output: Option<PathBuf>) -> Result<(), String> {
    let bytes =
        std::fs::read(input).map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;

    let result = Compressor::new(config.compression).compress(&bytes);
    if result.pass_count == 0 {
        warn!("input was not re-encoded; writing original bytes");
    }

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        input.with_file_name(format!("{stem}_compressed.jpg"))
    });
    std::fs::write(&output, &result.bytes)
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;

    println!(
        "{} -> {} ({:.2} MiB -> {:.2} MiB, {}% reduction, {} pass{})",
        input.display(),
        output.display(),
        result.original_size as f64 / (1024.0 * 1024.0),
        result.final_size as f64 / (1024.0 * 1024.0),
        result.reduction_percent(),
        result.pass_count,
        if result.pass_count == 1 { "" } else { "es" },
    );
    Ok(())
}
