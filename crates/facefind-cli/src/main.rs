use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facefind_core::session::RunTracker;
use facefind_core::{
    BatchMatcher, DetectionMethod, MatchSessionStats, MediaItem, ProviderHandle, SelfieValidator,
    ValidationResult,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

mod config;
mod manifest;

use config::Config;
use manifest::ManifestProvider;

#[derive(Parser)]
#[command(name = "facefind", about = "Find yourself in an event photo gallery")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show face model status
    Status {
        /// Detection manifest (JSON) standing in for the face models
        #[arg(long)]
        detections: PathBuf,
    },
    /// Check a selfie's face and image quality
    Validate {
        selfie: PathBuf,
        #[arg(long)]
        detections: PathBuf,
    },
    /// Find photos in a media collection that contain the selfie's face
    Match {
        selfie: PathBuf,
        /// Media collection (JSON array of {id, url, type})
        #[arg(long)]
        media: PathBuf,
        #[arg(long)]
        detections: PathBuf,
        /// Minimum match confidence, 0-100
        #[arg(long)]
        threshold: Option<f32>,
        /// Disable pose-aware confidence adjustment
        #[arg(long)]
        no_angle_matching: bool,
        /// Detector choice: tiny, accurate or both
        #[arg(long)]
        method: Option<DetectionMethod>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Status { detections } => {
            let provider = init_provider(&detections).await?;
            print_json(provider.report())?;
        }
        Commands::Validate { selfie, detections } => {
            let provider = init_provider(&detections).await?;
            let result = validate_selfie(&config, &provider, &selfie).await?;
            print_json(&result)?;
            print_guidance(&result);
        }
        Commands::Match {
            selfie,
            media,
            detections,
            threshold,
            no_angle_matching,
            method,
        } => {
            if let Some(threshold) = threshold {
                config.matching.match_threshold = threshold;
            }
            if no_angle_matching {
                config.matching.enable_angle_matching = false;
            }
            if let Some(method) = method {
                config.matching.detection_method = method;
            }
            config.validate()?;

            let media = load_media(&media)?;
            let provider = init_provider(&detections).await?;
            let validation = validate_selfie(&config, &provider, &selfie).await?;
            print_guidance(&validation);
            let Some(reference) = validation.reference() else {
                bail!("selfie has no usable face; upload a clearer photo");
            };

            let tracker = RunTracker::new();
            let run_id = tracker.begin();
            let total = media.iter().filter(|m| m.is_image()).count();
            let (tx, rx) = mpsc::unbounded_channel();
            let printer = tokio::spawn(print_progress(rx, total));

            let outcome = BatchMatcher::new(provider)
                .run_match_session(run_id, Some(&reference), &media, &config.matching, Some(&tx))
                .await
                .context("could not complete matching")?;
            drop(tx);
            join_progress(printer).await;

            if let Some(outcome) = tracker.accept(run_id, outcome) {
                print_json(&outcome)?;
                if let Some(hint) = outcome.hint() {
                    eprintln!("{hint}");
                }
            }
        }
    }

    Ok(())
}

async fn init_provider(detections: &Path) -> Result<ProviderHandle> {
    let provider = ManifestProvider::load(detections)?;
    Ok(ProviderHandle::initialize(Arc::new(provider)).await)
}

async fn validate_selfie(config: &Config, provider: &ProviderHandle, path: &Path) -> Result<ValidationResult> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read selfie {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let validator = SelfieValidator::new(
        config.quality.clone(),
        config.matching.detector,
        config.matching.detect_timeout(),
    );
    Ok(validator.validate(provider, &name, &bytes).await?)
}

fn load_media(path: &Path) -> Result<Vec<MediaItem>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read media list {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse media list {}", path.display()))
}

async fn print_progress(mut rx: mpsc::UnboundedReceiver<MatchSessionStats>, total: usize) {
    while let Some(stats) = rx.recv().await {
        eprintln!(
            "processed {}/{} images, {} with matches",
            stats.images_processed, total, stats.images_with_matches
        );
    }
}

/// Wait for the progress printer; returns false if it panicked or was cancelled.
async fn join_progress(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "progress printer aborted");
            false
        }
    }
}

fn print_guidance(result: &ValidationResult) {
    for issue in &result.issues {
        eprintln!("- {issue}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_progress_drains_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(print_progress(rx, 3));
        tx.send(MatchSessionStats::progress(3, 1)).unwrap();
        drop(tx);
        assert!(join_progress(printer).await);
    }

    #[tokio::test]
    async fn test_join_progress_reports_aborted_task() {
        let printer = tokio::spawn(std::future::pending::<()>());
        printer.abort();
        assert!(!join_progress(printer).await);
    }
}
