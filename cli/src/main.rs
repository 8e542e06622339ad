//! `csrt` CLI: synthetic scene runs, log replay, configuration files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csrt_core::{CsrTracker, TrackState, TrackerConfig, TrackingMetrics};
use sim::replay::{load_log, save_log, FrameRecord, SequenceLog};
use sim::scenes::{Scene, SceneKind};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "csrt", about = "Correlation-filter tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the target of a synthetic scene and report metrics.
    RunScene {
        #[arg(value_enum)]
        scene: SceneKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Tracker configuration JSON (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the per-frame sequence log
        #[arg(long)]
        save_log: Option<PathBuf>,
    },
    /// Recompute metrics from a previously saved sequence log.
    Replay {
        /// Path to sequence log JSON file
        input: PathBuf,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration as JSON.
    DumpConfig {
        /// Destination file (stdout when omitted)
        output: Option<PathBuf>,
    },
    /// Parse and validate a configuration file.
    CheckConfig { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScene {
            scene,
            seed,
            config,
            output,
            save_log: log_path,
        } => {
            let config = match config {
                Some(path) => TrackerConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => TrackerConfig::default(),
            };
            run_scene(scene, seed, config, output.as_deref(), log_path.as_deref())?;
        }
        Commands::Replay { input, output } => {
            run_replay(&input, output.as_deref())?;
        }
        Commands::DumpConfig { output } => {
            let config = TrackerConfig::default();
            match output {
                Some(path) => {
                    config.save(&path)?;
                    println!("Config saved to {}", path.display());
                }
                None => println!("{}", config.to_json()?),
            }
        }
        Commands::CheckConfig { path } => {
            TrackerConfig::load(&path).with_context(|| format!("checking {}", path.display()))?;
            println!("{}: ok", path.display());
        }
    }

    Ok(())
}

fn run_scene(
    kind: SceneKind,
    seed: u64,
    config: TrackerConfig,
    output_path: Option<&Path>,
    log_path: Option<&Path>,
) -> Result<()> {
    let scene = Scene::build(kind, seed);
    println!(
        "Running scene '{}' (seed={}, frames={})...",
        scene.name, seed, scene.frames
    );

    let mut playback = scene.play();
    let (first, initial_bbox) = playback
        .next_frame()
        .context("scene has no frames")??;

    let mut tracker = CsrTracker::with_bundled(config.clone())?;
    let start = std::time::Instant::now();
    tracker.initialize(&first, initial_bbox, None)?;

    let mut metrics = TrackingMetrics::default();
    let mut records = Vec::with_capacity(scene.frames);
    for (index, item) in (1u64..).zip(playback) {
        let (frame, truth) = item?;
        let output = tracker.step(&frame)?;
        let drift = output.state == TrackState::DriftSuspected;
        let score = metrics.accumulate(&output.bbox, &truth, drift);
        if drift {
            info!(frame = index, error = score.center_error, "drift suspected");
        }
        records.push(FrameRecord { index, truth, output });
    }

    let elapsed = start.elapsed();
    print_summary(&metrics, elapsed.as_secs_f64());

    if let Some(lpath) = log_path {
        let log = SequenceLog {
            scene_name: scene.name.clone(),
            seed,
            config,
            initial_bbox,
            frames: records,
        };
        save_log(&log, lpath)?;
        println!("Sequence log saved to {}", lpath.display());
    }

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scene": scene.name,
            "seed": seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "metrics": metrics,
            "mean_center_error": metrics.mean_center_error(),
            "rmse_center": metrics.rmse_center(),
            "mean_iou": metrics.mean_iou(),
            "precision": metrics.precision(),
            "success_rate": metrics.success_rate(),
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(input: &Path, output_path: Option<&Path>) -> Result<()> {
    let log = load_log(input)?;
    println!(
        "Replaying '{}' ({} frames)...",
        log.scene_name,
        log.frames.len()
    );

    let mut metrics = TrackingMetrics::default();
    for record in &log.frames {
        metrics.accumulate(
            &record.output.bbox,
            &record.truth,
            record.output.state == TrackState::DriftSuspected,
        );
    }
    let tracked_us: u64 = log.frames.iter().map(|r| r.output.elapsed_us).sum();
    print_summary(&metrics, tracked_us as f64 * 1e-6);

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scene": log.scene_name,
            "seed": log.seed,
            "metrics": metrics,
            "precision": metrics.precision(),
            "success_rate": metrics.success_rate(),
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
    }

    Ok(())
}

fn print_summary(metrics: &TrackingMetrics, elapsed_s: f64) {
    println!(
        "Done: {} frames, elapsed={:.2}s ({:.1} fps)",
        metrics.n_frames,
        elapsed_s,
        if elapsed_s > 0.0 { metrics.n_frames as f64 / elapsed_s } else { 0.0 },
    );
    println!(
        "Center error: mean {:.2}px, rmse {:.2}px, max {:.2}px",
        metrics.mean_center_error(),
        metrics.rmse_center(),
        metrics.max_center_err,
    );
    println!(
        "Precision@20px {:.3}, success@0.5 {:.3}, mean IoU {:.3}, drift frames {}",
        metrics.precision(),
        metrics.success_rate(),
        metrics.mean_iou(),
        metrics.drift_frames,
    );
}
