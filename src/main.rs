// src/main.rs

use anyhow::Result;
use std::path::Path;
use surface_placement::pipeline::{MetricsSummary, PlacementEvent};
use surface_placement::replay;
use surface_placement::types::{Config, PlacementSource};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "surface_placement={0},placement_replay={0}",
            config.logging.level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🧭 Surface Placement Replay Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Acceptance: {} stable frames, extent {:?}, {} model(s) in catalog",
        config.acceptance.min_stable_frames,
        config.acceptance.extent_capability,
        config.models.len()
    );

    let recordings = replay::find_recordings(&config.replay)?;
    if recordings.is_empty() {
        error!("No recordings found in {}", config.replay.input_dir);
        return Ok(());
    }

    for (idx, path) in recordings.iter().enumerate() {
        info!("========================================");
        info!(
            "Replaying recording {}/{}: {}",
            idx + 1,
            recordings.len(),
            path.display()
        );
        info!("========================================");

        match replay_one(path, &config).await {
            Ok(summary) => report(&summary),
            Err(e) => error!("Failed to replay {}: {:#}", path.display(), e),
        }
    }

    Ok(())
}

async fn replay_one(path: &Path, config: &Config) -> Result<MetricsSummary> {
    let lines = replay::load_recording(path)?;
    info!("✓ Loaded {} record(s)", lines.len());

    let (summary, events) = replay::replay(config, lines).await?;
    for event in &events {
        match event {
            PlacementEvent::PlacementCommitted(cmd) => {
                let origin = match &cmd.source {
                    PlacementSource::Surface { source_id } => format!("surface {}", source_id),
                    PlacementSource::Fallback => "camera fallback".to_string(),
                };
                info!(
                    "🎯 Placed '{}' at ({:.3}, {:.3}, {:.3}) scale {:.3} via {}",
                    cmd.model_id,
                    cmd.position.x,
                    cmd.position.y,
                    cmd.position.z,
                    cmd.scale.x,
                    origin
                );
            }
            PlacementEvent::PlacementCleared { model_id } => info!("Cleared '{}'", model_id),
            PlacementEvent::Advisory(text) => warn!("⚠️  {}", text),
            PlacementEvent::ContentLoadFailed(message) => error!("Content failed: {}", message),
            PlacementEvent::FeedbackUpdated(_) | PlacementEvent::TrackingUpdated(_) => {}
        }
    }
    Ok(summary)
}

fn report(summary: &MetricsSummary) {
    info!("✓ Recording replayed");
    info!("  Frames processed: {}", summary.frames_processed);
    info!(
        "  Anchors accepted: {}/{} ({:.1}%)",
        summary.accepted_candidates,
        summary.anchors_decoded,
        100.0 * summary.acceptance_rate
    );
    info!("  Surface placements: {}", summary.surface_commits);
    if summary.fallback_commits > 0 {
        warn!("  Fallback placements: {}", summary.fallback_commits);
    }
    if summary.stale_pose_results > 0 {
        info!("  Stale pose results dropped: {}", summary.stale_pose_results);
    }
    match serde_json::to_string(summary) {
        Ok(json) => info!("  Summary: {}", json),
        Err(e) => warn!("Could not serialize summary: {}", e),
    }
}
