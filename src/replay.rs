// src/replay.rs
//
// Recorded AR sessions: JSON lines of timestamped inbound events and camera
// poses, replayed through the async driver at the recorded pace.
//
//   {"t_ms": 0,   "event": {"type": "tracking_updated", "state": "TRACKING_NORMAL"}}
//   {"t_ms": 0,   "camera_pose": {"position": [0, 0, 0], "forward": [0, 0, -1]}}
//   {"t_ms": 33,  "event": {"type": "anchor_found", "anchor_id": "p1", ...}}

use crate::pipeline::driver::{run_session, CameraPoseSource, InboundEvent};
use crate::pipeline::event_bus::PlacementEvent;
use crate::pipeline::metrics::MetricsSummary;
use crate::types::{CameraPose, Config, ReplayConfig};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedLine {
    pub t_ms: u64,
    #[serde(default)]
    pub camera_pose: Option<CameraPose>,
    #[serde(default)]
    pub event: Option<InboundEvent>,
}

/// Camera pose source answering with the most recently recorded pose.
pub struct LatestPose(watch::Receiver<Option<CameraPose>>);

impl CameraPoseSource for LatestPose {
    fn camera_pose(&self) -> impl Future<Output = Option<CameraPose>> + Send {
        let pose = *self.0.borrow();
        async move { pose }
    }
}

pub fn find_recordings(config: &ReplayConfig) -> Result<Vec<PathBuf>> {
    let mut recordings = Vec::new();

    for entry in WalkDir::new(&config.input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(config.extension.as_str()) {
            recordings.push(path.to_path_buf());
        }
    }
    recordings.sort();

    info!("Found {} recording(s)", recordings.len());
    Ok(recordings)
}

pub fn load_recording(path: &Path) -> Result<Vec<RecordedLine>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    parse_recording(&contents).with_context(|| format!("Invalid recording {}", path.display()))
}

/// Parses JSON lines; blank lines and `#` comments are skipped. Timestamps
/// must not go backwards.
pub fn parse_recording(contents: &str) -> Result<Vec<RecordedLine>> {
    let mut lines = Vec::new();
    let mut last_t = 0;

    for (idx, raw) in contents.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line: RecordedLine = serde_json::from_str(trimmed)
            .with_context(|| format!("line {}: malformed record", idx + 1))?;
        if line.t_ms < last_t {
            bail!(
                "line {}: timestamp {}ms goes back before {}ms",
                idx + 1,
                line.t_ms,
                last_t
            );
        }
        last_t = line.t_ms;
        lines.push(line);
    }
    Ok(lines)
}

/// Replays `lines` through a fresh session and collects every outbound event.
pub async fn replay(
    config: &Config,
    lines: Vec<RecordedLine>,
) -> Result<(MetricsSummary, Vec<PlacementEvent>)> {
    let (pose_tx, pose_rx) = watch::channel(None);
    let (in_tx, in_rx) = mpsc::channel(256);
    let (out_tx, mut out_rx) = mpsc::channel(1024);

    let session = tokio::spawn(run_session(
        config.clone(),
        Arc::new(LatestPose(pose_rx)),
        in_rx,
        out_tx,
    ));

    let feeder = tokio::spawn(async move {
        let start = Instant::now();
        for line in lines {
            sleep_until(start + Duration::from_millis(line.t_ms)).await;
            if let Some(pose) = line.camera_pose {
                pose_tx.send_replace(Some(pose));
            }
            if let Some(event) = line.event {
                if in_tx.send(event).await.is_err() {
                    debug!("Session ended before recording finished");
                    break;
                }
            }
        }
    });

    let mut events = Vec::new();
    while let Some(event) = out_rx.recv().await {
        events.push(event);
    }

    let summary = session.await.context("Session task panicked")??;
    feeder.await.context("Feeder task panicked")?;
    Ok((summary, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlacementSource;

    const DESK_THEN_SELECT: &str = r#"
# scan the floor, then a desk, then pick a model
{"t_ms": 0, "event": {"type": "tracking_updated", "state": "TRACKING_NORMAL"}}
{"t_ms": 0, "camera_pose": {"position": [0.0, 0.0, 0.0], "forward": [0.0, 0.0, -1.0]}}
{"t_ms": 33, "event": {"type": "anchor_found", "anchor_id": "floor", "alignment": "Horizontal", "center": [0.0, -1.4, -1.0], "extent": [2.0, 2.0]}}
{"t_ms": 66, "event": {"type": "anchor_updated", "anchor_id": "floor", "alignment": "Horizontal", "center": [0.0, -1.4, -1.0], "extent": [2.0, 2.0]}}
{"t_ms": 99, "event": {"type": "anchor_updated", "anchor_id": "floor", "alignment": "Horizontal", "center": [0.0, -1.4, -1.0], "extent": [2.0, 2.0]}}
{"t_ms": 132, "event": {"type": "anchor_updated", "anchor_id": "floor", "alignment": "Horizontal", "center": [0.0, -1.4, -1.0], "extent": [2.0, 2.0]}}
{"t_ms": 165, "event": {"type": "anchor_updated", "anchor_id": "floor", "alignment": "Horizontal", "center": [0.0, -1.4, -1.0], "extent": [2.0, 2.0]}}
{"t_ms": 198, "event": {"type": "anchor_updated", "anchor_id": "floor", "alignment": "Horizontal", "center": [0.0, -1.4, -1.0], "extent": [2.0, 2.0]}}
{"t_ms": 231, "event": {"type": "anchor_found", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 264, "event": {"type": "anchor_updated", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 297, "event": {"type": "anchor_updated", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 330, "event": {"type": "anchor_updated", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 363, "event": {"type": "anchor_updated", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 396, "event": {"type": "anchor_updated", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 429, "event": {"type": "anchor_updated", "anchor_id": "desk", "alignment": "Horizontal", "center": [0.3, -0.7, -0.9], "extent": {"width": 0.9, "height": 0.6}}}
{"t_ms": 600, "event": {"type": "select_model", "model_id": "volcano"}}
"#;

    fn config() -> Config {
        Config::from_yaml(include_str!("../config.yaml")).unwrap()
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let lines = parse_recording(DESK_THEN_SELECT).unwrap();
        assert_eq!(lines.len(), 16);
        assert!(lines[1].camera_pose.is_some());
        assert!(lines[1].event.is_none());
    }

    #[test]
    fn test_parse_rejects_time_travel() {
        let text = "{\"t_ms\": 50}\n{\"t_ms\": 10}\n";
        let err = parse_recording(text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_reports_malformed_line() {
        assert!(parse_recording("{\"t_ms\": 0, \"event\": {\"type\": \"teleport\"}}").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_prefers_desk_over_floor() {
        let lines = parse_recording(DESK_THEN_SELECT).unwrap();
        let (summary, events) = replay(&config(), lines).await.unwrap();

        let placed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PlacementEvent::PlacementCommitted(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(
            placed[0].source,
            PlacementSource::Surface {
                source_id: "desk".to_string()
            }
        );
        // -0.7 plane, -0.03 volcano base offset
        assert!((placed[0].position.y + 0.73).abs() < 1e-5);
        assert_eq!(summary.surface_commits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_falls_back_without_planes() {
        let text = r#"
{"t_ms": 0, "event": {"type": "tracking_updated", "state": 3}}
{"t_ms": 0, "camera_pose": {"position": [0.0, 0.1, 0.0], "forward": [0.0, 0.0, -1.0]}}
{"t_ms": 10, "event": {"type": "select_model", "model_id": "heart"}}
"#;
        let (summary, events) = replay(&config(), parse_recording(text).unwrap())
            .await
            .unwrap();
        assert_eq!(summary.fallback_commits, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            PlacementEvent::PlacementCommitted(c) if c.source == PlacementSource::Fallback
        )));
    }
}
