// src/pipeline/metrics.rs
//
// Per-session counters, summarized at the end of a session or replay.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub frames_processed: u64,
    pub anchors_decoded: u64,
    pub accepted_candidates: u64,
    pub best_surface_changes: u64,
    pub surface_commits: u64,
    pub fallback_commits: u64,
    pub stale_pose_results: u64,
    pub suppressed_content_errors: u64,
    pub surfaced_content_errors: u64,
    pub started_at: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: 0,
            anchors_decoded: 0,
            accepted_candidates: 0,
            best_surface_changes: 0,
            surface_commits: 0,
            fallback_commits: 0,
            stale_pose_results: 0,
            suppressed_content_errors: 0,
            surfaced_content_errors: 0,
            started_at: Instant::now(),
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.anchors_decoded == 0 {
            0.0
        } else {
            self.accepted_candidates as f64 / self.anchors_decoded as f64
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed,
            anchors_decoded: self.anchors_decoded,
            accepted_candidates: self.accepted_candidates,
            acceptance_rate: self.acceptance_rate(),
            best_surface_changes: self.best_surface_changes,
            surface_commits: self.surface_commits,
            fallback_commits: self.fallback_commits,
            stale_pose_results: self.stale_pose_results,
            suppressed_content_errors: self.suppressed_content_errors,
            surfaced_content_errors: self.surfaced_content_errors,
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub anchors_decoded: u64,
    pub accepted_candidates: u64,
    pub acceptance_rate: f64,
    pub best_surface_changes: u64,
    pub surface_commits: u64,
    pub fallback_commits: u64,
    pub stale_pose_results: u64,
    pub suppressed_content_errors: u64,
    pub surfaced_content_errors: u64,
    pub elapsed_secs: f64,
}
