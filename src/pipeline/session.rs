// src/pipeline/session.rs
//
// Owns every piece of placement state for one AR session and runs the
// per-frame pipeline:
//
//   raw anchor → decoder → stability → gate ─┬→ feedback
//                                            └→ pose query → selector → controller
//
// Single writer, one call at a time. Camera pose lookups are handed back to
// the caller as `PoseQuery` tickets and resolved later; a ticket from an older
// selection cycle, or one overtaken by a newer result for the same anchor, is
// dropped on arrival.

use crate::acceptance::{PlaneAcceptanceGate, PlaneCandidate};
use crate::anchor_decoder::{self, RawAnchorEvent};
use crate::feedback::map_feedback;
use crate::pipeline::event_bus::{EventBus, PlacementEvent};
use crate::pipeline::metrics::SessionMetrics;
use crate::placement::{is_benign_content_error, PlacementController, FALLBACK_ADVISORY};
use crate::stability::StabilityFilter;
use crate::surface_selector::{BestSurfaceSelector, SelectionOutcome};
use crate::types::{
    Alignment, AnchorObservation, CameraPose, Config, FeedbackConfig, ModelSpec, TrackingState,
    TrackingStatus,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq)]
pub enum PoseQueryPurpose {
    /// Compare a freshly accepted horizontal candidate against camera height
    HeightCheck(PlaneCandidate),
    /// Place in front of the camera after the fallback timer elapsed
    Fallback,
}

/// A deferred camera-pose lookup requested by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseQuery {
    pub id: u64,
    pub cycle: u64,
    pub purpose: PoseQueryPurpose,
}

pub struct PlacementSession {
    feedback_config: FeedbackConfig,
    tracking: TrackingState,
    plane_detected: bool,
    stability: StabilityFilter,
    gate: PlaneAcceptanceGate,
    selector: BestSurfaceSelector,
    controller: PlacementController,
    events: EventBus,
    metrics: SessionMetrics,
    next_query_id: u64,
    /// Newest resolved height check per anchor
    resolved_height_checks: HashMap<String, u64>,
    /// Last query id issued before each anchor was removed
    removed_anchors: HashMap<String, u64>,
    last_status: Option<TrackingStatus>,
}

impl PlacementSession {
    pub fn new(config: &Config) -> Self {
        Self {
            feedback_config: config.feedback.clone(),
            tracking: TrackingState::NotTracking,
            plane_detected: false,
            stability: StabilityFilter::new(&config.stability),
            gate: PlaneAcceptanceGate::new(&config.acceptance),
            selector: BestSurfaceSelector::new(&config.selector),
            controller: PlacementController::new(&config.placement),
            events: EventBus::new(config.placement.event_bus_capacity),
            metrics: SessionMetrics::new(),
            next_query_id: 0,
            resolved_height_checks: HashMap::new(),
            removed_anchors: HashMap::new(),
            last_status: None,
        }
    }

    // ========================================================================
    // INBOUND: TRACKING
    // ========================================================================

    pub fn on_tracking_updated(&mut self, raw: &Value) {
        self.set_tracking_state(anchor_decoder::decode_tracking_state(raw));
    }

    pub fn set_tracking_state(&mut self, state: TrackingState) {
        if state == self.tracking {
            return;
        }
        self.tracking = state;

        if state.is_normal() {
            info!("Tracking normal");
        } else {
            info!("Tracking lost, scanning");
            self.stability.reset_counts();
            self.events.publish(PlacementEvent::FeedbackUpdated(map_feedback(
                &self.feedback_config,
                0.0,
                false,
                None,
            )));
        }
        self.publish_status();
    }

    pub fn on_anchor(&mut self, raw: &RawAnchorEvent) -> Option<PoseQuery> {
        self.metrics.frames_processed += 1;
        let Some(observation) = anchor_decoder::decode(raw) else {
            debug!(
                "Skipping anchor {} with unknown alignment '{}'",
                raw.anchor_id, raw.alignment
            );
            return None;
        };
        self.process_observation(observation)
    }

    /// Runs one decoded observation through stability, acceptance and
    /// feedback. Returns a height check when a horizontal candidate is accepted.
    pub fn process_observation(&mut self, observation: AnchorObservation) -> Option<PoseQuery> {
        self.metrics.anchors_decoded += 1;

        let tracking_normal = self.tracking.is_normal();
        let alignment = observation.alignment;
        let extent = observation.extent;
        let has_center = observation.center.is_some();

        let stable_frames = self
            .stability
            .update(alignment, observation.center, tracking_normal);
        let (candidate, decision) = self.gate.score(observation, stable_frames, tracking_normal);

        debug!(
            "{} {} stable={} conf={:.2} accepted={}",
            alignment.as_str(),
            candidate.observation.source_id,
            stable_frames,
            decision.confidence,
            decision.accepted
        );

        if alignment == Alignment::Horizontal {
            let visible = tracking_normal && has_center;
            self.events.publish(PlacementEvent::FeedbackUpdated(map_feedback(
                &self.feedback_config,
                decision.confidence,
                visible,
                extent,
            )));
            if visible && !self.plane_detected {
                self.plane_detected = true;
                info!("First horizontal plane detected");
                self.publish_status();
            }
        }

        if !decision.accepted {
            return None;
        }
        self.metrics.accepted_candidates += 1;

        if alignment != Alignment::Horizontal || !has_center || self.controller.is_placed() {
            return None;
        }
        Some(self.issue_query(PoseQueryPurpose::HeightCheck(candidate)))
    }

    /// Forgets the anchor. Height checks issued before the removal are
    /// dropped when they resolve; a later re-detection starts over.
    pub fn on_anchor_removed(&mut self, anchor_id: &str) {
        self.selector.remove_source(anchor_id);
        self.resolved_height_checks.remove(anchor_id);
        self.removed_anchors
            .insert(anchor_id.to_string(), self.next_query_id);
    }

    // ========================================================================
    // INBOUND: MODEL SELECTION
    // ========================================================================

    /// Returns `false` when another model is still active; the selection is
    /// ignored and nothing is reset.
    pub fn select_model(&mut self, model: ModelSpec, now_ms: f64) -> bool {
        if self.controller.select_model(model, now_ms).is_none() {
            return false;
        }
        self.stability.reset();
        self.resolved_height_checks.clear();
        self.removed_anchors.clear();

        // A surface found while the user was still choosing is used right away
        if let Some(best) = self.selector.best().cloned() {
            self.commit_surface(&best);
        }
        self.publish_status();
        true
    }

    pub fn deselect_model(&mut self) {
        let model_id = self.controller.model().map(|m| m.id.clone());
        if !self.controller.deselect() {
            return;
        }
        self.stability.reset();
        self.selector.clear();
        self.resolved_height_checks.clear();
        self.removed_anchors.clear();

        if let Some(model_id) = model_id {
            self.events
                .publish(PlacementEvent::PlacementCleared { model_id });
        }
        self.publish_status();
    }

    /// Returns the fallback pose query once the timer has elapsed.
    pub fn poll_fallback(&mut self, now_ms: f64) -> Option<PoseQuery> {
        if self.controller.fallback_due(now_ms) {
            Some(self.issue_query(PoseQueryPurpose::Fallback))
        } else {
            None
        }
    }

    // ========================================================================
    // DEFERRED POSE RESULTS
    // ========================================================================

    pub fn resolve_pose_query(&mut self, query: PoseQuery, pose: Option<CameraPose>) {
        if query.cycle != self.controller.cycle() {
            self.drop_stale(&query, "selection changed");
            return;
        }

        match query.purpose {
            PoseQueryPurpose::HeightCheck(candidate) => {
                if self.controller.is_placed() {
                    self.metrics.stale_pose_results += 1;
                    debug!("Height check {} ignored, already placed", query.id);
                    return;
                }

                let source_id = candidate.observation.source_id.clone();
                if self
                    .removed_anchors
                    .get(&source_id)
                    .is_some_and(|&removed_after| query.id <= removed_after)
                {
                    self.metrics.stale_pose_results += 1;
                    debug!("Height check {} for removed anchor {} dropped", query.id, source_id);
                    return;
                }
                if self
                    .resolved_height_checks
                    .get(&source_id)
                    .is_some_and(|&newest| newest > query.id)
                {
                    self.metrics.stale_pose_results += 1;
                    debug!("Height check {} for {} superseded", query.id, source_id);
                    return;
                }
                self.resolved_height_checks.insert(source_id, query.id);

                let outcome = self
                    .selector
                    .consider(candidate, pose.map(|p| p.position.y));
                if matches!(
                    outcome,
                    SelectionOutcome::Adopted | SelectionOutcome::Replaced
                ) {
                    self.metrics.best_surface_changes += 1;
                }

                if self.controller.is_awaiting() {
                    if let Some(best) = self.selector.best().cloned() {
                        self.commit_surface(&best);
                    }
                }
            }
            PoseQueryPurpose::Fallback => {
                let Some(command) = self.controller.commit_fallback(pose.as_ref()) else {
                    self.metrics.stale_pose_results += 1;
                    debug!("Fallback {} ignored, already placed", query.id);
                    return;
                };
                self.metrics.fallback_commits += 1;
                self.events
                    .publish(PlacementEvent::PlacementCommitted(command));
                self.events
                    .publish(PlacementEvent::Advisory(FALLBACK_ADVISORY.to_string()));
                self.publish_status();
            }
        }
    }

    // ========================================================================
    // CONTENT ERRORS
    // ========================================================================

    pub fn report_content_error(&mut self, message: &str) {
        if is_benign_content_error(message) {
            self.metrics.suppressed_content_errors += 1;
            debug!("Suppressed benign content error: {}", message);
            return;
        }
        error!("Content load failed: {}", message);
        self.metrics.surfaced_content_errors += 1;
        self.events
            .publish(PlacementEvent::ContentLoadFailed(message.to_string()));
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn status(&self) -> TrackingStatus {
        TrackingStatus {
            is_tracking: self.tracking.is_normal(),
            plane_detected: self.plane_detected,
            anchor_found: self.controller.is_placed(),
        }
    }

    pub fn fallback_deadline_ms(&self) -> Option<f64> {
        self.controller.fallback_deadline_ms()
    }

    pub fn controller(&self) -> &PlacementController {
        &self.controller
    }

    pub fn best_surface(&self) -> Option<&PlaneCandidate> {
        self.selector.best()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn drain_events(&mut self) -> Vec<PlacementEvent> {
        self.events.drain()
    }

    /// Clears all retained state, e.g. when the host AR session is lost.
    pub fn reset(&mut self) {
        self.deselect_model();
        self.stability.reset();
        self.selector.clear();
        self.resolved_height_checks.clear();
        self.removed_anchors.clear();
        self.tracking = TrackingState::NotTracking;
        self.plane_detected = false;
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn issue_query(&mut self, purpose: PoseQueryPurpose) -> PoseQuery {
        self.next_query_id += 1;
        PoseQuery {
            id: self.next_query_id,
            cycle: self.controller.cycle(),
            purpose,
        }
    }

    fn commit_surface(&mut self, best: &PlaneCandidate) {
        if let Some(command) = self.controller.try_commit_surface(best) {
            self.metrics.surface_commits += 1;
            self.events
                .publish(PlacementEvent::PlacementCommitted(command));
            self.publish_status();
        }
    }

    fn drop_stale(&mut self, query: &PoseQuery, reason: &str) {
        self.metrics.stale_pose_results += 1;
        debug!(
            "Dropping pose result {} from cycle {} ({})",
            query.id, query.cycle, reason
        );
    }

    fn publish_status(&mut self) {
        let status = self.status();
        if self.last_status != Some(status) {
            self.last_status = Some(status);
            self.events.publish(PlacementEvent::TrackingUpdated(status));
        }
    }
}
