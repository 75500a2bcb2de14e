// src/acceptance.rs
//
// Combines stability, extent and normal verticality into a binary
// acceptance decision plus a continuous confidence used only for feedback.
//
// Extent is never hard-required by default: some hosts never report it, so
// acceptance falls back to stability + normal alone. `ExtentCapability`
// makes that relaxation explicit instead of guessing from repeated `None`s.

use crate::types::{AcceptanceConfig, Alignment, AnchorObservation, Extent, ExtentCapability, Vec3};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub extent_known: bool,
    pub stable: bool,
    pub normal_ok: bool,
    pub accepted: bool,
    /// [0, 1], feedback only
    pub confidence: f32,
}

/// A scored observation, recomputed every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneCandidate {
    pub observation: AnchorObservation,
    pub confidence: f32,
    pub accepted: bool,
}

impl PlaneCandidate {
    pub fn height(&self) -> Option<f32> {
        self.observation.center.map(|c| c.y)
    }
}

pub struct PlaneAcceptanceGate {
    config: AcceptanceConfig,
    /// Latched once any extent is observed under `ExtentCapability::Auto`
    extent_seen: bool,
}

impl PlaneAcceptanceGate {
    pub fn new(config: &AcceptanceConfig) -> Self {
        Self {
            config: config.clone(),
            extent_seen: false,
        }
    }

    pub fn evaluate(
        &mut self,
        alignment: Alignment,
        stable_frames: u32,
        extent: Option<Extent>,
        up_normal: Option<Vec3>,
        tracking_normal: bool,
    ) -> GateDecision {
        if extent.is_some()
            && !self.extent_seen
            && self.config.extent_capability == ExtentCapability::Auto
        {
            self.extent_seen = true;
            info!("Host reports plane extent, acceptance now requires it");
        }

        let min_extent = self.config.min_extent_m;
        let extent_known = extent.map_or(false, |e| e.min_side() >= min_extent);
        let stable = stable_frames >= self.config.min_stable_frames;

        // Walls are expected to be vertical; only horizontal planes must face up.
        let normal_ok = match (alignment, up_normal) {
            (Alignment::Horizontal, Some(n)) => n.dot(&Vec3::UP) >= self.config.min_up_normal_y,
            _ => true,
        };

        let extent_ok = extent_known || (extent.is_none() && !self.extent_required());
        let accepted = tracking_normal && stable && extent_ok && normal_ok;

        GateDecision {
            extent_known,
            stable,
            normal_ok,
            accepted,
            confidence: self.confidence(stable_frames, extent),
        }
    }

    pub fn score(
        &mut self,
        observation: AnchorObservation,
        stable_frames: u32,
        tracking_normal: bool,
    ) -> (PlaneCandidate, GateDecision) {
        let decision = self.evaluate(
            observation.alignment,
            stable_frames,
            observation.extent,
            observation.up_normal,
            tracking_normal,
        );
        let candidate = PlaneCandidate {
            observation,
            confidence: decision.confidence,
            accepted: decision.accepted,
        };
        (candidate, decision)
    }

    fn extent_required(&self) -> bool {
        match self.config.extent_capability {
            ExtentCapability::Supported => true,
            ExtentCapability::Unsupported => false,
            ExtentCapability::Auto => self.extent_seen,
        }
    }

    fn confidence(&self, stable_frames: u32, extent: Option<Extent>) -> f32 {
        let required = self.config.min_stable_frames.max(1) as f32;
        let stable_fraction = (stable_frames as f32 / required).min(1.0);
        let extent_fraction = extent
            .map(|e| (e.min_side() / self.config.min_extent_m).clamp(0.0, 1.0))
            .unwrap_or(0.0);
        stable_fraction.max(extent_fraction)
    }
}
