// src/surface_selector.rs
//
// Chooses between simultaneously visible horizontal surfaces.
//
// Relative to camera height:
//   both at/below camera  → higher wins (desk over floor)
//   below vs above        → below wins
//   both above camera     → lower wins (nearest shelf)
//   no camera height      → higher wins, by a minimum margin
// Anything outside the height band around the camera is discarded.

use crate::acceptance::PlaneCandidate;
use crate::types::SelectorConfig;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// No previous best
    Adopted,
    /// Beat the previous best
    Replaced,
    /// Same source as the current best, updated in place
    Refreshed,
    /// Previous best retained
    Kept,
    /// Outside the plausible height band
    OutOfBand,
    /// Not accepted, or no known center
    Ineligible,
}

impl SelectionOutcome {
    pub fn changed_best(&self) -> bool {
        matches!(
            self,
            SelectionOutcome::Adopted | SelectionOutcome::Replaced | SelectionOutcome::Refreshed
        )
    }
}

pub struct BestSurfaceSelector {
    config: SelectorConfig,
    best: Option<PlaneCandidate>,
}

impl BestSurfaceSelector {
    pub fn new(config: &SelectorConfig) -> Self {
        Self {
            config: config.clone(),
            best: None,
        }
    }

    pub fn consider(&mut self, candidate: PlaneCandidate, camera_y: Option<f32>) -> SelectionOutcome {
        let Some(candidate_y) = candidate.height().filter(|_| candidate.accepted) else {
            return SelectionOutcome::Ineligible;
        };

        if let Some(cam_y) = camera_y {
            if (candidate_y - cam_y).abs() > self.config.height_band_m {
                debug!(
                    "Plane {} at y={:.2} outside {:.1}m band around camera y={:.2}",
                    candidate.observation.source_id, candidate_y, self.config.height_band_m, cam_y
                );
                return SelectionOutcome::OutOfBand;
            }
        }

        let outcome = match &self.best {
            None => SelectionOutcome::Adopted,
            Some(best) if best.observation.source_id == candidate.observation.source_id => {
                SelectionOutcome::Refreshed
            }
            Some(best) => {
                let best_y = best.height().unwrap_or(f32::NEG_INFINITY);
                if self.prefers(candidate_y, best_y, camera_y) {
                    SelectionOutcome::Replaced
                } else {
                    SelectionOutcome::Kept
                }
            }
        };

        match outcome {
            SelectionOutcome::Adopted | SelectionOutcome::Replaced => {
                info!(
                    "🎯 Best surface now {} at y={:.2} ({:?})",
                    candidate.observation.source_id, candidate_y, outcome
                );
                self.best = Some(candidate);
            }
            SelectionOutcome::Refreshed => {
                self.best = Some(candidate);
            }
            _ => {}
        }
        outcome
    }

    fn prefers(&self, candidate_y: f32, best_y: f32, camera_y: Option<f32>) -> bool {
        let Some(cam_y) = camera_y else {
            return candidate_y > best_y + self.config.no_camera_margin_m;
        };

        let candidate_below = candidate_y <= cam_y;
        let best_below = best_y <= cam_y;
        match (candidate_below, best_below) {
            (true, true) => candidate_y > best_y,
            (true, false) => true,
            (false, true) => false,
            (false, false) => candidate_y < best_y,
        }
    }

    /// Drops the best candidate if it came from `source_id`.
    pub fn remove_source(&mut self, source_id: &str) -> bool {
        if self
            .best
            .as_ref()
            .is_some_and(|b| b.observation.source_id == source_id)
        {
            info!("Best surface {} removed by host", source_id);
            self.best = None;
            return true;
        }
        false
    }

    pub fn best(&self) -> Option<&PlaneCandidate> {
        self.best.as_ref()
    }

    pub fn clear(&mut self) {
        self.best = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alignment, AnchorObservation, Vec3};

    fn candidate(id: &str, y: f32) -> PlaneCandidate {
        PlaneCandidate {
            observation: AnchorObservation {
                alignment: Alignment::Horizontal,
                center: Some(Vec3::new(0.0, y, -1.0)),
                anchor_position: None,
                extent: None,
                up_normal: None,
                rotation_euler: None,
                source_id: id.to_string(),
            },
            confidence: 1.0,
            accepted: true,
        }
    }

    fn selector() -> BestSurfaceSelector {
        BestSurfaceSelector::new(&SelectorConfig {
            height_band_m: 2.0,
            no_camera_margin_m: 0.05,
        })
    }

    fn best_y(s: &BestSurfaceSelector) -> Option<f32> {
        s.best().and_then(|b| b.height())
    }

    #[test]
    fn test_higher_below_camera_wins_in_either_order() {
        let mut s = selector();
        s.consider(candidate("desk", 0.8), Some(1.0));
        assert_eq!(s.consider(candidate("floor", 0.5), Some(1.0)), SelectionOutcome::Kept);
        assert_eq!(best_y(&s), Some(0.8));

        let mut s = selector();
        s.consider(candidate("floor", 0.5), Some(1.0));
        assert_eq!(s.consider(candidate("desk", 0.8), Some(1.0)), SelectionOutcome::Replaced);
        assert_eq!(best_y(&s), Some(0.8));
    }

    #[test]
    fn test_below_beats_above() {
        let mut s = selector();
        s.consider(candidate("shelf", 1.6), Some(1.2));
        assert_eq!(s.consider(candidate("table", 0.7), Some(1.2)), SelectionOutcome::Replaced);
        assert_eq!(s.consider(candidate("cabinet", 1.4), Some(1.2)), SelectionOutcome::Kept);
        assert_eq!(best_y(&s), Some(0.7));
    }

    #[test]
    fn test_lowest_above_camera_wins() {
        let mut s = selector();
        s.consider(candidate("high", 2.0), Some(1.0));
        assert_eq!(s.consider(candidate("low", 1.5), Some(1.0)), SelectionOutcome::Replaced);
        assert_eq!(best_y(&s), Some(1.5));
    }

    #[test]
    fn test_out_of_band_never_selected() {
        let mut s = selector();
        assert_eq!(s.consider(candidate("roof", 5.0), Some(1.0)), SelectionOutcome::OutOfBand);
        assert!(s.best().is_none());
    }

    #[test]
    fn test_without_camera_needs_margin() {
        let mut s = selector();
        s.consider(candidate("floor", 0.0), None);
        assert_eq!(s.consider(candidate("rug", 0.03), None), SelectionOutcome::Kept);
        assert_eq!(s.consider(candidate("desk", 0.7), None), SelectionOutcome::Replaced);
        assert_eq!(best_y(&s), Some(0.7));
    }

    #[test]
    fn test_same_source_refreshes() {
        let mut s = selector();
        s.consider(candidate("desk", 0.8), Some(1.0));
        assert_eq!(s.consider(candidate("desk", 0.79), Some(1.0)), SelectionOutcome::Refreshed);
        assert_eq!(best_y(&s), Some(0.79));
    }

    #[test]
    fn test_unaccepted_or_centerless_ineligible() {
        let mut s = selector();
        let mut c = candidate("a", 0.5);
        c.accepted = false;
        assert_eq!(s.consider(c, Some(1.0)), SelectionOutcome::Ineligible);
        let mut c = candidate("b", 0.5);
        c.observation.center = None;
        assert_eq!(s.consider(c, Some(1.0)), SelectionOutcome::Ineligible);
    }

    #[test]
    fn test_remove_source() {
        let mut s = selector();
        s.consider(candidate("desk", 0.8), Some(1.0));
        assert!(!s.remove_source("floor"));
        assert!(s.remove_source("desk"));
        assert!(s.best().is_none());
    }
}
