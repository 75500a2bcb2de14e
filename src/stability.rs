// src/stability.rs
//
// Consecutive-frame positional stability of the most recently observed
// plane center, tracked separately per alignment. Small bounded jitter
// counts as the same surface; a large jump hard-resets the counter.
// Hosts that interleave updates from two planes of the same alignment reset
// the counter on every switch.

use crate::types::{Alignment, StabilityConfig, Vec3};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StabilityState {
    pub consecutive_stable_frames: u32,
    pub last_center: Option<Vec3>,
}

pub struct StabilityFilter {
    max_displacement: f32,
    frame_cap: u32,
    horizontal: StabilityState,
    vertical: StabilityState,
}

impl StabilityFilter {
    pub fn new(config: &StabilityConfig) -> Self {
        Self {
            max_displacement: config.max_displacement_m,
            frame_cap: config.frame_cap,
            horizontal: StabilityState::default(),
            vertical: StabilityState::default(),
        }
    }

    /// Feed one frame and return the stable frame count for `alignment`.
    ///
    /// * tracking not normal: counter resets, `last_center` untouched
    /// * no center this frame: counter unchanged
    /// * otherwise: in-tolerance movement increments (saturating), a jump resets
    pub fn update(
        &mut self,
        alignment: Alignment,
        center: Option<Vec3>,
        tracking_normal: bool,
    ) -> u32 {
        let max_displacement = self.max_displacement;
        let frame_cap = self.frame_cap;
        let state = self.state_mut(alignment);

        if !tracking_normal {
            state.consecutive_stable_frames = 0;
            return 0;
        }

        let Some(center) = center else {
            return state.consecutive_stable_frames;
        };

        match state.last_center {
            None => {
                state.consecutive_stable_frames = (state.consecutive_stable_frames + 1).min(frame_cap);
            }
            Some(last) => {
                let displacement = center.distance(&last);
                if displacement <= max_displacement {
                    state.consecutive_stable_frames =
                        (state.consecutive_stable_frames + 1).min(frame_cap);
                } else {
                    debug!(
                        "{} center jumped {:.3}m (limit {:.3}m), stability reset",
                        alignment.as_str(),
                        displacement,
                        max_displacement
                    );
                    state.consecutive_stable_frames = 0;
                }
            }
        }
        state.last_center = Some(center);
        state.consecutive_stable_frames
    }

    /// Tracking loss resets both alignments.
    pub fn reset_counts(&mut self) {
        self.horizontal.consecutive_stable_frames = 0;
        self.vertical.consecutive_stable_frames = 0;
    }

    pub fn reset(&mut self) {
        self.horizontal = StabilityState::default();
        self.vertical = StabilityState::default();
    }

    pub fn state(&self, alignment: Alignment) -> &StabilityState {
        match alignment {
            Alignment::Horizontal => &self.horizontal,
            Alignment::Vertical => &self.vertical,
        }
    }

    fn state_mut(&mut self, alignment: Alignment) -> &mut StabilityState {
        match alignment {
            Alignment::Horizontal => &mut self.horizontal,
            Alignment::Vertical => &mut self.vertical,
        }
    }
}
