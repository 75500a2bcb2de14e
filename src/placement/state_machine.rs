// src/placement/state_machine.rs
//
// One-shot placement per model selection.
//
//   Idle ──select──▶ AwaitingSurface ──surface or fallback──▶ Placed
//    ▲                      │                                   │
//    └──────deselect────────┴───────────────deselect────────────┘
//
// Every selection or deselection bumps `cycle`; deferred work tagged with an
// older cycle is stale and must not act.

use super::position_calculator::{fallback_position, flush_position, surface_scale};
use crate::acceptance::PlaneCandidate;
use crate::types::{
    Alignment, CameraPose, ModelSpec, PlacementCommand, PlacementConfig, PlacementSource,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementState {
    Idle,
    AwaitingSurface {
        model: ModelSpec,
        deadline_ms: f64,
        fallback_requested: bool,
    },
    Placed {
        model: ModelSpec,
        command: PlacementCommand,
    },
}

impl PlacementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementState::Idle => "IDLE",
            PlacementState::AwaitingSurface { .. } => "AWAITING_SURFACE",
            PlacementState::Placed { .. } => "PLACED",
        }
    }
}

pub struct PlacementController {
    config: PlacementConfig,
    state: PlacementState,
    cycle: u64,
}

impl PlacementController {
    pub fn new(config: &PlacementConfig) -> Self {
        Self {
            config: config.clone(),
            state: PlacementState::Idle,
            cycle: 0,
        }
    }

    pub fn state(&self) -> &PlacementState {
        &self.state
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, PlacementState::AwaitingSurface { .. })
    }

    pub fn is_placed(&self) -> bool {
        matches!(self.state, PlacementState::Placed { .. })
    }

    pub fn command(&self) -> Option<&PlacementCommand> {
        match &self.state {
            PlacementState::Placed { command, .. } => Some(command),
            _ => None,
        }
    }

    pub fn model(&self) -> Option<&ModelSpec> {
        match &self.state {
            PlacementState::Idle => None,
            PlacementState::AwaitingSurface { model, .. } | PlacementState::Placed { model, .. } => {
                Some(model)
            }
        }
    }

    /// Fallback deadline while it is still armed.
    pub fn fallback_deadline_ms(&self) -> Option<f64> {
        match self.state {
            PlacementState::AwaitingSurface {
                deadline_ms,
                fallback_requested: false,
                ..
            } => Some(deadline_ms),
            _ => None,
        }
    }

    /// Starts a fresh cycle for `model`. Only valid from `Idle`; a selection
    /// while another model is active is ignored and returns `None`.
    pub fn select_model(&mut self, model: ModelSpec, now_ms: f64) -> Option<u64> {
        if let Some(active) = self.model() {
            warn!(
                "Model '{}' selected while '{}' is {}, ignoring until it is removed",
                model.id,
                active.id,
                self.state.as_str()
            );
            return None;
        }
        self.cycle += 1;
        let deadline_ms = now_ms + self.config.fallback_timeout_ms as f64;
        info!(
            "Model '{}' selected (cycle {}), fallback at {:.0}ms",
            model.id, self.cycle, deadline_ms
        );
        self.state = PlacementState::AwaitingSurface {
            model,
            deadline_ms,
            fallback_requested: false,
        };
        Some(self.cycle)
    }

    /// Returns to `Idle`. `false` when nothing was selected.
    pub fn deselect(&mut self) -> bool {
        if matches!(self.state, PlacementState::Idle) {
            return false;
        }
        self.cycle += 1;
        info!("Model removed ({} → IDLE)", self.state.as_str());
        self.state = PlacementState::Idle;
        true
    }

    /// Commits on an accepted horizontal candidate with a known center.
    /// No-op outside `AwaitingSurface`.
    pub fn try_commit_surface(&mut self, candidate: &PlaneCandidate) -> Option<PlacementCommand> {
        let PlacementState::AwaitingSurface { model, .. } = &self.state else {
            return None;
        };
        let obs = &candidate.observation;
        if !candidate.accepted || obs.alignment != Alignment::Horizontal {
            return None;
        }
        let raw = obs.raw_placement_point()?;

        let position = flush_position(
            raw,
            obs.center.map(|c| c.y),
            obs.alignment,
            model.base_y_offset(),
            self.config.flush_tolerance_m,
        );
        let scale = surface_scale(
            model.default_scale,
            obs.extent,
            model.footprint_meters,
            &self.config,
        );

        let command = PlacementCommand {
            model_id: model.id.clone(),
            position,
            scale,
            rotation: model.default_rotation,
            source: PlacementSource::Surface {
                source_id: obs.source_id.clone(),
            },
            committed: true,
        };
        info!(
            "✓ Placed '{}' on {} at ({:.2}, {:.2}, {:.2}) scale {:.3}",
            command.model_id,
            obs.source_id,
            position.x,
            position.y,
            position.z,
            scale.x
        );
        if let Some(rot) = obs.rotation_euler {
            debug!("   surface rotation ({:.1}, {:.1}, {:.1})°", rot.x, rot.y, rot.z);
        }
        Some(self.commit(command))
    }

    /// Arms the fallback exactly once when the deadline has passed.
    pub fn fallback_due(&mut self, now_ms: f64) -> bool {
        match &mut self.state {
            PlacementState::AwaitingSurface {
                deadline_ms,
                fallback_requested,
                ..
            } if !*fallback_requested && now_ms >= *deadline_ms => {
                *fallback_requested = true;
                debug!("Fallback timer elapsed at {:.0}ms", now_ms);
                true
            }
            _ => false,
        }
    }

    /// Commits in front of the camera. No-op unless the fallback was armed and
    /// nothing has committed since.
    pub fn commit_fallback(&mut self, pose: Option<&CameraPose>) -> Option<PlacementCommand> {
        let PlacementState::AwaitingSurface {
            model,
            fallback_requested: true,
            ..
        } = &self.state
        else {
            return None;
        };

        if pose.is_none() {
            warn!("No camera pose for fallback, using fixed forward offset");
        }
        let position = fallback_position(pose, model.placement_distance());
        let command = PlacementCommand {
            model_id: model.id.clone(),
            position,
            scale: model.default_scale,
            rotation: model.default_rotation,
            source: PlacementSource::Fallback,
            committed: true,
        };
        warn!(
            "⚠️  No surface accepted in {}ms, placed '{}' in front of camera",
            self.config.fallback_timeout_ms, command.model_id
        );
        Some(self.commit(command))
    }

    fn commit(&mut self, command: PlacementCommand) -> PlacementCommand {
        let previous = std::mem::replace(&mut self.state, PlacementState::Idle);
        if let PlacementState::AwaitingSurface { model, .. } = previous {
            self.state = PlacementState::Placed {
                model,
                command: command.clone(),
            };
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnchorObservation, Extent, Vec3};

    fn model() -> ModelSpec {
        ModelSpec {
            id: "volcano".to_string(),
            name: "Volcano".to_string(),
            default_scale: Vec3::splat(0.25),
            default_rotation: Vec3::ZERO,
            default_placement_meters: Some(1.2),
            base_y_offset_meters: Some(-0.02),
            footprint_meters: Some(1.0),
        }
    }

    fn surface(id: &str, center_y: f32) -> PlaneCandidate {
        PlaneCandidate {
            observation: AnchorObservation {
                alignment: Alignment::Horizontal,
                center: Some(Vec3::new(0.0, center_y, -1.0)),
                anchor_position: Some(Vec3::new(0.0, 1.00, -1.0)),
                extent: Some(Extent::new(0.2, 0.2)),
                up_normal: Some(Vec3::UP),
                rotation_euler: None,
                source_id: id.to_string(),
            },
            confidence: 1.0,
            accepted: true,
        }
    }

    fn controller() -> PlacementController {
        PlacementController::new(&PlacementConfig::default())
    }

    #[test]
    fn test_surface_commit_flush_and_scale() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        let cmd = c.try_commit_surface(&surface("desk", 1.02)).unwrap();
        assert!((cmd.position.y - 1.00).abs() < 1e-5);
        assert!((cmd.scale.x - 0.125).abs() < 1e-6);
        assert!(cmd.committed);
        assert!(c.is_placed());
    }

    #[test]
    fn test_one_shot_commit() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        let first = c.try_commit_surface(&surface("desk", 1.02)).unwrap();
        assert!(c.try_commit_surface(&surface("table", 0.7)).is_none());
        assert!(!c.fallback_due(10_000.0));
        assert_eq!(c.command(), Some(&first));
    }

    #[test]
    fn test_reselect_allows_new_command() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        c.try_commit_surface(&surface("desk", 1.02)).unwrap();
        c.deselect();
        c.select_model(model(), 100.0);
        let second = c.try_commit_surface(&surface("table", 0.7)).unwrap();
        assert_eq!(
            second.source,
            PlacementSource::Surface {
                source_id: "table".to_string()
            }
        );
    }

    #[test]
    fn test_idle_ignores_candidates() {
        let mut c = controller();
        assert!(c.try_commit_surface(&surface("desk", 1.0)).is_none());
        assert!(!c.deselect());
    }

    #[test]
    fn test_vertical_or_unaccepted_not_committed() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        let mut wall = surface("wall", 1.0);
        wall.observation.alignment = Alignment::Vertical;
        assert!(c.try_commit_surface(&wall).is_none());
        let mut weak = surface("desk", 1.0);
        weak.accepted = false;
        assert!(c.try_commit_surface(&weak).is_none());
        assert!(c.is_awaiting());
    }

    #[test]
    fn test_fallback_fires_once_after_deadline() {
        let mut c = controller();
        c.select_model(model(), 1000.0);
        assert_eq!(c.fallback_deadline_ms(), Some(3000.0));
        assert!(!c.fallback_due(2999.0));
        assert!(c.fallback_due(3000.0));
        assert!(!c.fallback_due(3500.0));
        assert_eq!(c.fallback_deadline_ms(), None);

        let cmd = c.commit_fallback(None).unwrap();
        assert_eq!(cmd.source, PlacementSource::Fallback);
        assert_eq!(cmd.position, Vec3::new(0.0, 0.0, -1.2));
        assert_eq!(cmd.scale, Vec3::splat(0.25));
    }

    #[test]
    fn test_surface_wins_over_pending_fallback() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        assert!(c.fallback_due(2000.0));
        assert!(c.try_commit_surface(&surface("desk", 1.0)).is_some());
        assert!(c.commit_fallback(None).is_none());
    }

    #[test]
    fn test_fallback_requires_armed_timer() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        assert!(c.commit_fallback(None).is_none());
    }

    #[test]
    fn test_cycle_advances_on_select_and_deselect() {
        let mut c = controller();
        let first = c.select_model(model(), 0.0).unwrap();
        c.deselect();
        let second = c.select_model(model(), 0.0).unwrap();
        assert!(second > first + 1);
    }

    #[test]
    fn test_select_while_active_ignored() {
        let mut c = controller();
        c.select_model(model(), 0.0);
        let mut moon = model();
        moon.id = "moon".to_string();

        // Awaiting: deadline and cycle stay put
        let cycle = c.cycle();
        assert!(c.select_model(moon.clone(), 500.0).is_none());
        assert_eq!(c.cycle(), cycle);
        assert_eq!(c.fallback_deadline_ms(), Some(2000.0));

        // Placed: command survives
        let first = c.try_commit_surface(&surface("desk", 1.02)).unwrap();
        assert!(c.select_model(moon, 900.0).is_none());
        assert_eq!(c.command(), Some(&first));
        assert_eq!(c.model().map(|m| m.id.as_str()), Some("volcano"));
    }
}
