// src/placement/mod.rs

pub mod advisory;
pub mod position_calculator;
pub mod state_machine;

pub use advisory::{is_benign_content_error, FALLBACK_ADVISORY};
pub use position_calculator::{fallback_position, flush_position, scale_factor, surface_scale};
pub use state_machine::{PlacementController, PlacementState};
