// src/lib.rs
//
// Surface-aware placement of 3D models in an AR session: plane observations
// in, one placement command per selection out.

pub mod acceptance;
pub mod anchor_decoder;
mod config;
pub mod feedback;
pub mod pipeline;
pub mod placement;
pub mod replay;
pub mod stability;
pub mod surface_selector;
pub mod transform;
pub mod types;

pub use pipeline::{run_session, CameraPoseSource, InboundEvent, PlacementEvent, PlacementSession};
pub use types::{CameraPose, Config, ModelSpec, PlacementCommand, PlacementSource, Vec3};
