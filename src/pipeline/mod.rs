// src/pipeline/mod.rs

pub mod driver;
pub mod event_bus;
pub mod metrics;
pub mod session;

pub use driver::{run_session, CameraPoseSource, InboundEvent};
pub use event_bus::{EventBus, PlacementEvent};
pub use metrics::{MetricsSummary, SessionMetrics};
pub use session::{PlacementSession, PoseQuery, PoseQueryPurpose};
