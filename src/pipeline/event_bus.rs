// src/pipeline/event_bus.rs
//
// Outbound signals for the rendering collaborator. The session publishes,
// the caller drains after every call.

use crate::feedback::FeedbackSignal;
use crate::types::{PlacementCommand, TrackingStatus};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PlacementEvent {
    PlacementCommitted(PlacementCommand),
    PlacementCleared { model_id: String },
    FeedbackUpdated(FeedbackSignal),
    TrackingUpdated(TrackingStatus),
    /// Brief user-facing notice (e.g. after a fallback placement)
    Advisory(String),
    /// Content-load failure passed through from the renderer
    ContentLoadFailed(String),
}

pub struct EventBus {
    events: VecDeque<PlacementEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: PlacementEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<PlacementEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
