// src/pipeline/driver.rs
//
// Async shell around `PlacementSession`. Inbound events are applied strictly
// in arrival order; camera pose queries run as spawned tasks and report back
// through an internal channel; the fallback deadline is a tokio timer.
// Selecting or deselecting a model aborts every in-flight query, and any
// result that still slips through is rejected by the session's cycle check.

use crate::anchor_decoder::RawAnchorEvent;
use crate::pipeline::event_bus::PlacementEvent;
use crate::pipeline::metrics::MetricsSummary;
use crate::pipeline::session::{PlacementSession, PoseQuery};
use crate::types::{CameraPose, Config};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Everything the host AR subsystem and the UI can tell the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    TrackingUpdated { state: Value },
    AnchorFound(RawAnchorEvent),
    AnchorUpdated(RawAnchorEvent),
    AnchorRemoved { anchor_id: String },
    SelectModel { model_id: String },
    DeselectModel,
    ContentLoadFailed { message: String },
    SessionLost { reason: String },
}

/// Host camera pose query. `None` when the host cannot provide a pose.
pub trait CameraPoseSource: Send + Sync + 'static {
    fn camera_pose(&self) -> impl Future<Output = Option<CameraPose>> + Send;
}

type PoseResult = (PoseQuery, Option<CameraPose>);

struct Driver<P> {
    config: Config,
    session: PlacementSession,
    pose_source: Arc<P>,
    results_tx: mpsc::UnboundedSender<PoseResult>,
    pending: HashMap<u64, JoinHandle<()>>,
    started: Instant,
}

impl<P: CameraPoseSource> Driver<P> {
    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn fallback_instant(&self) -> Option<(Instant, f64)> {
        self.session
            .fallback_deadline_ms()
            .map(|ms| (self.started + Duration::from_secs_f64(ms.max(0.0) / 1000.0), ms))
    }

    fn handle_inbound(&mut self, event: InboundEvent) -> Result<()> {
        let now_ms = self.now_ms();
        match event {
            InboundEvent::TrackingUpdated { state } => self.session.on_tracking_updated(&state),
            InboundEvent::AnchorFound(raw) | InboundEvent::AnchorUpdated(raw) => {
                if let Some(query) = self.session.on_anchor(&raw) {
                    self.spawn_query(query);
                }
            }
            InboundEvent::AnchorRemoved { anchor_id } => self.session.on_anchor_removed(&anchor_id),
            InboundEvent::SelectModel { model_id } => match self.config.model(&model_id).cloned() {
                Some(model) => {
                    if self.session.select_model(model, now_ms) {
                        self.cancel_pending();
                    }
                }
                None => warn!("Unknown model '{}' selected, ignoring", model_id),
            },
            InboundEvent::DeselectModel => {
                self.cancel_pending();
                self.session.deselect_model();
            }
            InboundEvent::ContentLoadFailed { message } => self.session.report_content_error(&message),
            InboundEvent::SessionLost { reason } => {
                error!("AR session lost: {}", reason);
                self.cancel_pending();
                self.session.reset();
                bail!("AR session lost: {}", reason);
            }
        }
        Ok(())
    }

    fn spawn_query(&mut self, query: PoseQuery) {
        let id = query.id;
        let source = Arc::clone(&self.pose_source);
        let tx = self.results_tx.clone();
        let handle = tokio::spawn(async move {
            let pose = source.camera_pose().await;
            let _ = tx.send((query, pose));
        });
        self.pending.insert(id, handle);
    }

    fn cancel_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        debug!("Cancelling {} in-flight pose queries", self.pending.len());
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    async fn forward_events(&mut self, outbound: &mpsc::Sender<PlacementEvent>) {
        for event in self.session.drain_events() {
            if outbound.send(event).await.is_err() {
                debug!("Outbound receiver dropped, discarding events");
                break;
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Runs one AR session until the inbound channel closes and no deferred
/// work remains. Session loss is the only error.
pub async fn run_session<P: CameraPoseSource>(
    config: Config,
    pose_source: Arc<P>,
    mut inbound: mpsc::Receiver<InboundEvent>,
    outbound: mpsc::Sender<PlacementEvent>,
) -> Result<MetricsSummary> {
    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<PoseResult>();
    let mut driver = Driver {
        session: PlacementSession::new(&config),
        config,
        pose_source,
        results_tx,
        pending: HashMap::new(),
        started: Instant::now(),
    };
    let mut inbound_open = true;

    info!("Placement session started");

    loop {
        let fallback = driver.fallback_instant();
        if !inbound_open && driver.pending.is_empty() && fallback.is_none() {
            break;
        }

        tokio::select! {
            biased;

            maybe_event = inbound.recv(), if inbound_open => match maybe_event {
                Some(event) => {
                    let outcome = driver.handle_inbound(event);
                    driver.forward_events(&outbound).await;
                    outcome?;
                }
                None => {
                    debug!("Inbound channel closed");
                    inbound_open = false;
                }
            },

            Some((query, pose)) = results_rx.recv() => {
                driver.pending.remove(&query.id);
                driver.session.resolve_pose_query(query, pose);
                driver.forward_events(&outbound).await;
            }

            _ = sleep_until_deadline(fallback.map(|(at, _)| at)) => {
                // Never poll earlier than the deadline itself
                let deadline_ms = fallback.map(|(_, ms)| ms).unwrap_or(0.0);
                let now_ms = driver.now_ms().max(deadline_ms);
                if let Some(query) = driver.session.poll_fallback(now_ms) {
                    driver.spawn_query(query);
                }
                driver.forward_events(&outbound).await;
            }
        }
    }

    let summary = driver.session.metrics().summary();
    info!(
        "Placement session finished: {} surface / {} fallback commits",
        summary.surface_commits, summary.fallback_commits
    );
    Ok(summary)
}
