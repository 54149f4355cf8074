//! Async service around the tracker
//!
//! Serializes report processing and timer expiries on one lock, runs one
//! cleanup timer task per vessel, and publishes tracker events on a channel
//! and the bridge text on a watch.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::{Mmsi, PositionReport};
use crate::text::BridgeText;
use crate::tracker::{CleanupTicket, ExpiryOutcome, TrackerEvent, VesselTracker};
use crate::vessel::VesselSnapshot;

const EVENT_BUFFER: usize = 256;

struct State {
    tracker: VesselTracker,
    timers: HashMap<Mmsi, JoinHandle<()>>,
}

struct Shared {
    state: Mutex<State>,
    events: mpsc::Sender<TrackerEvent>,
    text: watch::Sender<BridgeText>,
}

impl Shared {
    async fn publish(&self, events: Vec<TrackerEvent>) {
        for event in events {
            if self.events.send(event).await.is_err() {
                debug!("No event receiver");
                return;
            }
        }
    }

    fn update_text(&self, text: BridgeText) {
        self.text.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }
}

/// Handles to the outputs of a [`BridgeMonitor`]
pub struct MonitorOutputs {
    pub events: mpsc::Receiver<TrackerEvent>,
    pub text: watch::Receiver<BridgeText>,
}

#[derive(Clone)]
pub struct BridgeMonitor {
    shared: Arc<Shared>,
}

impl BridgeMonitor {
    pub fn new(tracker: VesselTracker) -> (Self, MonitorOutputs) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (text_tx, text_rx) = watch::channel(tracker.bridge_text());

        let monitor = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    tracker,
                    timers: HashMap::new(),
                }),
                events: events_tx,
                text: text_tx,
            }),
        };
        let outputs = MonitorOutputs {
            events: events_rx,
            text: text_rx,
        };
        (monitor, outputs)
    }

    /// Process a report and re-arm the vessel's cleanup timer
    pub async fn handle_report(&self, report: &PositionReport) {
        let events = {
            let mut state = self.shared.state.lock().await;
            let outcome = state.tracker.process_report(report);
            if let Some(ticket) = outcome.cleanup {
                arm(&self.shared, &mut state, ticket);
            }
            let removed = outcome
                .events
                .iter()
                .any(|e| matches!(e, TrackerEvent::Removed { .. }));
            if removed {
                if let Some(timer) = state.timers.remove(&report.mmsi) {
                    timer.abort();
                }
            }
            self.shared.update_text(state.tracker.bridge_text());
            outcome.events
        };
        self.shared.publish(events).await;
    }

    pub async fn snapshots(&self) -> Vec<VesselSnapshot> {
        self.shared.state.lock().await.tracker.snapshots()
    }

    pub async fn bridge_text(&self) -> BridgeText {
        self.shared.state.lock().await.tracker.bridge_text()
    }

    pub async fn vessel_count(&self) -> usize {
        self.shared.state.lock().await.tracker.len()
    }

    /// Cancel every pending cleanup timer
    pub async fn shutdown(&self) {
        let mut state = self.shared.state.lock().await;
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
    }
}

fn arm(shared: &Arc<Shared>, state: &mut State, ticket: CleanupTicket) {
    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(ticket.after).await;
        expire(task_shared, ticket).await;
    });
    if let Some(previous) = state.timers.insert(ticket.mmsi, handle) {
        previous.abort();
    }
}

async fn expire(shared: Arc<Shared>, ticket: CleanupTicket) {
    let events = {
        let mut state = shared.state.lock().await;
        match state.tracker.expire(ticket.mmsi, ticket.generation) {
            ExpiryOutcome::Stale => return,
            ExpiryOutcome::Rearmed(next) => {
                // Detach our own handle before arming the next timer
                state.timers.remove(&ticket.mmsi);
                arm(&shared, &mut state, next);
                return;
            }
            ExpiryOutcome::Removed(events) => {
                state.timers.remove(&ticket.mmsi);
                shared.update_text(state.tracker.bridge_text());
                events
            }
        }
    };
    if events.is_empty() {
        warn!("Expiry of {} removed nothing", ticket.mmsi);
    }
    shared.publish(events).await;
}
