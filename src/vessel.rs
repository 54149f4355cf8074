//! Vessel tracks and status derivation
//!
//! A status is never patched: it is derived from the current snapshot plus a
//! few persisted memories (low-speed timer, opening-radius entries, passages).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bridges::{BridgeId, BridgeRegistry, Direction, Side};
use crate::config::TrackerConfig;
use crate::eta::Eta;
use crate::models::{Mmsi, Position};
use crate::proximity::Proximity;
use crate::target::PassedBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VesselStatus {
    Idle,
    EnRoute,
    Approaching,
    Waiting,
    UnderBridge,
    Passed,
    StallbackaWaiting,
}

impl VesselStatus {
    /// Statuses that keep an "approaching bridge" notification armed
    pub fn is_approach_family(self) -> bool {
        matches!(
            self,
            VesselStatus::Approaching
                | VesselStatus::Waiting
                | VesselStatus::StallbackaWaiting
                | VesselStatus::UnderBridge
        )
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, VesselStatus::Waiting | VesselStatus::StallbackaWaiting)
    }

    /// Low-confidence statuses that survive timeouts on grace misses
    pub fn uses_grace(self) -> bool {
        matches!(self, VesselStatus::Idle | VesselStatus::Passed)
    }
}

impl std::fmt::Display for VesselStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VesselStatus::Idle => "idle",
            VesselStatus::EnRoute => "en-route",
            VesselStatus::Approaching => "approaching",
            VesselStatus::Waiting => "waiting",
            VesselStatus::UnderBridge => "under-bridge",
            VesselStatus::Passed => "passed",
            VesselStatus::StallbackaWaiting => "stallbacka-waiting",
        };
        write!(f, "{}", s)
    }
}

/// Remembered entry into a bridge's opening radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningEntry {
    pub bridge: BridgeId,
    pub side: Side,
}

/// Position jump held back until a consistent report confirms it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingJump {
    pub position: Position,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VesselTrack {
    pub mmsi: Mmsi,
    pub name: Option<String>,
    pub position: Position,
    pub speed_kn: f64,
    /// Course over ground in [0, 360)
    pub course: Option<f64>,
    /// Time of the last accepted position
    pub last_update: DateTime<Utc>,
    /// Time of the last report of any kind, rejected jumps included
    pub last_seen: DateTime<Utc>,
    pub nearest: Option<BridgeId>,
    pub nearest_distance_m: f64,
    pub target: Option<BridgeId>,
    pub direction: Option<Direction>,
    pub status: VesselStatus,
    pub low_speed_since: Option<DateTime<Utc>>,
    pub grace_misses: u32,
    pub passed: Vec<PassedBridge>,
    pub inside_opening: Vec<OpeningEntry>,
    /// Bridge the status refers to
    pub current_bridge: Option<BridgeId>,
    pub distance_to_current_m: Option<f64>,
    pub within_opening: bool,
    pub eta: Eta,
    /// Set when a passage left the vessel without any target
    pub final_passage_at: Option<DateTime<Utc>>,
    pub pending_jump: Option<PendingJump>,
    pub(crate) cleanup_generation: u64,
}

impl VesselTrack {
    pub fn new(mmsi: Mmsi, position: Position, now: DateTime<Utc>) -> Self {
        Self {
            mmsi,
            name: None,
            position,
            speed_kn: 0.0,
            course: None,
            last_update: now,
            last_seen: now,
            nearest: None,
            nearest_distance_m: f64::INFINITY,
            target: None,
            direction: None,
            status: VesselStatus::Idle,
            low_speed_since: None,
            grace_misses: 0,
            passed: Vec::new(),
            inside_opening: Vec::new(),
            current_bridge: None,
            distance_to_current_m: None,
            within_opening: false,
            eta: Eta::NONE,
            final_passage_at: None,
            pending_jump: None,
            cleanup_generation: 0,
        }
    }

    pub fn last_passed(&self) -> Option<&PassedBridge> {
        self.passed.last()
    }

    /// Name for display, falling back to the MMSI
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.mmsi.to_string())
    }

    /// Restart the continuous low-speed timer on every rise above threshold
    pub fn update_low_speed(&mut self, threshold_kn: f64, now: DateTime<Utc>) {
        self.low_speed_since = if self.speed_kn < threshold_kn {
            Some(self.low_speed_since.unwrap_or(now))
        } else {
            None
        };
    }

    /// How long speed has stayed continuously below threshold
    pub fn low_speed_for(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.low_speed_since
            .and_then(|since| (now - since).to_std().ok())
    }

    /// Update opening-radius entries and return the passages they confirm
    ///
    /// A passage needs a remembered entry, the vessel on the other side, and
    /// more than `margin_m` from the bridge. Leaving the radius plus margin on
    /// the entry side forgets the entry without a passage.
    pub fn observe_openings(
        &mut self,
        registry: &BridgeRegistry,
        proximity: &Proximity,
        margin_m: f64,
        now: DateTime<Utc>,
    ) -> Vec<PassedBridge> {
        let mut passages = Vec::new();

        for bridge in registry.iter() {
            let distance = proximity.distance_to(bridge.id);
            let side = registry.side_of(bridge.id, &self.position);

            match self.inside_opening.iter().position(|e| e.bridge == bridge.id) {
                Some(idx) => {
                    let entry = self.inside_opening[idx];
                    if side != entry.side && distance > margin_m {
                        self.inside_opening.remove(idx);
                        passages.push(PassedBridge {
                            bridge: bridge.id,
                            direction: entry.side.passage_direction(),
                            at: now,
                        });
                    } else if side == entry.side && distance > bridge.opening_radius_m + margin_m {
                        self.inside_opening.remove(idx);
                    }
                }
                None if distance <= bridge.opening_radius_m => {
                    self.inside_opening.push(OpeningEntry {
                        bridge: bridge.id,
                        side,
                    });
                }
                None => {}
            }
        }

        self.passed.extend(passages.iter().copied());
        passages
    }

    pub fn snapshot(&self) -> VesselSnapshot {
        VesselSnapshot {
            mmsi: self.mmsi,
            name: self.display_name(),
            status: self.status,
            target: self.target,
            current_bridge: self.current_bridge,
            distance_to_current_m: self.distance_to_current_m,
            within_opening: self.within_opening,
            eta_minutes: self.eta.minutes,
            speed_kn: self.speed_kn,
            direction: self.direction,
            last_passed: self.last_passed().map(|p| p.bridge),
        }
    }
}

/// Consistent copy of a track for events and bridge text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselSnapshot {
    pub mmsi: Mmsi,
    pub name: String,
    pub status: VesselStatus,
    pub target: Option<BridgeId>,
    pub current_bridge: Option<BridgeId>,
    pub distance_to_current_m: Option<f64>,
    pub within_opening: bool,
    pub eta_minutes: Option<f64>,
    pub speed_kn: f64,
    pub direction: Option<Direction>,
    pub last_passed: Option<BridgeId>,
}

/// The bridge a status refers to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevantBridge {
    pub bridge: BridgeId,
    pub distance_m: f64,
    pub opening_radius_m: f64,
    pub alternate: bool,
}

/// Everything a status is derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusInputs {
    pub relevant: Option<RelevantBridge>,
    pub has_target: bool,
    pub recently_passed: bool,
    pub low_speed_for: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct StatusRules {
    under_bridge_radius_m: f64,
    approach_radius_m: f64,
    waiting_window: Duration,
}

impl StatusRules {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            under_bridge_radius_m: config.under_bridge_radius_m,
            approach_radius_m: config.approach_radius_m,
            waiting_window: config.waiting_window,
        }
    }

    pub fn derive(&self, inputs: &StatusInputs) -> VesselStatus {
        if let Some(relevant) = inputs.relevant {
            if relevant.distance_m <= self.under_bridge_radius_m {
                return VesselStatus::UnderBridge;
            }
        }
        if inputs.recently_passed {
            return VesselStatus::Passed;
        }
        let Some(relevant) = inputs.relevant else {
            return VesselStatus::Idle;
        };

        let waited = inputs
            .low_speed_for
            .is_some_and(|held| held >= self.waiting_window);
        if relevant.distance_m <= relevant.opening_radius_m && waited {
            return if relevant.alternate {
                VesselStatus::StallbackaWaiting
            } else {
                VesselStatus::Waiting
            };
        }
        if relevant.distance_m <= self.approach_radius_m {
            return VesselStatus::Approaching;
        }
        if inputs.has_target {
            VesselStatus::EnRoute
        } else {
            VesselStatus::Idle
        }
    }
}
