//! Bridge text: one status sentence for all tracked vessels
//!
//! [`BridgeTextGenerator::generate`] is a pure function of the snapshots it is
//! given. Vessels are grouped by target bridge, each group is described by its
//! most urgent vessel, and the groups are joined in canal order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::bridges::{Bridge, BridgeId, BridgeRegistry};
use crate::config::TrackerConfig;
use crate::vessel::{VesselSnapshot, VesselStatus};

/// Output published to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeText {
    pub text: String,
    /// At least one vessel contributed to the text
    pub any_relevant: bool,
}

#[derive(Debug, Clone)]
pub struct BridgeTextGenerator {
    stationary_floor_kn: f64,
}

impl BridgeTextGenerator {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            stationary_floor_kn: config.stationary_floor_kn,
        }
    }

    pub fn generate(&self, registry: &BridgeRegistry, vessels: &[VesselSnapshot]) -> BridgeText {
        let mut groups: BTreeMap<BridgeId, Vec<&VesselSnapshot>> = BTreeMap::new();
        for vessel in vessels {
            if let Some(bridge) = self.group_of(registry, vessel) {
                groups.entry(bridge).or_default().push(vessel);
            }
        }

        if groups.is_empty() {
            return BridgeText {
                text: default_text(registry),
                any_relevant: false,
            };
        }

        let phrases: Vec<String> = groups
            .iter()
            .filter_map(|(bridge, members)| {
                let representative = members.iter().copied().min_by(|a, b| urgency(a, b))?;
                Some(phrase(
                    registry,
                    registry.get(*bridge),
                    representative,
                    members.len() - 1,
                ))
            })
            .collect();

        BridgeText {
            text: phrases.join("; "),
            any_relevant: true,
        }
    }

    /// Bridge a vessel is reported under, None when it is left out
    fn group_of(&self, registry: &BridgeRegistry, vessel: &VesselSnapshot) -> Option<BridgeId> {
        if !vessel.speed_kn.is_finite() || vessel.status == VesselStatus::Idle {
            return None;
        }
        let known = |id: BridgeId| registry.lookup(id).is_some();
        if !vessel.target.map_or(true, known) || !vessel.current_bridge.map_or(true, known) {
            return None;
        }

        let stationary = vessel.speed_kn <= self.stationary_floor_kn
            && !vessel.within_opening
            && !vessel.status.is_waiting()
            && vessel.status != VesselStatus::UnderBridge;
        if stationary {
            return None;
        }

        vessel.target.or_else(|| {
            vessel
                .current_bridge
                .filter(|id| registry.get(*id).is_alternate() && vessel.status.is_approach_family())
        })
    }
}

fn default_text(registry: &BridgeRegistry) -> String {
    let names: Vec<&str> = registry.targets().map(|b| b.name.as_str()).collect();
    format!("No vessels are approaching {}", names.join(" or "))
}

fn priority(status: VesselStatus) -> u8 {
    match status {
        VesselStatus::UnderBridge => 0,
        VesselStatus::Waiting | VesselStatus::StallbackaWaiting => 1,
        VesselStatus::Approaching | VesselStatus::EnRoute => 2,
        VesselStatus::Passed => 3,
        VesselStatus::Idle => 4,
    }
}

// Most urgent first: status priority, then lowest ETA, then MMSI
fn urgency(a: &VesselSnapshot, b: &VesselSnapshot) -> Ordering {
    let eta = |v: &VesselSnapshot| v.eta_minutes.filter(|m| m.is_finite()).unwrap_or(f64::INFINITY);
    priority(a.status)
        .cmp(&priority(b.status))
        .then_with(|| eta(a).total_cmp(&eta(b)))
        .then_with(|| a.mmsi.cmp(&b.mmsi))
}

fn format_eta(minutes: Option<f64>) -> Option<String> {
    let minutes = minutes.filter(|m| m.is_finite() && *m >= 0.0)?;
    let rounded = minutes.round();
    if rounded < 1.0 {
        Some("ETA < 1 min".to_string())
    } else {
        Some(format!("ETA ≈ {} min", rounded as u64))
    }
}

fn more_vessels(others: usize) -> Option<String> {
    match others {
        0 => None,
        1 => Some("+1 more vessel".to_string()),
        n => Some(format!("+{} more vessels", n)),
    }
}

fn phrase(
    registry: &BridgeRegistry,
    group: &Bridge,
    vessel: &VesselSnapshot,
    others: usize,
) -> String {
    let at = vessel
        .current_bridge
        .map(|id| registry.get(id))
        .unwrap_or(group);
    let via = at.id != group.id;
    // Inside the opening radius of the target itself the vessel is queuing for
    // the opening, whether or not it has slowed down yet
    let at_opening = vessel.status == VesselStatus::Approaching
        && vessel.within_opening
        && !via
        && at.is_target();

    let mut parts: Vec<String> = Vec::new();
    let mut head = match vessel.status {
        VesselStatus::UnderBridge if at.is_alternate() => {
            format!("A vessel is passing under {}", at.name)
        }
        VesselStatus::UnderBridge => format!("Opening in progress at {}", at.name),
        VesselStatus::Waiting => format!("A vessel is awaiting opening at {}", at.name),
        VesselStatus::Approaching if at_opening => {
            format!("A vessel is awaiting opening at {}", at.name)
        }
        VesselStatus::StallbackaWaiting => {
            format!("A vessel is about to pass under {}", at.name)
        }
        VesselStatus::Approaching => format!("A vessel is approaching {}", at.name),
        VesselStatus::Passed => match vessel.last_passed.and_then(|id| registry.lookup(id)) {
            Some(passed) => format!("A vessel has just passed {}", passed.name),
            None => format!("A vessel is en route to {}", group.name),
        },
        VesselStatus::EnRoute | VesselStatus::Idle => {
            format!("A vessel is en route to {}", group.name)
        }
    };

    let shows_eta = !at_opening
        && matches!(
            vessel.status,
            VesselStatus::Approaching | VesselStatus::EnRoute | VesselStatus::Passed
        );
    let heading_elsewhere = match vessel.status {
        VesselStatus::Passed => vessel.last_passed != Some(group.id),
        VesselStatus::EnRoute | VesselStatus::Idle => false,
        _ => via,
    };
    if heading_elsewhere {
        head.push_str(&format!(" on its way to {}", group.name));
    }
    parts.push(head);

    if shows_eta && group.is_target() {
        if let Some(eta) = format_eta(vessel.eta_minutes) {
            parts.push(eta);
        }
    }
    if let Some(more) = more_vessels(others) {
        parts.push(more);
    }
    parts.join(", ")
}
