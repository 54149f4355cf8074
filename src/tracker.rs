//! Vessel tracker
//!
//! Owns every [`VesselTrack`] keyed by MMSI and runs each accepted report
//! through proximity, target resolution, status derivation and ETA. It performs
//! no I/O and keeps no clock: time comes from report timestamps, and cleanup
//! timers are handed out as [`CleanupTicket`]s for the caller to arm.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bridges::{BridgeId, BridgeRegistry, Direction};
use crate::cleanup::{CleanupScheduler, ExpiryDecision, RemovalReason};
use crate::config::TrackerConfig;
use crate::eta::{Eta, EtaCalculator};
use crate::geo::{distance_m, KNOT_MS};
use crate::models::{Mmsi, Position, PositionReport};
use crate::proximity::ProximityEngine;
use crate::target::{passed_in, PassedBridge, TargetQuery, TargetResolver};
use crate::text::{BridgeText, BridgeTextGenerator};
use crate::vessel::{
    PendingJump, RelevantBridge, StatusInputs, StatusRules, VesselSnapshot, VesselStatus,
    VesselTrack,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrackerEvent {
    StatusChanged {
        mmsi: Mmsi,
        old: VesselStatus,
        new: VesselStatus,
        snapshot: VesselSnapshot,
    },
    /// Fired once per (vessel, bridge) while the vessel stays in the
    /// approaching/waiting family for that bridge
    Approaching {
        mmsi: Mmsi,
        bridge: String,
        vessel: String,
        direction: Option<Direction>,
    },
    Removed {
        mmsi: Mmsi,
        vessel: String,
        reason: RemovalReason,
    },
}

/// Request to (re)arm the cleanup timer of a vessel
///
/// Only the ticket with the latest generation is honored, so arming a new one
/// implicitly cancels the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupTicket {
    pub mmsi: Mmsi,
    pub generation: u64,
    pub after: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub events: Vec<TrackerEvent>,
    pub cleanup: Option<CleanupTicket>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpiryOutcome {
    /// Ticket was superseded or the vessel is already gone
    Stale,
    Rearmed(CleanupTicket),
    Removed(Vec<TrackerEvent>),
}

/// Passage history of a removed vessel, restored if it reappears soon after
#[derive(Debug, Clone)]
struct Departure {
    passed: Vec<PassedBridge>,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VesselTracker {
    config: TrackerConfig,
    registry: BridgeRegistry,
    proximity: ProximityEngine,
    resolver: TargetResolver,
    eta: EtaCalculator,
    rules: StatusRules,
    cleanup: CleanupScheduler,
    text: BridgeTextGenerator,
    vessels: HashMap<Mmsi, VesselTrack>,
    notified: HashSet<(Mmsi, BridgeId)>,
    departed: HashMap<Mmsi, Departure>,
}

impl VesselTracker {
    pub fn new(config: TrackerConfig, registry: BridgeRegistry) -> Self {
        Self {
            proximity: ProximityEngine::new(&config),
            resolver: TargetResolver::new(&config),
            eta: EtaCalculator::new(&config),
            rules: StatusRules::new(&config),
            cleanup: CleanupScheduler::new(&config),
            text: BridgeTextGenerator::new(&config),
            config,
            registry,
            vessels: HashMap::new(),
            notified: HashSet::new(),
            departed: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    pub fn get(&self, mmsi: Mmsi) -> Option<&VesselTrack> {
        self.vessels.get(&mmsi)
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Snapshots of all tracks, ordered by MMSI
    pub fn snapshots(&self) -> Vec<VesselSnapshot> {
        let mut snapshots: Vec<VesselSnapshot> =
            self.vessels.values().map(VesselTrack::snapshot).collect();
        snapshots.sort_by_key(|s| s.mmsi);
        snapshots
    }

    pub fn bridge_text(&self) -> BridgeText {
        self.text.generate(&self.registry, &self.snapshots())
    }

    /// Process one position report
    ///
    /// Invalid and out-of-order reports, and reports of untracked vessels
    /// outside the canal corridor, are dropped without touching any track and
    /// yield an empty outcome. A tracked vessel whose accepted position leaves
    /// the corridor is removed.
    pub fn process_report(&mut self, report: &PositionReport) -> UpdateOutcome {
        if let Err(e) = report.validate() {
            debug!("Dropping report: {}", e);
            return UpdateOutcome::default();
        }
        let now = report.timestamp;
        let outside = !self.in_corridor(&report.position);
        if outside && !self.vessels.contains_key(&report.mmsi) {
            return UpdateOutcome::default();
        }

        let mut track = match self.vessels.remove(&report.mmsi) {
            Some(track) if now < track.last_seen => {
                debug!(
                    "Dropping out-of-order report for {} ({} < {})",
                    report.mmsi, now, track.last_seen
                );
                self.vessels.insert(report.mmsi, track);
                return UpdateOutcome::default();
            }
            Some(track) => track,
            None => self.new_track(report),
        };

        if let Some(name) = &report.name {
            track.name = Some(name.clone());
        }
        track.last_seen = now;
        track.grace_misses = 0;

        let mut events = Vec::new();
        let accepted = self.accept_position(&mut track, report);
        if accepted && outside {
            let mmsi = track.mmsi;
            self.vessels.insert(mmsi, track);
            return UpdateOutcome {
                events: self.remove(mmsi, RemovalReason::LeftCorridor),
                cleanup: None,
            };
        }
        if accepted {
            self.update_track(&mut track, report, &mut events);
        }

        track.cleanup_generation += 1;
        let ticket = CleanupTicket {
            mmsi: track.mmsi,
            generation: track.cleanup_generation,
            after: self.cleanup.timeout_for(&track, now),
        };
        self.vessels.insert(track.mmsi, track);

        UpdateOutcome {
            events,
            cleanup: Some(ticket),
        }
    }

    /// Handle a fired cleanup timer
    ///
    /// Runs on the report clock: the vessel's own last report time stands in
    /// for "now", so a lagging feed never shortens a hold window.
    pub fn expire(&mut self, mmsi: Mmsi, generation: u64) -> ExpiryOutcome {
        let Some(track) = self.vessels.get_mut(&mmsi) else {
            return ExpiryOutcome::Stale;
        };
        if track.cleanup_generation != generation {
            return ExpiryOutcome::Stale;
        }
        let now = track.last_seen;

        let protected = track
            .nearest
            .is_some_and(|id| track.nearest_distance_m <= self.registry.get(id).opening_radius_m);
        match self.cleanup.on_expiry(track, protected, now) {
            ExpiryDecision::Rearm(after) => {
                debug!(
                    "Cleanup timer expired for {} ({}, grace misses {})",
                    mmsi, track.status, track.grace_misses
                );
                track.cleanup_generation += 1;
                ExpiryOutcome::Rearmed(CleanupTicket {
                    mmsi,
                    generation: track.cleanup_generation,
                    after,
                })
            }
            ExpiryDecision::Remove(reason) => ExpiryOutcome::Removed(self.remove(mmsi, reason)),
        }
    }

    /// Remove a vessel for good
    pub fn remove(&mut self, mmsi: Mmsi, reason: RemovalReason) -> Vec<TrackerEvent> {
        let Some(track) = self.vessels.remove(&mmsi) else {
            return Vec::new();
        };
        self.notified.retain(|(m, _)| *m != mmsi);
        info!("Removing vessel {} ({:?})", track.display_name(), reason);
        if !track.passed.is_empty() {
            self.departed.insert(
                mmsi,
                Departure {
                    passed: track.passed.clone(),
                    at: track.last_seen,
                },
            );
        }
        vec![TrackerEvent::Removed {
            mmsi,
            vessel: track.display_name(),
            reason,
        }]
    }

    fn new_track(&mut self, report: &PositionReport) -> VesselTrack {
        let now = report.timestamp;
        let memory = self.config.departure_memory;
        self.departed.retain(|_, d| {
            (now - d.at)
                .to_std()
                .map_or(true, |elapsed| elapsed <= memory)
        });

        let mut track = VesselTrack::new(report.mmsi, report.position, now);
        match self.departed.remove(&report.mmsi) {
            Some(departure) => {
                info!(
                    "Tracking returning vessel {} ({} earlier passages)",
                    report.mmsi,
                    departure.passed.len()
                );
                track.passed = departure.passed;
            }
            None => info!("Tracking new vessel {}", report.mmsi),
        }
        track
    }

    fn in_corridor(&self, position: &Position) -> bool {
        self.registry
            .iter()
            .any(|bridge| distance_m(position, &bridge.position) <= self.config.corridor_radius_m)
    }

    // Reject implausible jumps unless a consistent report confirms them
    fn accept_position(&self, track: &mut VesselTrack, report: &PositionReport) -> bool {
        if track.nearest.is_none() {
            return true;
        }
        if self.plausible(&track.position, track.last_update, track.speed_kn, report) {
            track.pending_jump = None;
            return true;
        }

        let confirmed = track
            .pending_jump
            .is_some_and(|pending| self.plausible(&pending.position, pending.at, 0.0, report));
        if confirmed {
            info!("Accepting confirmed relocation of {}", track.display_name());
            track.pending_jump = None;
            return true;
        }

        warn!(
            "Rejecting position jump of {} ({:.0} m)",
            track.display_name(),
            distance_m(&track.position, &report.position)
        );
        track.pending_jump = Some(PendingJump {
            position: report.position,
            at: report.timestamp,
        });
        false
    }

    fn plausible(
        &self,
        from: &Position,
        from_at: DateTime<Utc>,
        from_speed_kn: f64,
        report: &PositionReport,
    ) -> bool {
        let elapsed_s = (report.timestamp - from_at).num_milliseconds().max(0) as f64 / 1000.0;
        let speed_kn = report
            .speed_kn()
            .max(from_speed_kn)
            .max(self.config.jump_min_speed_kn);
        let allowed = speed_kn * KNOT_MS * elapsed_s * self.config.jump_speed_factor
            + self.config.jump_tolerance_m;
        distance_m(from, &report.position) <= allowed
    }

    fn update_track(
        &mut self,
        track: &mut VesselTrack,
        report: &PositionReport,
        events: &mut Vec<TrackerEvent>,
    ) {
        let now = report.timestamp;
        track.position = report.position;
        track.speed_kn = report.speed_kn();
        track.course = report.course_deg();
        track.last_update = now;
        track.update_low_speed(self.config.low_speed_kn, now);

        let Some(proximity) = self
            .proximity
            .locate(&self.registry, &track.position, track.nearest)
        else {
            return;
        };
        if proximity.switched && track.nearest.is_some() {
            debug!(
                "{} nearest bridge now {}",
                track.display_name(),
                self.registry.get(proximity.nearest).name
            );
        }
        track.nearest = Some(proximity.nearest);
        track.nearest_distance_m = proximity.distance_m;

        let direction = self.proximity.travel_direction(
            &self.registry,
            &track.position,
            track.course,
            track.speed_kn,
            proximity.nearest,
        );
        track.direction = Some(direction);

        let passages =
            track.observe_openings(&self.registry, &proximity, self.config.passage_margin_m, now);
        for passage in &passages {
            info!(
                "{} passed {} {}",
                track.display_name(),
                self.registry.get(passage.bridge).name,
                passage.direction
            );
        }

        // Target only moves on passage, on first fix, or once it falls behind
        let target_passed = track
            .target
            .is_some_and(|t| passages.iter().any(|p| p.bridge == t));
        let target_behind = track.target.is_some_and(|t| {
            !self.registry.is_ahead(t, &track.position, direction)
                && proximity.distance_to(t) > self.registry.get(t).opening_radius_m
        });
        if track.target.is_none() || target_passed || target_behind {
            let resolved = self.resolver.resolve(
                &self.registry,
                &TargetQuery {
                    position: track.position,
                    nearest: proximity.nearest,
                    nearest_distance_m: proximity.distance_m,
                    direction,
                    passed: &track.passed,
                },
            );
            if resolved != track.target {
                info!(
                    "{} target {} -> {}",
                    track.display_name(),
                    self.bridge_name(track.target),
                    self.bridge_name(resolved)
                );
            }
            if resolved.is_some() {
                track.final_passage_at = None;
            } else if target_passed {
                track.final_passage_at = Some(now);
            }
            track.target = resolved;
        }

        let nearest = self.registry.get(proximity.nearest);
        let nearest_relevant = proximity.distance_m <= self.config.approach_radius_m
            && !passed_in(&track.passed, nearest.id, direction)
            && (proximity.distance_m <= nearest.opening_radius_m
                || self.proximity.is_approaching(
                    &self.registry,
                    &track.position,
                    track.course,
                    nearest.id,
                ));
        let current = if nearest_relevant {
            Some(nearest.id)
        } else {
            track.target
        };
        let relevant = current.map(|id| {
            let bridge = self.registry.get(id);
            RelevantBridge {
                bridge: id,
                distance_m: proximity.distance_to(id),
                opening_radius_m: bridge.opening_radius_m,
                alternate: bridge.is_alternate(),
            }
        });

        let recently_passed = track.last_passed().is_some_and(|p| {
            (now - p.at)
                .to_std()
                .is_ok_and(|held| held <= self.config.passage_hold)
        });
        let status = self.rules.derive(&StatusInputs {
            relevant,
            has_target: track.target.is_some(),
            recently_passed,
            low_speed_for: track.low_speed_for(now),
        });

        track.current_bridge = current;
        track.distance_to_current_m = relevant.map(|r| r.distance_m);
        track.within_opening = relevant.is_some_and(|r| r.distance_m <= r.opening_radius_m);
        track.eta = match (track.target, status) {
            (_, VesselStatus::UnderBridge) => self.eta.calculate(0.0, track.speed_kn, status),
            // Queuing inside the target's opening radius
            (Some(target), VesselStatus::Approaching)
                if current == Some(target) && track.within_opening =>
            {
                Eta::NONE
            }
            (Some(target), _) => {
                self.eta
                    .calculate(proximity.distance_to(target), track.speed_kn, status)
            }
            (None, _) => Eta::NONE,
        };

        let old = track.status;
        track.status = status;
        if old != status {
            info!("{} status {} -> {}", track.display_name(), old, status);
            events.push(TrackerEvent::StatusChanged {
                mmsi: track.mmsi,
                old,
                new: status,
                snapshot: track.snapshot(),
            });
        }

        self.notify_approach(track, current, status, events);
    }

    // Trigger-once bookkeeping for the "approaching bridge" event
    fn notify_approach(
        &mut self,
        track: &VesselTrack,
        current: Option<BridgeId>,
        status: VesselStatus,
        events: &mut Vec<TrackerEvent>,
    ) {
        let armed = current.filter(|_| status.is_approach_family());
        let mmsi = track.mmsi;
        self.notified
            .retain(|(m, bridge)| *m != mmsi || Some(*bridge) == armed);

        if let Some(bridge) = armed {
            if self.notified.insert((mmsi, bridge)) {
                events.push(TrackerEvent::Approaching {
                    mmsi,
                    bridge: self.registry.get(bridge).name.clone(),
                    vessel: track.display_name(),
                    direction: track.direction,
                });
            }
        }
    }

    fn bridge_name(&self, id: Option<BridgeId>) -> &str {
        id.map_or("none", |id| self.registry.get(id).name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridges::{BridgeDef, BridgeKind};
    use crate::geo::offset_north;
    use chrono::TimeZone;

    const MMSI: u32 = 265_000_001;

    // A and B are targets 3 km apart, C an alternate bridge 3 km north of B
    fn registry() -> BridgeRegistry {
        let a = Position::new(58.0, 12.0);
        let b = offset_north(&a, 3_000.0);
        let c = offset_north(&a, 6_000.0);
        BridgeRegistry::new(vec![
            BridgeDef::new("A", a.lat, a.lon, 0, BridgeKind::Target),
            BridgeDef::new("B", b.lat, b.lon, 1, BridgeKind::Target),
            BridgeDef::new("C", c.lat, c.lon, 2, BridgeKind::Alternate),
        ])
        .unwrap()
    }

    fn tracker() -> VesselTracker {
        VesselTracker::new(TrackerConfig::default(), registry())
    }

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn report(meters_north_of_a: f64, sog: f64, cog: f64, at: i64) -> PositionReport {
        PositionReport {
            mmsi: Mmsi::try_from(MMSI).unwrap(),
            name: Some("TESTER".to_string()),
            position: offset_north(&Position::new(58.0, 12.0), meters_north_of_a),
            sog: Some(sog),
            cog: Some(cog),
            timestamp: t(at),
        }
    }

    fn mmsi() -> Mmsi {
        Mmsi::try_from(MMSI).unwrap()
    }

    fn status(tracker: &VesselTracker) -> VesselStatus {
        tracker.get(mmsi()).unwrap().status
    }

    fn approaching_events(outcome: &UpdateOutcome) -> usize {
        outcome
            .events
            .iter()
            .filter(|e| matches!(e, TrackerEvent::Approaching { .. }))
            .count()
    }

    #[test]
    fn invalid_report_never_creates_track() {
        let mut tracker = tracker();
        let mut r = report(-800.0, 5.0, 0.0, 0);
        r.position.lat = f64::NAN;

        let outcome = tracker.process_report(&r);
        assert_eq!(outcome, UpdateOutcome::default());
        assert!(tracker.is_empty());
    }

    #[test]
    fn out_of_order_report_is_dropped() {
        let mut tracker = tracker();
        tracker.process_report(&report(-800.0, 5.0, 0.0, 60));
        let outcome = tracker.process_report(&report(-700.0, 5.0, 0.0, 30));

        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(tracker.get(mmsi()).unwrap().last_update, t(60));
    }

    #[test]
    fn first_report_targets_bridge_ahead() {
        let mut tracker = tracker();
        let outcome = tracker.process_report(&report(-800.0, 5.0, 0.0, 0));

        let track = tracker.get(mmsi()).unwrap();
        assert_eq!(track.status, VesselStatus::EnRoute);
        assert_eq!(tracker.registry().get(track.target.unwrap()).name, "A");
        assert!(track.eta.minutes.unwrap() > 5.0);
        assert!(matches!(
            outcome.events[0],
            TrackerEvent::StatusChanged {
                old: VesselStatus::Idle,
                new: VesselStatus::EnRoute,
                ..
            }
        ));
        assert_eq!(outcome.cleanup.unwrap().after, Duration::from_secs(2 * 60));
    }

    #[test]
    fn approaching_event_fires_once_per_bridge() {
        let mut tracker = tracker();
        tracker.process_report(&report(-800.0, 5.0, 0.0, 0));

        let first = tracker.process_report(&report(-450.0, 5.0, 0.0, 140));
        assert_eq!(approaching_events(&first), 1);
        let again = tracker.process_report(&report(-350.0, 5.0, 0.0, 180));
        assert_eq!(approaching_events(&again), 0);
        let inside = tracker.process_report(&report(-200.0, 5.0, 0.0, 220));
        assert_eq!(approaching_events(&inside), 0);
    }

    #[test]
    fn approaching_event_rearms_after_leaving_family() {
        let mut tracker = tracker();
        tracker.process_report(&report(-450.0, 5.0, 0.0, 0));
        // U-turn, away from A and out of approach range
        tracker.process_report(&report(-560.0, 5.0, 180.0, 60));
        assert_ne!(status(&tracker), VesselStatus::Approaching);

        let back = tracker.process_report(&report(-450.0, 5.0, 0.0, 120));
        assert_eq!(status(&tracker), VesselStatus::Approaching);
        assert_eq!(approaching_events(&back), 1);
    }

    #[test]
    fn gps_jump_rejected_then_confirmed() {
        let mut tracker = tracker();
        tracker.process_report(&report(-800.0, 5.0, 0.0, 0));

        // 3.3 km in 10 s is impossible
        let outcome = tracker.process_report(&report(2_500.0, 5.0, 0.0, 10));
        let track = tracker.get(mmsi()).unwrap();
        assert!(outcome.events.is_empty());
        assert!(outcome.cleanup.is_some());
        assert_eq!(track.last_update, t(0));
        assert_eq!(track.last_seen, t(10));
        assert!((track.nearest_distance_m - 800.0).abs() < 1.0);

        // A consistent follow-up confirms the relocation
        tracker.process_report(&report(2_530.0, 5.0, 0.0, 20));
        let track = tracker.get(mmsi()).unwrap();
        assert_eq!(track.last_update, t(20));
        assert!(track.pending_jump.is_none());
        assert_eq!(tracker.registry().get(track.nearest.unwrap()).name, "B");
    }

    #[test]
    fn waiting_requires_continuous_low_speed() {
        let mut tracker = tracker();
        tracker.process_report(&report(-250.0, 0.1, 0.0, 0));
        tracker.process_report(&report(-250.0, 0.1, 0.0, 119));
        assert_eq!(status(&tracker), VesselStatus::Approaching);

        // Brief spike throws away the accumulated time
        tracker.process_report(&report(-250.0, 0.6, 0.0, 125));
        tracker.process_report(&report(-250.0, 0.1, 0.0, 130));
        tracker.process_report(&report(-250.0, 0.1, 0.0, 249));
        assert_eq!(status(&tracker), VesselStatus::Approaching);

        tracker.process_report(&report(-250.0, 0.1, 0.0, 250));
        assert_eq!(status(&tracker), VesselStatus::Waiting);
        assert_eq!(tracker.get(mmsi()).unwrap().eta.minutes, None);
    }

    #[test]
    fn passage_retargets_and_holds_passed() {
        let mut tracker = tracker();
        tracker.process_report(&report(-250.0, 4.0, 0.0, 0));
        tracker.process_report(&report(-30.0, 4.0, 0.0, 100));
        assert_eq!(status(&tracker), VesselStatus::UnderBridge);

        tracker.process_report(&report(60.0, 4.0, 0.0, 145));
        let track = tracker.get(mmsi()).unwrap();
        assert_eq!(track.status, VesselStatus::Passed);
        assert_eq!(tracker.registry().get(track.target.unwrap()).name, "B");
        assert_eq!(tracker.registry().get(track.last_passed().unwrap().bridge).name, "A");

        // Hold window over
        tracker.process_report(&report(400.0, 4.0, 0.0, 230));
        assert_eq!(status(&tracker), VesselStatus::EnRoute);
    }

    #[test]
    fn passing_final_target_schedules_hold_removal() {
        let mut tracker = tracker();
        tracker.process_report(&report(2_750.0, 4.0, 0.0, 0));
        tracker.process_report(&report(2_980.0, 4.0, 0.0, 110));
        let outcome = tracker.process_report(&report(3_060.0, 4.0, 0.0, 150));

        let track = tracker.get(mmsi()).unwrap();
        assert_eq!(track.target, None);
        assert_eq!(track.status, VesselStatus::Passed);
        let ticket = outcome.cleanup.unwrap();
        assert_eq!(ticket.after, Duration::from_secs(60));

        match tracker.expire(mmsi(), ticket.generation) {
            ExpiryOutcome::Removed(events) => assert!(matches!(
                events[0],
                TrackerEvent::Removed {
                    reason: RemovalReason::PassedFinalTarget,
                    ..
                }
            )),
            other => panic!("unexpected {:?}", other),
        }
        assert!(tracker.is_empty());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut tracker = tracker();
        let first = tracker.process_report(&report(-800.0, 5.0, 0.0, 0)).cleanup.unwrap();
        let second = tracker.process_report(&report(-780.0, 5.0, 0.0, 10)).cleanup.unwrap();

        assert_eq!(tracker.expire(mmsi(), first.generation), ExpiryOutcome::Stale);
        assert_eq!(tracker.len(), 1);
        assert!(matches!(
            tracker.expire(mmsi(), second.generation),
            ExpiryOutcome::Removed(_)
        ));
        assert_eq!(
            tracker.expire(mmsi(), second.generation),
            ExpiryOutcome::Stale
        );
    }

    #[test]
    fn idle_vessel_survives_grace_misses() {
        let mut tracker = tracker();
        // North of C heading north: nothing ahead
        let mut ticket = tracker
            .process_report(&report(7_000.0, 5.0, 0.0, 0))
            .cleanup
            .unwrap();
        assert_eq!(status(&tracker), VesselStatus::Idle);

        for _ in 0..3 {
            match tracker.expire(mmsi(), ticket.generation) {
                ExpiryOutcome::Rearmed(next) => ticket = next,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!(
            tracker.expire(mmsi(), ticket.generation),
            ExpiryOutcome::Removed(_)
        ));
    }

    #[test]
    fn opening_radius_suppresses_removal() {
        let mut tracker = tracker();
        let ticket = tracker
            .process_report(&report(-200.0, 3.0, 0.0, 0))
            .cleanup
            .unwrap();
        assert_eq!(status(&tracker), VesselStatus::Approaching);

        assert!(matches!(
            tracker.expire(mmsi(), ticket.generation),
            ExpiryOutcome::Rearmed(_)
        ));
        assert_eq!(tracker.len(), 1);
    }
}
