//! Stale-vessel cleanup policy
//!
//! Decides how long a vessel may stay silent and what happens when that time
//! runs out. Arming and cancelling the actual timers is up to the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TrackerConfig;
use crate::vessel::{VesselStatus, VesselTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalReason {
    /// Silent past its timeout with no grace misses left
    Timeout,
    /// Hold window elapsed after passing the last target in its direction
    PassedFinalTarget,
    /// Accepted position outside the canal corridor
    LeftCorridor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    Remove(RemovalReason),
    /// Keep the vessel and arm the timer again
    Rearm(Duration),
}

#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    near_zone_m: f64,
    mid_zone_m: f64,
    near_timeout: Duration,
    mid_timeout: Duration,
    far_timeout: Duration,
    waiting_timeout: Duration,
    passage_hold: Duration,
    grace_limit: u32,
}

impl CleanupScheduler {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            near_zone_m: config.near_zone_m,
            mid_zone_m: config.mid_zone_m,
            near_timeout: config.near_timeout,
            mid_timeout: config.mid_timeout,
            far_timeout: config.far_timeout,
            waiting_timeout: config.waiting_timeout,
            passage_hold: config.passage_hold,
            grace_limit: config.grace_limit,
        }
    }

    /// Timeout for the distance zone of the nearest bridge
    pub fn zone_timeout(&self, distance_m: f64, status: VesselStatus) -> Duration {
        if status.is_waiting() {
            self.waiting_timeout
        } else if distance_m <= self.near_zone_m {
            self.near_timeout
        } else if distance_m <= self.mid_zone_m {
            self.mid_timeout
        } else {
            self.far_timeout
        }
    }

    /// Time until the track's cleanup timer fires
    pub fn timeout_for(&self, track: &VesselTrack, now: DateTime<Utc>) -> Duration {
        match track.final_passage_at {
            Some(at) => {
                let elapsed = (now - at).to_std().unwrap_or(Duration::ZERO);
                self.passage_hold.saturating_sub(elapsed)
            }
            None => self.zone_timeout(track.nearest_distance_m, track.status),
        }
    }

    /// Handle a timer expiry
    ///
    /// `protected` is set while the vessel is inside the opening radius of its
    /// nearest bridge; such a vessel is neither removed nor charged a miss.
    pub fn on_expiry(
        &self,
        track: &mut VesselTrack,
        protected: bool,
        now: DateTime<Utc>,
    ) -> ExpiryDecision {
        if track.final_passage_at.is_some() {
            return ExpiryDecision::Remove(RemovalReason::PassedFinalTarget);
        }
        if protected {
            return ExpiryDecision::Rearm(self.timeout_for(track, now));
        }
        if track.status.uses_grace() {
            track.grace_misses += 1;
            if track.grace_misses <= self.grace_limit {
                return ExpiryDecision::Rearm(self.timeout_for(track, now));
            }
        }
        ExpiryDecision::Remove(RemovalReason::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mmsi, Position};
    use chrono::TimeZone;

    const MIN: u64 = 60;

    fn scheduler() -> CleanupScheduler {
        CleanupScheduler::new(&TrackerConfig::default())
    }

    fn track(status: VesselStatus, distance_m: f64) -> VesselTrack {
        let mmsi = Mmsi::try_from(265_000_001).unwrap();
        let mut track = VesselTrack::new(mmsi, Position::new(58.0, 12.0), now());
        track.status = status;
        track.nearest_distance_m = distance_m;
        track
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn timeout_zones() {
        let s = scheduler();
        let status = VesselStatus::EnRoute;
        assert_eq!(s.zone_timeout(300.0, status), Duration::from_secs(20 * MIN));
        assert_eq!(s.zone_timeout(301.0, status), Duration::from_secs(10 * MIN));
        assert_eq!(s.zone_timeout(600.0, status), Duration::from_secs(10 * MIN));
        assert_eq!(s.zone_timeout(601.0, status), Duration::from_secs(2 * MIN));
        assert_eq!(
            s.zone_timeout(800.0, VesselStatus::Waiting),
            Duration::from_secs(20 * MIN)
        );
        assert_eq!(s.zone_timeout(f64::NAN, status), Duration::from_secs(2 * MIN));
    }

    #[test]
    fn grace_statuses_survive_limit_expiries() {
        let s = scheduler();
        for status in [VesselStatus::Idle, VesselStatus::Passed] {
            let mut t = track(status, 900.0);
            for _ in 0..3 {
                assert!(matches!(
                    s.on_expiry(&mut t, false, now()),
                    ExpiryDecision::Rearm(_)
                ));
            }
            assert_eq!(
                s.on_expiry(&mut t, false, now()),
                ExpiryDecision::Remove(RemovalReason::Timeout)
            );
        }
    }

    #[test]
    fn other_statuses_removed_on_first_expiry() {
        let s = scheduler();
        for status in [
            VesselStatus::EnRoute,
            VesselStatus::Approaching,
            VesselStatus::Waiting,
            VesselStatus::UnderBridge,
            VesselStatus::StallbackaWaiting,
        ] {
            let mut t = track(status, 400.0);
            assert_eq!(
                s.on_expiry(&mut t, false, now()),
                ExpiryDecision::Remove(RemovalReason::Timeout)
            );
        }
    }

    #[test]
    fn opening_radius_protects_from_expiry() {
        let s = scheduler();
        let mut t = track(VesselStatus::Idle, 250.0);
        for _ in 0..10 {
            assert_eq!(
                s.on_expiry(&mut t, true, now()),
                ExpiryDecision::Rearm(Duration::from_secs(20 * MIN))
            );
        }
        assert_eq!(t.grace_misses, 0);
    }

    #[test]
    fn final_passage_hold_counts_from_passage() {
        let s = scheduler();
        let mut t = track(VesselStatus::Passed, 100.0);
        t.final_passage_at = Some(now());

        let later = now() + chrono::Duration::seconds(20);
        assert_eq!(s.timeout_for(&t, later), Duration::from_secs(40));
        assert_eq!(
            s.timeout_for(&t, now() + chrono::Duration::seconds(300)),
            Duration::ZERO
        );
        assert_eq!(
            s.on_expiry(&mut t, true, later),
            ExpiryDecision::Remove(RemovalReason::PassedFinalTarget)
        );
    }
}
