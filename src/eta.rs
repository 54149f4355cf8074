//! ETA to bridge opening
//!
//! Speed is floored per distance zone so that near-zero speeds do not blow the
//! estimate up. The remaining distance is split at the zone limits and each
//! piece is travelled at max(speed, floor of its zone), which keeps the estimate
//! continuous and non-increasing while a vessel closes in.

use serde::Serialize;

use crate::config::TrackerConfig;
use crate::geo::KNOT_MS;
use crate::vessel::VesselStatus;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Eta {
    /// Minutes until the vessel reaches the bridge, None when not surfaced
    pub minutes: Option<f64>,
    pub under_bridge: bool,
}

impl Eta {
    pub const NONE: Eta = Eta {
        minutes: None,
        under_bridge: false,
    };
}

#[derive(Debug, Clone)]
pub struct EtaCalculator {
    // (outer limit in m, floor in kn), innermost first; the last is unbounded
    zones: [(f64, f64); 3],
}

impl EtaCalculator {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            zones: [
                (config.eta_floor_near_m, config.eta_floor_near_kn),
                (config.eta_floor_mid_m, config.eta_floor_mid_kn),
                (f64::INFINITY, config.eta_floor_far_kn),
            ],
        }
    }

    pub fn calculate(&self, distance_m: f64, speed_kn: f64, status: VesselStatus) -> Eta {
        match status {
            VesselStatus::UnderBridge => {
                return Eta {
                    minutes: Some(0.0),
                    under_bridge: true,
                }
            }
            VesselStatus::Waiting | VesselStatus::StallbackaWaiting => return Eta::NONE,
            _ => {}
        }

        if !distance_m.is_finite() || distance_m < 0.0 || !speed_kn.is_finite() || speed_kn < 0.0
        {
            return Eta::NONE;
        }

        let mut seconds = 0.0;
        let mut inner = 0.0;
        for (outer, floor_kn) in self.zones {
            if distance_m <= inner {
                break;
            }
            let piece = distance_m.min(outer) - inner;
            let speed_ms = speed_kn.max(floor_kn) * KNOT_MS;
            if speed_ms <= 0.0 {
                return Eta::NONE;
            }
            seconds += piece / speed_ms;
            inner = outer;
        }

        let minutes = seconds / 60.0;
        Eta {
            minutes: minutes.is_finite().then_some(minutes),
            under_bridge: false,
        }
    }
}
