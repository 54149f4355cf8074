//! Application configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::AisBridgeError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub uri: String,
    pub topics: Vec<String>,
    pub client_id: String,
}

/// Thresholds of the vessel tracker.
///
/// None of these are user-facing; the defaults are the operating values and a
/// config file only needs to name the ones it overrides.
#[serde_as]
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Distance within which a vessel counts as approaching a bridge
    pub approach_radius_m: f64,
    /// Distance within which a vessel is under the bridge
    pub under_bridge_radius_m: f64,
    /// Distance beyond the bridge, on the far side, that confirms a passage
    pub passage_margin_m: f64,
    /// Relative improvement required to switch nearest bridge
    pub hysteresis_margin: f64,
    /// Maximum angle between course and bearing to the bridge for approaching
    pub approach_angle_deg: f64,
    /// Speed below which a vessel is considered stopped, in knots
    pub low_speed_kn: f64,
    /// Continuous low-speed time needed before a vessel is waiting
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub waiting_window: Duration,
    /// Minimum speed for course over ground to decide travel direction
    pub course_speed_kn: f64,
    /// Vessels at or below this speed are left out of the bridge text
    pub stationary_floor_kn: f64,
    /// How long a vessel stays `passed` after a confirmed passage
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub passage_hold: Duration,
    /// Timeout expiries tolerated for idle and passed vessels
    pub grace_limit: u32,
    pub near_zone_m: f64,
    pub mid_zone_m: f64,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub near_timeout: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub mid_timeout: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub far_timeout: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub waiting_timeout: Duration,
    /// ETA speed floors: (distance limit in m, floor in kn), innermost first
    pub eta_floor_near_m: f64,
    pub eta_floor_near_kn: f64,
    pub eta_floor_mid_m: f64,
    pub eta_floor_mid_kn: f64,
    pub eta_floor_far_kn: f64,
    /// Speed assumed at minimum when judging position jumps, in knots
    pub jump_min_speed_kn: f64,
    pub jump_speed_factor: f64,
    pub jump_tolerance_m: f64,
    /// Vessels farther than this from every bridge are not tracked
    pub corridor_radius_m: f64,
    /// How long the passages of a removed vessel are remembered
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub departure_memory: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            approach_radius_m: 500.0,
            under_bridge_radius_m: 50.0,
            passage_margin_m: 50.0,
            hysteresis_margin: 0.10,
            approach_angle_deg: 90.0,
            low_speed_kn: 0.20,
            waiting_window: Duration::from_secs(120),
            course_speed_kn: 0.5,
            stationary_floor_kn: 0.5,
            passage_hold: Duration::from_secs(60),
            grace_limit: 3,
            near_zone_m: 300.0,
            mid_zone_m: 600.0,
            near_timeout: Duration::from_secs(20 * 60),
            mid_timeout: Duration::from_secs(10 * 60),
            far_timeout: Duration::from_secs(2 * 60),
            waiting_timeout: Duration::from_secs(20 * 60),
            eta_floor_near_m: 200.0,
            eta_floor_near_kn: 0.5,
            eta_floor_mid_m: 500.0,
            eta_floor_mid_kn: 1.5,
            eta_floor_far_kn: 2.0,
            jump_min_speed_kn: 5.0,
            jump_speed_factor: 1.5,
            jump_tolerance_m: 100.0,
            corridor_radius_m: 3_000.0,
            departure_memory: Duration::from_secs(30 * 60),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("AISBRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("mqtt.topics"),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl TrackerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), AisBridgeError> {
        self.validate_radii()?;
        self.validate_hysteresis()?;
        self.validate_windows()?;
        self.validate_zones()?;
        Ok(())
    }

    fn validate_radii(&self) -> Result<(), AisBridgeError> {
        let radii = [
            ("approach_radius_m", self.approach_radius_m),
            ("under_bridge_radius_m", self.under_bridge_radius_m),
            ("passage_margin_m", self.passage_margin_m),
            ("corridor_radius_m", self.corridor_radius_m),
        ];
        for (name, value) in radii {
            if !value.is_finite() || value <= 0.0 {
                return Err(AisBridgeError::ConfigurationError {
                    message: format!("{} must be a positive distance", name),
                });
            }
        }
        if self.under_bridge_radius_m >= self.approach_radius_m {
            return Err(AisBridgeError::ConfigurationError {
                message: "under_bridge_radius_m must be below approach_radius_m".to_string(),
            });
        }
        if self.corridor_radius_m <= self.approach_radius_m {
            return Err(AisBridgeError::ConfigurationError {
                message: "corridor_radius_m must exceed approach_radius_m".to_string(),
            });
        }
        Ok(())
    }

    fn validate_hysteresis(&self) -> Result<(), AisBridgeError> {
        if !(self.hysteresis_margin > 0.0 && self.hysteresis_margin < 1.0) {
            return Err(AisBridgeError::ConfigurationError {
                message: "hysteresis_margin must be between 0 and 1".to_string(),
            });
        }
        Ok(())
    }

    fn validate_windows(&self) -> Result<(), AisBridgeError> {
        let windows = [
            ("waiting_window", self.waiting_window),
            ("passage_hold", self.passage_hold),
            ("near_timeout", self.near_timeout),
            ("mid_timeout", self.mid_timeout),
            ("far_timeout", self.far_timeout),
            ("waiting_timeout", self.waiting_timeout),
        ];
        for (name, window) in windows {
            if window.is_zero() {
                return Err(AisBridgeError::ConfigurationError {
                    message: format!("{} must be greater than zero", name),
                });
            }
        }
        Ok(())
    }

    fn validate_zones(&self) -> Result<(), AisBridgeError> {
        if !(self.near_zone_m < self.mid_zone_m) || !(self.eta_floor_near_m < self.eta_floor_mid_m)
        {
            return Err(AisBridgeError::ConfigurationError {
                message: "Zone limits must be strictly increasing".to_string(),
            });
        }
        Ok(())
    }
}
