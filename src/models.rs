//! Data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AisBridgeError;
use serde_helpers::*;

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages. Zero is
/// what transmitters send when the identifier is missing, so it is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = AisBridgeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 || value > 999_999_999 {
            return Err(AisBridgeError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = AisBridgeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .parse::<u32>()
            .map_err(|_| AisBridgeError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Mmsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Decoded position report, the only input of the tracker
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub mmsi: Mmsi,
    pub name: Option<String>,
    pub position: Position,
    /// Speed over ground in knots
    pub sog: Option<f64>,
    /// Course over ground in degrees
    pub cog: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionReport {
    /// Check that the report can be processed at all
    pub fn validate(&self) -> Result<(), AisBridgeError> {
        if !self.position.is_valid() {
            return Err(AisBridgeError::InvalidReport(format!(
                "invalid coordinates {}, {} for {}",
                self.position.lat, self.position.lon, self.mmsi
            )));
        }
        Ok(())
    }

    /// Speed over ground, with unusable values treated as stopped
    pub fn speed_kn(&self) -> f64 {
        match self.sog {
            Some(sog) if sog.is_finite() && sog > 0.0 => sog,
            _ => 0.0,
        }
    }

    /// Course over ground normalized to [0, 360), None when unusable
    pub fn course_deg(&self) -> Option<f64> {
        self.cog
            .filter(|cog| cog.is_finite())
            .map(|cog| cog.rem_euclid(360.0))
    }
}

/// Vessel location
///
/// See: https://meri.digitraffic.fi/swagger/#/AIS%20V1/vesselLocationsByMssiAndTimestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VesselLocation {
    /// Location record timestamp in seconds from Unix epoch.
    pub time: u64,
    /// Speed over ground in knots, None if not available (=102.3)
    #[serde(deserialize_with = "deserialize_sog")]
    pub sog: Option<f32>,
    /// Course over ground in degrees, None if not available (360)
    #[serde(deserialize_with = "deserialize_cog")]
    pub cog: Option<f32>,
    /// Longitude in WGS84 format in decimal degrees:
    pub lon: f64,
    /// Latitude in WGS84 format in decimal degrees:
    pub lat: f64,
}

/// Vessel metadata
///
/// Only the name is used; other metadata fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VesselMetadata {
    /// Name of the vessel, empty string if not available
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub name: Option<String>,
    /// Record timestamp in milliseconds from Unix epoch
    pub timestamp: u64,
}

/// Different AIS message types
#[derive(Debug, Clone, PartialEq)]
pub enum AisMessageType {
    Location(VesselLocation),
    Metadata(VesselMetadata),
}

/// Represents a complete AIS message with MMSI and type
#[derive(Debug, Clone, PartialEq)]
pub struct AisMessage {
    /// Maritime Mobile Service Identity
    pub mmsi: Mmsi,
    /// Type of AIS message
    pub message_type: AisMessageType,
}

impl AisMessage {
    /// Create a new AIS message
    pub fn new(mmsi: Mmsi, message_type: AisMessageType) -> Self {
        Self { mmsi, message_type }
    }
}

/// Custom deserializers
mod serde_helpers {
    use serde::{self, Deserialize, Deserializer};

    pub fn deserialize_sog<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f32::deserialize(deserializer)?;
        Ok(if value == 102.3 { None } else { Some(value) })
    }

    pub fn deserialize_cog<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f32::deserialize(deserializer)?;
        Ok(if value == 360.0 { None } else { Some(value) })
    }

    pub fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        let trimmed = s.trim();
        Ok(if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(lat: f64, lon: f64) -> PositionReport {
        PositionReport {
            mmsi: Mmsi::try_from(265_000_001).unwrap(),
            name: None,
            position: Position::new(lat, lon),
            sog: Some(4.0),
            cog: Some(10.0),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn parse_location() {
        let s = r#"{
          "time" : 1734361116,
          "sog" : 0.0,
          "cog" : 229.6,
          "navStat" : 0,
          "rot" : -127,
          "posAcc" : false,
          "raim" : true,
          "heading" : 359,
          "lon" : 12.283929,
          "lat" : 58.284095
        }"#;
        let loc: VesselLocation = serde_json::from_str(s).unwrap();
        let expected = VesselLocation {
            time: 1734361116,
            sog: Some(0.0),
            cog: Some(229.6),
            lon: 12.283929,
            lat: 58.284095,
        };

        assert_eq!(loc, expected);
    }

    #[test]
    fn parse_location_nones() {
        let s = r#"{
          "time" : 1734361116,
          "sog" : 102.3,
          "cog" : 360.0,
          "lon" : 12.283929,
          "lat" : 58.284095
        }"#;
        let loc: VesselLocation = serde_json::from_str(s).unwrap();

        assert_eq!(loc.sog, None);
        assert_eq!(loc.cog, None);
    }

    #[test]
    fn parse_metadata_blank_name() {
        let s = r#"{
            "timestamp" : 1734363992454,
            "destination" : "SEGOT",
            "name" : "   ",
            "type" : 80
        }"#;
        let meta: VesselMetadata = serde_json::from_str(s).unwrap();

        assert_eq!(meta.name, None);
        assert_eq!(meta.timestamp, 1734363992454);
    }

    #[test]
    fn mmsi_rejects_missing_and_oversized() {
        assert!(Mmsi::try_from(0).is_err());
        assert!(Mmsi::try_from(1_000_000_000).is_err());
        assert!(Mmsi::try_from("abc").is_err());
        assert_eq!(Mmsi::try_from("265000001").unwrap().value(), 265_000_001);
    }

    #[test]
    fn validate_rejects_non_finite_coordinates() {
        assert!(report(58.28, 12.28).validate().is_ok());
        assert!(report(f64::NAN, 12.28).validate().is_err());
        assert!(report(58.28, f64::INFINITY).validate().is_err());
        assert!(report(91.0, 12.28).validate().is_err());
    }

    #[test]
    fn speed_and_course_are_clamped() {
        let mut r = report(58.28, 12.28);
        r.sog = Some(-3.0);
        r.cog = Some(-10.0);
        assert_eq!(r.speed_kn(), 0.0);
        assert_eq!(r.course_deg(), Some(350.0));

        r.sog = Some(f64::NAN);
        r.cog = Some(f64::INFINITY);
        assert_eq!(r.speed_kn(), 0.0);
        assert_eq!(r.course_deg(), None);

        r.cog = Some(725.0);
        assert_eq!(r.course_deg(), Some(5.0));
    }
}
