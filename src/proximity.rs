//! Nearest-bridge assignment with hysteresis, and approach classification

use crate::bridges::{BridgeId, BridgeRegistry, Direction, Side};
use crate::config::TrackerConfig;
use crate::geo::{angle_diff_deg, bearing_deg, distance_m};
use crate::models::Position;

/// Below this north/south course component the course is treated as sideways
/// (cos 75°) and gives no travel direction.
const SIDEWAYS_COS: f64 = 0.258_819;

/// Result of locating a vessel against the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Proximity {
    pub nearest: BridgeId,
    pub distance_m: f64,
    /// Nearest bridge differs from the previous assignment
    pub switched: bool,
    /// Distance to every bridge, indexed by bridge id
    pub distances: Vec<f64>,
}

impl Proximity {
    pub fn distance_to(&self, id: BridgeId) -> f64 {
        self.distances[id.index()]
    }
}

#[derive(Debug, Clone)]
pub struct ProximityEngine {
    hysteresis_margin: f64,
    approach_angle_deg: f64,
    course_speed_kn: f64,
}

impl ProximityEngine {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            hysteresis_margin: config.hysteresis_margin,
            approach_angle_deg: config.approach_angle_deg,
            course_speed_kn: config.course_speed_kn,
        }
    }

    /// Find the nearest bridge, keeping `previous` unless the new minimum beats
    /// the previous bridge's current distance by the hysteresis margin. None
    /// only for an empty registry.
    pub fn locate(
        &self,
        registry: &BridgeRegistry,
        position: &Position,
        previous: Option<BridgeId>,
    ) -> Option<Proximity> {
        let distances: Vec<f64> = registry
            .iter()
            .map(|bridge| distance_m(position, &bridge.position))
            .collect();

        let (closest, closest_distance) = registry
            .iter()
            .zip(distances.iter().copied())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(bridge, d)| (bridge.id, d))?;

        let proximity = match previous {
            Some(prev) if prev != closest => {
                let prev_distance = distances[prev.index()];
                if closest_distance < prev_distance * (1.0 - self.hysteresis_margin) {
                    Proximity {
                        nearest: closest,
                        distance_m: closest_distance,
                        switched: true,
                        distances,
                    }
                } else {
                    Proximity {
                        nearest: prev,
                        distance_m: prev_distance,
                        switched: false,
                        distances,
                    }
                }
            }
            _ => Proximity {
                nearest: closest,
                distance_m: closest_distance,
                switched: previous.is_none(),
                distances,
            },
        };
        Some(proximity)
    }

    /// Course points at the bridge within the approach angle
    pub fn is_approaching(
        &self,
        registry: &BridgeRegistry,
        position: &Position,
        course: Option<f64>,
        bridge: BridgeId,
    ) -> bool {
        match course {
            Some(course) => {
                let bearing = bearing_deg(position, &registry.get(bridge).position);
                angle_diff_deg(course, bearing) < self.approach_angle_deg
            }
            None => false,
        }
    }

    /// Travel direction along the canal
    ///
    /// Course over ground decides when the vessel is moving and not drifting
    /// sideways; otherwise the position relative to the nearest bridge does,
    /// assuming the vessel is heading towards it.
    pub fn travel_direction(
        &self,
        registry: &BridgeRegistry,
        position: &Position,
        course: Option<f64>,
        speed_kn: f64,
        nearest: BridgeId,
    ) -> Direction {
        if speed_kn >= self.course_speed_kn {
            if let Some(course) = course {
                let north = course.to_radians().cos();
                if north.abs() >= SIDEWAYS_COS {
                    return if north > 0.0 {
                        Direction::Northbound
                    } else {
                        Direction::Southbound
                    };
                }
            }
        }
        match registry.side_of(nearest, position) {
            Side::South => Direction::Northbound,
            Side::North => Direction::Southbound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridges::{BridgeDef, BridgeKind};
    use crate::geo::offset_north;

    // Two bridges 1 km apart on the same meridian
    fn registry() -> BridgeRegistry {
        let a = Position::new(58.0, 12.0);
        let b = offset_north(&a, 1_000.0);
        BridgeRegistry::new(vec![
            BridgeDef::new("A", a.lat, a.lon, 0, BridgeKind::Target),
            BridgeDef::new("B", b.lat, b.lon, 1, BridgeKind::Target),
        ])
        .unwrap()
    }

    fn at(meters_north_of_a: f64) -> Position {
        offset_north(&Position::new(58.0, 12.0), meters_north_of_a)
    }

    #[test]
    fn first_fix_takes_minimum() {
        let registry = registry();
        let engine = ProximityEngine::new(&TrackerConfig::default());

        let p = engine.locate(&registry, &at(900.0), None).unwrap();
        assert_eq!(registry.get(p.nearest).name, "B");
        assert!((p.distance_m - 100.0).abs() < 0.01);
        assert!(p.switched);
    }

    #[test]
    fn oscillation_inside_margin_band_keeps_assignment() {
        let registry = registry();
        let engine = ProximityEngine::new(&TrackerConfig::default());
        let a = registry.find_by_name("A").unwrap().id;

        let mut nearest = Some(a);
        let mut switches = 0;
        for offset in [480.0, 510.0, 490.0, 520.0, 505.0, 495.0, 515.0] {
            let p = engine.locate(&registry, &at(offset), nearest).unwrap();
            if p.switched {
                switches += 1;
            }
            nearest = Some(p.nearest);
        }
        assert_eq!(switches, 0);
        assert_eq!(nearest, Some(a));
    }

    #[test]
    fn genuine_approach_switches_once() {
        let registry = registry();
        let engine = ProximityEngine::new(&TrackerConfig::default());
        let b = registry.find_by_name("B").unwrap().id;

        let mut nearest = None;
        let mut switches = 0;
        for offset in [100.0, 300.0, 450.0, 520.0, 560.0, 600.0, 580.0, 700.0, 900.0] {
            let p = engine.locate(&registry, &at(offset), nearest).unwrap();
            if p.switched && nearest.is_some() {
                switches += 1;
            }
            nearest = Some(p.nearest);
        }
        assert_eq!(switches, 1);
        assert_eq!(nearest, Some(b));
    }

    #[test]
    fn approach_classification_from_course() {
        let registry = registry();
        let engine = ProximityEngine::new(&TrackerConfig::default());
        let b = registry.find_by_name("B").unwrap().id;
        let pos = at(500.0);

        assert!(engine.is_approaching(&registry, &pos, Some(5.0), b));
        assert!(engine.is_approaching(&registry, &pos, Some(350.0), b));
        assert!(!engine.is_approaching(&registry, &pos, Some(180.0), b));
        assert!(!engine.is_approaching(&registry, &pos, None, b));
    }

    #[test]
    fn direction_from_course_with_position_tie_break() {
        let registry = registry();
        let engine = ProximityEngine::new(&TrackerConfig::default());
        let b = registry.find_by_name("B").unwrap().id;
        let south_of_b = at(800.0);

        let moving_south =
            engine.travel_direction(&registry, &south_of_b, Some(190.0), 4.0, b);
        assert_eq!(moving_south, Direction::Southbound);

        let sideways = engine.travel_direction(&registry, &south_of_b, Some(88.0), 4.0, b);
        assert_eq!(sideways, Direction::Northbound);

        let stopped = engine.travel_direction(&registry, &south_of_b, Some(190.0), 0.1, b);
        assert_eq!(stopped, Direction::Northbound);
    }
}
