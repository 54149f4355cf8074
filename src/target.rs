//! Target-bridge resolution

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bridges::{BridgeId, BridgeRegistry, Direction};
use crate::config::TrackerConfig;
use crate::models::Position;

/// A confirmed passage of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassedBridge {
    pub bridge: BridgeId,
    pub direction: Direction,
    pub at: DateTime<Utc>,
}

pub fn passed_in(passed: &[PassedBridge], bridge: BridgeId, direction: Direction) -> bool {
    passed
        .iter()
        .any(|p| p.bridge == bridge && p.direction == direction)
}

/// Where a vessel is, as seen by the resolver
#[derive(Debug, Clone, Copy)]
pub struct TargetQuery<'a> {
    pub position: Position,
    pub nearest: BridgeId,
    pub nearest_distance_m: f64,
    pub direction: Direction,
    pub passed: &'a [PassedBridge],
}

#[derive(Debug, Clone)]
pub struct TargetResolver {
    approach_radius_m: f64,
    under_bridge_radius_m: f64,
}

impl TargetResolver {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            approach_radius_m: config.approach_radius_m,
            under_bridge_radius_m: config.under_bridge_radius_m,
        }
    }

    /// The target bridge the vessel is heading to, or None when no target is
    /// left in its travel direction.
    pub fn resolve(&self, registry: &BridgeRegistry, query: &TargetQuery<'_>) -> Option<BridgeId> {
        let nearest = registry.get(query.nearest);
        let already_passed = |id| passed_in(query.passed, id, query.direction);

        // At a target: under it, or within approach range with the bridge
        // still ahead. A bridge just left behind is never picked up again.
        let at_target = query.nearest_distance_m <= self.under_bridge_radius_m
            || (query.nearest_distance_m <= self.approach_radius_m
                && registry.is_ahead(nearest.id, &query.position, query.direction));
        if nearest.is_target() && at_target && !already_passed(nearest.id) {
            return Some(nearest.id);
        }

        // The current bridge only counts while it is still ahead
        registry
            .walk(query.nearest, query.direction)
            .filter(|bridge| {
                bridge.id != query.nearest
                    || registry.is_ahead(bridge.id, &query.position, query.direction)
            })
            .filter(|bridge| bridge.is_target())
            .find(|bridge| !already_passed(bridge.id))
            .map(|bridge| bridge.id)
    }
}
