//! Turns raw AIS messages into position reports

use std::collections::{HashMap, VecDeque};

use chrono::DateTime;
use tracing::debug;

use crate::models::{AisMessage, AisMessageType, Mmsi, Position, PositionReport, VesselLocation};

/// Names kept before the oldest entry is evicted
pub const NAME_CACHE_LIMIT: usize = 10_000;

/// Joins metadata and location messages
///
/// Names arrive on their own topic and much less often than locations, so the
/// latest known name of each vessel is cached and attached to its reports.
/// The feed covers far more vessels than the canal ever sees, so the cache is
/// capped and evicts in insertion order.
#[derive(Debug)]
pub struct ReportAssembler {
    names: HashMap<Mmsi, String>,
    order: VecDeque<Mmsi>,
    limit: usize,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::with_limit(NAME_CACHE_LIMIT)
    }
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            names: HashMap::new(),
            order: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Position report for a location message, None for metadata and for
    /// locations with an unusable timestamp
    pub fn assemble(&mut self, message: AisMessage) -> Option<PositionReport> {
        match message.message_type {
            AisMessageType::Metadata(metadata) => {
                if let Some(name) = metadata.name {
                    self.remember(message.mmsi, name);
                }
                None
            }
            AisMessageType::Location(location) => self.report(message.mmsi, &location),
        }
    }

    /// Drop the cached name of a vessel that is no longer tracked
    pub fn forget(&mut self, mmsi: Mmsi) {
        if self.names.remove(&mmsi).is_some() {
            self.order.retain(|m| *m != mmsi);
        }
    }

    pub fn cached_names(&self) -> usize {
        self.names.len()
    }

    fn remember(&mut self, mmsi: Mmsi, name: String) {
        if self.names.insert(mmsi, name).is_some() {
            return;
        }
        self.order.push_back(mmsi);
        while self.order.len() > self.limit {
            if let Some(oldest) = self.order.pop_front() {
                self.names.remove(&oldest);
                debug!("Evicted cached name of {}", oldest);
            }
        }
    }

    fn report(&self, mmsi: Mmsi, location: &VesselLocation) -> Option<PositionReport> {
        let Some(timestamp) = i64::try_from(location.time)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            debug!("Dropping location of {} with timestamp {}", mmsi, location.time);
            return None;
        };

        Some(PositionReport {
            mmsi,
            name: self.names.get(&mmsi).cloned(),
            position: Position::new(location.lat, location.lon),
            sog: location.sog.map(f64::from),
            cog: location.cog.map(f64::from),
            timestamp,
        })
    }
}
