//! Bridge registry
//!
//! The canal runs south to north. Bridges are kept sorted by their canal-order
//! index, so a [`BridgeId`] is also the bridge's position in that sequence.

use serde::Serialize;

use crate::errors::AisBridgeError;
use crate::models::Position;

/// Index of a bridge in its registry, 0 being the southernmost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BridgeId(usize);

impl BridgeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Role of a bridge in status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgeKind {
    /// Opening bridge whose waiting and opening status is tracked
    Target,
    /// Bridge between or around the targets, named only as a waypoint
    Intermediate,
    /// High bridge that never opens; vessels pass under it
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Northbound,
    Southbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Northbound => write!(f, "northbound"),
            Direction::Southbound => write!(f, "southbound"),
        }
    }
}

/// Side of a bridge along the canal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    South,
    North,
}

impl Side {
    /// Direction of a vessel that entered from this side and passed through
    pub fn passage_direction(self) -> Direction {
        match self {
            Side::South => Direction::Northbound,
            Side::North => Direction::Southbound,
        }
    }
}

/// Static description of a bridge, before it is placed in a registry
#[derive(Debug, Clone)]
pub struct BridgeDef {
    pub name: String,
    pub position: Position,
    pub order: u32,
    pub opening_radius_m: f64,
    pub kind: BridgeKind,
}

impl BridgeDef {
    pub fn new(name: &str, lat: f64, lon: f64, order: u32, kind: BridgeKind) -> Self {
        Self {
            name: name.to_string(),
            position: Position::new(lat, lon),
            order,
            opening_radius_m: DEFAULT_OPENING_RADIUS_M,
            kind,
        }
    }
}

pub const DEFAULT_OPENING_RADIUS_M: f64 = 300.0;

#[derive(Debug, Clone)]
pub struct Bridge {
    pub id: BridgeId,
    pub name: String,
    pub position: Position,
    pub order: u32,
    pub opening_radius_m: f64,
    pub kind: BridgeKind,
}

impl Bridge {
    pub fn is_target(&self) -> bool {
        self.kind == BridgeKind::Target
    }

    pub fn is_alternate(&self) -> bool {
        self.kind == BridgeKind::Alternate
    }
}

#[derive(Debug, Clone)]
pub struct BridgeRegistry {
    bridges: Vec<Bridge>,
}

impl BridgeRegistry {
    /// Build a registry, checking the canal layout
    ///
    /// Canal-order indexes must be unique, exactly two bridges must be
    /// targets, and an alternate bridge, if any, must be the northernmost.
    pub fn new(mut defs: Vec<BridgeDef>) -> Result<Self, AisBridgeError> {
        defs.sort_by_key(|def| def.order);

        if defs.windows(2).any(|pair| pair[0].order == pair[1].order) {
            return Err(AisBridgeError::InvalidBridgeRegistry(
                "canal-order indexes must be strictly increasing".to_string(),
            ));
        }
        if let Some(def) = defs
            .iter()
            .find(|def| !def.position.is_valid() || !(def.opening_radius_m > 0.0))
        {
            return Err(AisBridgeError::InvalidBridgeRegistry(format!(
                "bridge {} has invalid position or opening radius",
                def.name
            )));
        }
        let targets = defs.iter().filter(|d| d.kind == BridgeKind::Target).count();
        if targets != 2 {
            return Err(AisBridgeError::InvalidBridgeRegistry(format!(
                "expected exactly two target bridges, found {}",
                targets
            )));
        }
        let alternates: Vec<usize> = defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.kind == BridgeKind::Alternate)
            .map(|(i, _)| i)
            .collect();
        if alternates.len() > 1 || alternates.iter().any(|&i| i + 1 != defs.len()) {
            return Err(AisBridgeError::InvalidBridgeRegistry(
                "only the northernmost bridge may use alternate phrasing".to_string(),
            ));
        }

        Ok(Self::place(defs))
    }

    /// The bridges of Trollhätte kanal, south to north
    pub fn trollhatte_canal() -> Self {
        let defs = vec![
            BridgeDef::new("Olidebron", 58.272743, 12.275116, 0, BridgeKind::Intermediate),
            BridgeDef::new("Klaffbron", 58.284096, 12.283930, 1, BridgeKind::Target),
            BridgeDef::new("Järnvägsbron", 58.291640, 12.292025, 2, BridgeKind::Intermediate),
            BridgeDef::new("Stridsbergsbron", 58.293524, 12.294566, 3, BridgeKind::Target),
            BridgeDef::new("Stallbackabron", 58.311430, 12.314564, 4, BridgeKind::Alternate),
        ];
        Self::place(defs)
    }

    // Assign ids to definitions already sorted by canal order
    fn place(defs: Vec<BridgeDef>) -> Self {
        let bridges = defs
            .into_iter()
            .enumerate()
            .map(|(i, def)| Bridge {
                id: BridgeId(i),
                name: def.name,
                position: def.position,
                order: def.order,
                opening_radius_m: def.opening_radius_m,
                kind: def.kind,
            })
            .collect();
        Self { bridges }
    }

    /// Look up a bridge. Ids are only minted by a registry, so this indexes.
    pub fn get(&self, id: BridgeId) -> &Bridge {
        &self.bridges[id.0]
    }

    pub fn lookup(&self, id: BridgeId) -> Option<&Bridge> {
        self.bridges.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bridge> {
        self.bridges.iter()
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Bridge> {
        self.bridges.iter().find(|b| b.name == name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Bridge> {
        self.bridges.iter().filter(|b| b.is_target())
    }

    /// Bridges starting at `from` (inclusive) in the travel direction
    pub fn walk(&self, from: BridgeId, direction: Direction) -> Box<dyn Iterator<Item = &Bridge> + '_> {
        match direction {
            Direction::Northbound => Box::new(self.bridges[from.0..].iter()),
            Direction::Southbound => Box::new(self.bridges[..=from.0].iter().rev()),
        }
    }

    /// Which side of the bridge a position lies on along the canal axis
    pub fn side_of(&self, id: BridgeId, position: &Position) -> Side {
        if position.lat < self.get(id).position.lat {
            Side::South
        } else {
            Side::North
        }
    }

    /// Whether the bridge still lies ahead of a vessel travelling in `direction`
    pub fn is_ahead(&self, id: BridgeId, position: &Position, direction: Direction) -> bool {
        let bridge_lat = self.get(id).position.lat;
        match direction {
            Direction::Northbound => bridge_lat > position.lat,
            Direction::Southbound => bridge_lat < position.lat,
        }
    }
}

impl Default for BridgeRegistry {
    fn default() -> Self {
        Self::trollhatte_canal()
    }
}
