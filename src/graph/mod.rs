//! Tiled, hierarchical road graph model.
//!
//! The graph is partitioned into immutable tiles, one set of tiles per
//! hierarchy level. Every node and directed edge is addressed by a
//! [`GraphId`] packing (level, tile, index) into 64 bits. The matrix engine
//! only ever consumes the graph through the [`GraphReader`] trait; the
//! bundled [`TileSet`] is an in-memory implementation used by the CLI and
//! the test suite.

pub mod builder;
pub mod reader;
pub mod tile;

pub use builder::{EdgeSpec, TileSetBuilder};
pub use reader::{GraphReader, TileSet};
pub use tile::{DirectedEdge, GraphTile, NodeInfo, NodeTransition};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Travel-mode access bits carried on every directed edge.
pub mod access {
    pub const AUTO: u8 = 1;
    pub const BICYCLE: u8 = 2;
    pub const PEDESTRIAN: u8 = 4;
    pub const ALL: u8 = AUTO | BICYCLE | PEDESTRIAN;
}

/// Number of hierarchy levels: 0 = highway, 1 = arterial, 2 = local.
pub const HIERARCHY_LEVELS: usize = 3;

const LEVEL_BITS: u64 = 3;
const TILE_BITS: u64 = 22;
const LEVEL_MASK: u64 = (1 << LEVEL_BITS) - 1;
const TILE_MASK: u64 = (1 << TILE_BITS) - 1;

/// Identifier of a node or directed edge within the tiled graph.
///
/// Packs the hierarchy level (3 bits), the tile index within that level
/// (22 bits) and the object index within the tile (remaining bits) into a
/// single 64-bit value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(u64);

impl GraphId {
    /// Sentinel for "no id".
    pub const INVALID: GraphId = GraphId(u64::MAX);

    pub fn new(level: u8, tile: u32, id: u64) -> GraphId {
        debug_assert!((level as u64) <= LEVEL_MASK);
        debug_assert!((tile as u64) <= TILE_MASK);
        GraphId((level as u64) | ((tile as u64) << LEVEL_BITS) | (id << (LEVEL_BITS + TILE_BITS)))
    }

    pub fn level(self) -> u8 {
        (self.0 & LEVEL_MASK) as u8
    }

    pub fn tile(self) -> u32 {
        ((self.0 >> LEVEL_BITS) & TILE_MASK) as u32
    }

    pub fn id(self) -> u64 {
        self.0 >> (LEVEL_BITS + TILE_BITS)
    }

    pub fn tile_id(self) -> TileId {
        TileId {
            level: self.level(),
            tile: self.tile(),
        }
    }

    pub fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}/{}/{}", self.level(), self.tile(), self.id())
        } else {
            write!(f, "invalid")
        }
    }
}

// Debug should read like Display for ids; a derive would print the packed
// integer.
impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Identifier of one tile: hierarchy level plus tile index within the level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct TileId {
    pub level: u8,
    pub tile: u32,
}

impl TileId {
    pub fn new(level: u8, tile: u32) -> TileId {
        TileId { level, tile }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.level, self.tile)
    }
}

/// Functional road classification, ordered from most to least important.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    Service,
}

impl RoadClass {
    /// Hierarchy level this classification belongs to.
    pub fn hierarchy_level(self) -> u8 {
        match self {
            RoadClass::Motorway | RoadClass::Trunk => 0,
            RoadClass::Primary | RoadClass::Secondary | RoadClass::Tertiary => 1,
            RoadClass::Unclassified | RoadClass::Residential | RoadClass::Service => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_id_packing() {
        let id = GraphId::new(2, 1042, 987_654);
        assert_eq!(id.level(), 2);
        assert_eq!(id.tile(), 1042);
        assert_eq!(id.id(), 987_654);
        assert_eq!(id.tile_id(), TileId::new(2, 1042));
        assert!(id.is_valid());
    }

    #[test]
    fn test_graph_id_invalid() {
        assert!(!GraphId::INVALID.is_valid());
        assert_eq!(GraphId::INVALID.to_string(), "invalid");
    }

    #[test]
    fn test_graph_id_ordering() {
        // Lower ids compare lower within the same tile; used for tie-breaks.
        let a = GraphId::new(2, 0, 3);
        let b = GraphId::new(2, 0, 4);
        assert!(a < b);
    }

    #[test]
    fn test_road_class_levels() {
        assert_eq!(RoadClass::Motorway.hierarchy_level(), 0);
        assert_eq!(RoadClass::Secondary.hierarchy_level(), 1);
        assert_eq!(RoadClass::Residential.hierarchy_level(), 2);
    }
}
