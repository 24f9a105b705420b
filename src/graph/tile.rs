//! Immutable tile contents: nodes, directed edges and level transitions.

use serde::{Deserialize, Serialize};

use super::{GraphId, RoadClass, TileId};

/// Connection from a node to its twin on another hierarchy level.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NodeTransition {
    /// The corresponding node on the other level.
    pub endnode: GraphId,
    /// True when the transition climbs to a more important level.
    pub up: bool,
}

/// A graph node: the junction between directed edges.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Tile-local indices of the outgoing directed edges at this node.
    pub edges: Vec<u32>,
    /// Transitions to the same physical node on other levels.
    pub transitions: Vec<NodeTransition>,
}

/// One directed edge. Every road segment is stored as a pair of directed
/// edges; `opp_index` locates the twin within the end node's edge list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectedEdge {
    /// Node this edge leads to.
    pub endnode: GraphId,
    /// Position of the opposing edge within `endnode`'s edge list.
    pub opp_index: u32,
    /// Arc length in meters.
    pub length: f32,
    /// Posted or inferred speed in km/h.
    pub speed: f32,
    pub classification: RoadClass,
    /// Modes allowed to traverse the edge in its own direction.
    pub forward_access: u8,
    /// Modes allowed to traverse the edge against its direction.
    pub reverse_access: u8,
    /// Edge leads into a region with no through connectivity.
    pub not_thru: bool,
}

/// An immutable storage unit of the partitioned road graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphTile {
    pub id: TileId,
    pub nodes: Vec<NodeInfo>,
    pub edges: Vec<DirectedEdge>,
}

impl GraphTile {
    pub fn new(id: TileId) -> GraphTile {
        GraphTile {
            id,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Look up a node by id. Returns `None` when the id belongs to another
    /// tile or indexes past the node list.
    pub fn node(&self, id: GraphId) -> Option<&NodeInfo> {
        if id.tile_id() != self.id {
            return None;
        }
        self.nodes.get(id.id() as usize)
    }

    /// Look up a directed edge by id.
    pub fn edge(&self, id: GraphId) -> Option<&DirectedEdge> {
        if id.tile_id() != self.id {
            return None;
        }
        self.edges.get(id.id() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::access;

    #[test]
    fn test_tile_lookup_rejects_foreign_ids() {
        let mut tile = GraphTile::new(TileId::new(2, 5));
        tile.nodes.push(NodeInfo::default());
        tile.edges.push(DirectedEdge {
            endnode: GraphId::new(2, 5, 0),
            opp_index: 0,
            length: 10.0,
            speed: 50.0,
            classification: RoadClass::Residential,
            forward_access: access::ALL,
            reverse_access: access::ALL,
            not_thru: false,
        });

        assert!(tile.node(GraphId::new(2, 5, 0)).is_some());
        assert!(tile.node(GraphId::new(2, 6, 0)).is_none());
        assert!(tile.edge(GraphId::new(2, 5, 0)).is_some());
        assert!(tile.edge(GraphId::new(1, 5, 0)).is_none());
        assert!(tile.edge(GraphId::new(2, 5, 1)).is_none());
    }
}
