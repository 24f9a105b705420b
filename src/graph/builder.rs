//! Programmatic tile construction.
//!
//! Tile building at scale (OSM ingestion, level assignment, tile cutting)
//! lives outside this crate; the builder here exists so tests and small
//! deployments can assemble a [`TileSet`] directly.

use rustc_hash::FxHashMap;

use super::{access, DirectedEdge, GraphId, GraphTile, NodeTransition, RoadClass, TileId, TileSet};

/// Attributes shared by a pair of twin directed edges.
#[derive(Clone, Copy, Debug)]
pub struct EdgeSpec {
    /// Arc length in meters.
    pub length: f32,
    /// Speed in km/h.
    pub speed: f32,
    pub classification: RoadClass,
    /// Modes allowed in the a→b direction.
    pub access: u8,
    /// Modes allowed in the b→a direction. Zero makes the pair one-way.
    pub access_rev: u8,
    pub not_thru: bool,
}

impl Default for EdgeSpec {
    fn default() -> EdgeSpec {
        EdgeSpec {
            length: 100.0,
            speed: 50.0,
            classification: RoadClass::Residential,
            access: access::ALL,
            access_rev: access::ALL,
            not_thru: false,
        }
    }
}

impl EdgeSpec {
    /// An edge costing exactly one second per traversal for every default
    /// profile that derives time from `length / speed`.
    pub fn unit() -> EdgeSpec {
        EdgeSpec {
            length: 1.0,
            speed: 3.6,
            ..EdgeSpec::default()
        }
    }

    pub fn with_length(mut self, length: f32) -> EdgeSpec {
        self.length = length;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> EdgeSpec {
        self.speed = speed;
        self
    }

    pub fn with_access(mut self, access: u8, access_rev: u8) -> EdgeSpec {
        self.access = access;
        self.access_rev = access_rev;
        self
    }

    pub fn with_class(mut self, classification: RoadClass) -> EdgeSpec {
        self.classification = classification;
        self
    }

    pub fn not_thru(mut self) -> EdgeSpec {
        self.not_thru = true;
        self
    }
}

/// Builds a [`TileSet`] node by node, edge pair by edge pair.
#[derive(Default)]
pub struct TileSetBuilder {
    tiles: FxHashMap<TileId, GraphTile>,
}

impl TileSetBuilder {
    pub fn new() -> TileSetBuilder {
        TileSetBuilder::default()
    }

    fn tile_mut(&mut self, id: TileId) -> &mut GraphTile {
        self.tiles.entry(id).or_insert_with(|| GraphTile::new(id))
    }

    /// Add a node to `tile` and return its id.
    pub fn add_node(&mut self, tile: TileId) -> GraphId {
        let t = self.tile_mut(tile);
        let id = GraphId::new(tile.level, tile.tile, t.nodes.len() as u64);
        t.nodes.push(Default::default());
        id
    }

    /// Add the twin directed edges a→b and b→a, returning their ids in that
    /// order. `spec.access` governs a→b, `spec.access_rev` governs b→a.
    pub fn add_edge_pair(&mut self, a: GraphId, b: GraphId, spec: EdgeSpec) -> (GraphId, GraphId) {
        // The twin's opp_index is its position in the end node's edge list,
        // which is the list length before the twin is appended.
        let a_pos = self.tiles[&a.tile_id()].nodes[a.id() as usize].edges.len() as u32;
        let b_pos = self.tiles[&b.tile_id()].nodes[b.id() as usize].edges.len() as u32;

        let ab = self.push_edge(
            a,
            DirectedEdge {
                endnode: b,
                opp_index: b_pos,
                length: spec.length,
                speed: spec.speed,
                classification: spec.classification,
                forward_access: spec.access,
                reverse_access: spec.access_rev,
                not_thru: spec.not_thru,
            },
        );
        let ba = self.push_edge(
            b,
            DirectedEdge {
                endnode: a,
                opp_index: a_pos,
                length: spec.length,
                speed: spec.speed,
                classification: spec.classification,
                forward_access: spec.access_rev,
                reverse_access: spec.access,
                not_thru: spec.not_thru,
            },
        );
        (ab, ba)
    }

    fn push_edge(&mut self, from: GraphId, edge: DirectedEdge) -> GraphId {
        let tile = self.tile_mut(from.tile_id());
        let local = tile.edges.len() as u32;
        tile.edges.push(edge);
        tile.nodes[from.id() as usize].edges.push(local);
        GraphId::new(from.level(), from.tile(), local as u64)
    }

    /// Connect two nodes that represent the same junction on different
    /// levels. Adds the transition in both directions.
    pub fn add_transition(&mut self, a: GraphId, b: GraphId) {
        debug_assert_ne!(a.level(), b.level());
        let up_a_to_b = b.level() < a.level();
        self.tile_mut(a.tile_id()).nodes[a.id() as usize]
            .transitions
            .push(NodeTransition {
                endnode: b,
                up: up_a_to_b,
            });
        self.tile_mut(b.tile_id()).nodes[b.id() as usize]
            .transitions
            .push(NodeTransition {
                endnode: a,
                up: !up_a_to_b,
            });
    }

    pub fn build(self) -> TileSet {
        TileSet::new(self.tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphReader;

    #[test]
    fn test_edge_pair_twins() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let n0 = b.add_node(tile);
        let n1 = b.add_node(tile);
        let n2 = b.add_node(tile);
        let (e01, e10) = b.add_edge_pair(n0, n1, EdgeSpec::unit());
        let (e12, e21) = b.add_edge_pair(n1, n2, EdgeSpec::unit());
        let tiles = b.build();

        assert_eq!(tiles.opposing_edge_id(e01).unwrap(), e10);
        assert_eq!(tiles.opposing_edge_id(e12).unwrap(), e21);
        assert_eq!(tiles.directed_edge(e21).unwrap().endnode, n1);
        // n1 carries two outgoing edges: the twin of e01 and e12.
        assert_eq!(tiles.node_info(n1).unwrap().edges.len(), 2);
    }

    #[test]
    fn test_one_way_access() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let n0 = b.add_node(tile);
        let n1 = b.add_node(tile);
        let (fwd, rev) =
            b.add_edge_pair(n0, n1, EdgeSpec::default().with_access(access::AUTO, 0));
        let tiles = b.build();

        assert_eq!(tiles.directed_edge(fwd).unwrap().forward_access, access::AUTO);
        assert_eq!(tiles.directed_edge(rev).unwrap().forward_access, 0);
        assert_eq!(tiles.directed_edge(rev).unwrap().reverse_access, access::AUTO);
    }

    #[test]
    fn test_transitions_link_levels() {
        let mut b = TileSetBuilder::new();
        let local = b.add_node(TileId::new(2, 0));
        let arterial = b.add_node(TileId::new(1, 0));
        b.add_transition(local, arterial);
        let tiles = b.build();

        let n = tiles.node_info(local).unwrap();
        assert_eq!(n.transitions.len(), 1);
        assert!(n.transitions[0].up);
        let n = tiles.node_info(arterial).unwrap();
        assert!(!n.transitions[0].up);
    }
}
