//! Graph access: the `GraphReader` trait and the in-memory `TileSet`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{DirectedEdge, GraphId, GraphTile, NodeInfo, TileId};
use crate::error::{Error, Result};

/// Read-only access to the tiled graph.
///
/// Tiles are immutable snapshots; fetching one may block on backing
/// storage, which the engine treats as an opaque synchronous call. The
/// provided lookups resolve ids through `get_tile` and turn a missing tile
/// into [`Error::GraphUnavailable`].
pub trait GraphReader {
    fn get_tile(&self, id: TileId) -> Option<&GraphTile>;

    fn directed_edge(&self, id: GraphId) -> Result<&DirectedEdge> {
        let tile = self
            .get_tile(id.tile_id())
            .ok_or(Error::GraphUnavailable(id.tile_id()))?;
        tile.edge(id).ok_or(Error::InvalidGraphId(id))
    }

    fn node_info(&self, id: GraphId) -> Result<&NodeInfo> {
        let tile = self
            .get_tile(id.tile_id())
            .ok_or(Error::GraphUnavailable(id.tile_id()))?;
        tile.node(id).ok_or(Error::InvalidGraphId(id))
    }

    /// Resolve the opposing (reverse-direction) twin of a directed edge.
    fn opposing_edge_id(&self, id: GraphId) -> Result<GraphId> {
        let edge = self.directed_edge(id)?;
        let node = self.node_info(edge.endnode)?;
        let local = node
            .edges
            .get(edge.opp_index as usize)
            .copied()
            .ok_or(Error::InvalidGraphId(id))?;
        Ok(GraphId::new(
            edge.endnode.level(),
            edge.endnode.tile(),
            local as u64,
        ))
    }
}

/// Flat tile list used on disk; tiles carry their own ids, so the lookup
/// map is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct SerializableTileSet {
    tiles: Vec<GraphTile>,
}

impl From<TileSet> for SerializableTileSet {
    fn from(set: TileSet) -> SerializableTileSet {
        let mut tiles: Vec<GraphTile> = set.tiles.into_values().collect();
        tiles.sort_by_key(|t| t.id);
        SerializableTileSet { tiles }
    }
}

impl From<SerializableTileSet> for TileSet {
    fn from(set: SerializableTileSet) -> TileSet {
        TileSet {
            tiles: set.tiles.into_iter().map(|t| (t.id, t)).collect(),
        }
    }
}

/// In-memory tile store. Serves as the concrete graph for the CLI and the
/// test suite; production deployments can implement [`GraphReader`] over a
/// tile cache instead.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "SerializableTileSet", into = "SerializableTileSet")]
pub struct TileSet {
    tiles: FxHashMap<TileId, GraphTile>,
}

impl TileSet {
    pub fn new(tiles: FxHashMap<TileId, GraphTile>) -> TileSet {
        TileSet { tiles }
    }

    pub fn builder() -> super::TileSetBuilder {
        super::TileSetBuilder::new()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = File::create(path.as_ref()).context("Failed to create tileset file")?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self).context("Failed to serialize tileset")?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<TileSet> {
        let file = File::open(path.as_ref()).context("Failed to open tileset file")?;
        let reader = BufReader::new(file);
        let tiles = bincode::deserialize_from(reader).context("Failed to deserialize tileset")?;
        Ok(tiles)
    }
}

impl GraphReader for TileSet {
    fn get_tile(&self, id: TileId) -> Option<&GraphTile> {
        self.tiles.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{access, EdgeSpec, TileSetBuilder};

    #[test]
    fn test_opposing_edge_resolution() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let a = b.add_node(tile);
        let c = b.add_node(tile);
        let (ab, ba) = b.add_edge_pair(a, c, EdgeSpec::default());
        let tiles = b.build();

        assert_eq!(tiles.opposing_edge_id(ab).unwrap(), ba);
        assert_eq!(tiles.opposing_edge_id(ba).unwrap(), ab);

        let edge = tiles.directed_edge(ab).unwrap();
        assert_eq!(edge.endnode, c);
        assert_eq!(edge.forward_access, access::ALL);
    }

    #[test]
    fn test_missing_tile_is_graph_unavailable() {
        let tiles = TileSet::default();
        let id = GraphId::new(2, 9, 0);
        match tiles.directed_edge(id) {
            Err(Error::GraphUnavailable(t)) => assert_eq!(t, TileId::new(2, 9)),
            other => panic!("expected GraphUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let mut b = TileSetBuilder::new();
        let a = b.add_node(TileId::new(2, 0));
        let c = b.add_node(TileId::new(1, 3));
        b.add_edge_pair(a, c, EdgeSpec::default());
        let tiles = b.build();

        let json = serde_json::to_string(&tiles).unwrap();
        let back: TileSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tile_count(), 2);
        assert!(back.node_info(a).is_ok());
        assert!(back.node_info(c).is_ok());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let a = b.add_node(tile);
        let c = b.add_node(tile);
        b.add_edge_pair(a, c, EdgeSpec::default());
        let tiles = b.build();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.skim");
        tiles.save(&path).unwrap();
        let loaded = TileSet::load(&path).unwrap();
        assert_eq!(loaded.tile_count(), 1);
        assert!(loaded.directed_edge(GraphId::new(2, 0, 0)).is_ok());
    }
}
