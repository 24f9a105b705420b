//! Per-search edge state.

use rustc_hash::FxHashMap;

use super::edge_label::INVALID_LABEL;
use crate::graph::GraphId;

/// Where an edge stands within one location's search.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeSet {
    /// Never touched.
    Unreached,
    /// Labeled and sitting in the queue.
    Temporary,
    /// Popped and relaxed; never touched again.
    Permanent,
}

#[derive(Clone, Copy, Debug)]
pub struct EdgeStatusInfo {
    pub set: EdgeSet,
    /// Index of the edge's label in the per-location buffer.
    pub index: u32,
}

impl EdgeStatusInfo {
    fn unreached() -> EdgeStatusInfo {
        EdgeStatusInfo {
            set: EdgeSet::Unreached,
            index: INVALID_LABEL,
        }
    }
}

/// Edge → status map for a single forward or backward search.
#[derive(Clone, Debug, Default)]
pub struct EdgeStatus {
    map: FxHashMap<GraphId, EdgeStatusInfo>,
}

impl EdgeStatus {
    pub fn set(&mut self, edge: GraphId, set: EdgeSet, index: u32) {
        self.map.insert(edge, EdgeStatusInfo { set, index });
    }

    /// Change an edge's set, keeping its label index.
    pub fn update(&mut self, edge: GraphId, set: EdgeSet) {
        if let Some(info) = self.map.get_mut(&edge) {
            info.set = set;
        }
    }

    pub fn get(&self, edge: GraphId) -> EdgeStatusInfo {
        self.map
            .get(&edge)
            .copied()
            .unwrap_or_else(EdgeStatusInfo::unreached)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut status = EdgeStatus::default();
        let edge = GraphId::new(2, 0, 7);

        assert_eq!(status.get(edge).set, EdgeSet::Unreached);
        assert_eq!(status.get(edge).index, INVALID_LABEL);

        status.set(edge, EdgeSet::Temporary, 3);
        assert_eq!(status.get(edge).set, EdgeSet::Temporary);
        assert_eq!(status.get(edge).index, 3);

        status.update(edge, EdgeSet::Permanent);
        assert_eq!(status.get(edge).set, EdgeSet::Permanent);
        assert_eq!(status.get(edge).index, 3);

        status.clear();
        assert_eq!(status.get(edge).set, EdgeSet::Unreached);
    }
}
