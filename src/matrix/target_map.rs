//! Reverse index from edges to the targets whose backward trees reached
//! them.
//!
//! This is the join structure between the forward and backward searches:
//! every forward settle consults it to detect meetings. Entries are
//! append-only within one query; the data layout is encapsulated behind
//! this type.

use rustc_hash::FxHashMap;

use crate::graph::GraphId;

/// `(target index, label index within that target's buffer)`.
pub type TargetEntry = (u32, u32);

#[derive(Debug, Default)]
pub struct TargetMap {
    map: FxHashMap<GraphId, Vec<TargetEntry>>,
    entries: usize,
}

impl TargetMap {
    /// Record that `target`'s backward tree reached `edge` with the label
    /// at `label_index`.
    pub fn add(&mut self, edge: GraphId, target: u32, label_index: u32) {
        self.map
            .entry(edge)
            .or_default()
            .push((target, label_index));
        self.entries += 1;
    }

    /// All targets that reached `edge` so far.
    pub fn get(&self, edge: GraphId) -> Option<&[TargetEntry]> {
        self.map.get(&edge).map(Vec::as_slice)
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.entries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_targets_per_edge() {
        let mut map = TargetMap::default();
        let edge = GraphId::new(2, 0, 12);

        assert!(map.get(edge).is_none());
        map.add(edge, 0, 4);
        map.add(edge, 3, 9);
        assert_eq!(map.get(edge), Some(&[(0, 4), (3, 9)][..]));
        assert_eq!(map.entries(), 2);

        map.clear();
        assert!(map.get(edge).is_none());
        assert_eq!(map.entries(), 0);
    }
}
