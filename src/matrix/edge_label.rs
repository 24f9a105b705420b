//! Edge labels for the bidirectional searches.

use crate::costing::Cost;
use crate::graph::GraphId;

/// Sentinel predecessor index marking a seed label.
pub const INVALID_LABEL: u32 = u32::MAX;

/// A settled or frontier record of one search.
///
/// Labels are append-only within a search; their index in the per-location
/// buffer is stable and serves as the predecessor pointer. Forward labels
/// accumulate cost from the source to the end of `edgeid`; backward labels
/// accumulate cost from the end of `edgeid` to the target (traversing the
/// opposing twin and everything after it).
#[derive(Clone, Debug)]
pub struct EdgeLabel {
    /// Index of the predecessor label, or [`INVALID_LABEL`] for a seed.
    pub predecessor: u32,
    pub edgeid: GraphId,
    /// The reverse-direction twin of `edgeid`.
    pub opp_edgeid: GraphId,
    /// Node at the end of `edgeid`; expansion continues here.
    pub endnode: GraphId,
    /// Accumulated cost from the search root.
    pub cost: Cost,
    /// Queue key; tracks `cost.cost`.
    pub sortcost: f32,
    /// Accumulated arc length in meters.
    pub distance: f32,
    /// Hierarchy level of `edgeid`.
    pub level: u8,
    /// The label sits inside a no-through-traffic region.
    pub not_thru: bool,
    /// The end node offers no way on except turning around.
    pub deadend: bool,
    /// Transition cost paid when this label was created; consulted when a
    /// meeting path is stitched together at this edge.
    pub transition_cost: Cost,
}

impl EdgeLabel {
    pub fn is_seed(&self) -> bool {
        self.predecessor == INVALID_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_detection() {
        let label = EdgeLabel {
            predecessor: INVALID_LABEL,
            edgeid: GraphId::new(2, 0, 0),
            opp_edgeid: GraphId::new(2, 0, 1),
            endnode: GraphId::new(2, 0, 0),
            cost: Cost::default(),
            sortcost: 0.0,
            distance: 0.0,
            level: 2,
            not_thru: false,
            deadend: false,
            transition_cost: Cost::default(),
        };
        assert!(label.is_seed());

        let child = EdgeLabel {
            predecessor: 0,
            ..label
        };
        assert!(!child.is_seed());
    }
}
