//! Time-aware recosting of meeting paths.
//!
//! Expansion evaluates every edge against the departure-time snapshot,
//! which misstates time-dependent costs downstream. After the matrix is
//! determined, each found pair's meeting path is reconstructed from the two
//! predecessor chains and re-walked with the clock advancing edge by edge.

use super::cost_matrix::BestCandidate;
use super::edge_label::EdgeLabel;
use super::edge_status::EdgeStatus;
use crate::costing::{Cost, DynamicCost, TransitionContext};
use crate::error::Result;
use crate::graph::{GraphId, GraphReader};
use crate::time::TimeInfo;

/// Stitch the full edge list of a pair's meeting path, source to target,
/// in forward orientation. Returns `None` when the connection does not
/// resolve to labels (it always should for a found pair).
pub(crate) fn reconstruct_path(
    source_labels: &[EdgeLabel],
    source_status: &EdgeStatus,
    target_labels: &[EdgeLabel],
    target_status: &EdgeStatus,
    connection: &BestCandidate,
) -> Option<Vec<GraphId>> {
    let mut index = source_status.get(connection.edgeid).index;
    if index as usize >= source_labels.len() {
        return None;
    }

    // Forward chain, walked back from the meeting edge then reversed.
    let mut path = Vec::new();
    loop {
        let label = source_labels.get(index as usize)?;
        path.push(label.edgeid);
        if label.is_seed() {
            break;
        }
        index = label.predecessor;
    }
    path.reverse();

    // Backward chain beyond the meeting edge: each label's opposing id is
    // the forward-orientation edge it covers, and successive predecessors
    // move toward the target.
    let mut index = target_status.get(connection.opp_edgeid).index;
    let first = target_labels.get(index as usize)?;
    if first.edgeid != connection.opp_edgeid {
        return None;
    }
    index = first.predecessor;
    while let Some(label) = target_labels.get(index as usize) {
        path.push(label.opp_edgeid);
        if label.is_seed() {
            break;
        }
        index = label.predecessor;
    }
    Some(path)
}

/// Walk `path` with real timestamps, scaling the partial first and last
/// edges, and return the recomputed cost.
pub(crate) fn recost_forward(
    reader: &dyn GraphReader,
    costing: &dyn DynamicCost,
    path: &[GraphId],
    source_pct: f32,
    target_pct: f32,
    departure: TimeInfo,
) -> Result<Cost> {
    if path.is_empty() {
        return Ok(Cost::default());
    }
    let mut time = departure;
    let mut total = Cost::default();
    let mut prev_opp: Option<GraphId> = None;
    let last = path.len() - 1;

    for (i, &edge_id) in path.iter().enumerate() {
        let edge = reader.directed_edge(edge_id)?;

        if i > 0 {
            // Expansion only permits u-turns at dead ends, so any u-turn
            // in a settled path was taken at one; the recomputed context
            // must say so or a deadend-sensitive costing would price the
            // junction differently than expansion did.
            let uturn = prev_opp == Some(edge_id);
            let ctx = TransitionContext {
                uturn,
                deadend: uturn,
            };
            let transition = costing.transition_cost(&ctx);
            total += transition;
            time = time.forward(transition.secs);
        }

        let factor = if path.len() == 1 {
            // Source and target share the edge.
            (target_pct - source_pct).abs()
        } else if i == 0 {
            1.0 - source_pct
        } else if i == last {
            target_pct
        } else {
            1.0
        };
        let edge_cost = costing.edge_cost(edge, time.timestamp()) * factor;
        total += edge_cost;
        time = time.forward(edge_cost.secs);
        prev_opp = Some(reader.opposing_edge_id(edge_id)?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::{AutoCost, DynamicCost};
    use crate::graph::{DirectedEdge, EdgeSpec, GraphReader, TileId, TileSetBuilder};

    /// Costing that doubles every edge cost from a switch time onward.
    struct PeakCost {
        base: AutoCost,
        switch: u64,
    }

    impl DynamicCost for PeakCost {
        fn travel_mode(&self) -> crate::costing::TravelMode {
            self.base.travel_mode()
        }
        fn access_mode(&self) -> u8 {
            self.base.access_mode()
        }
        fn hierarchy_limits(&self) -> Vec<crate::costing::HierarchyLimits> {
            self.base.hierarchy_limits()
        }
        fn edge_cost(&self, edge: &DirectedEdge, timestamp: Option<u64>) -> Cost {
            let cost = self.base.edge_cost(edge, timestamp);
            match timestamp {
                Some(t) if t >= self.switch => cost * 2.0,
                _ => cost,
            }
        }
    }

    #[test]
    fn test_recost_applies_switch_time() {
        // Three 50 s edges departing at t=0 with costs doubling at t=100:
        // the first two traverse before the switch, the third after.
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let nodes: Vec<_> = (0..4).map(|_| b.add_node(tile)).collect();
        let spec = EdgeSpec::unit().with_length(50.0);
        let mut path = Vec::new();
        for w in nodes.windows(2) {
            let (fwd, _) = b.add_edge_pair(w[0], w[1], spec);
            path.push(fwd);
        }
        let tiles = b.build();
        let costing = PeakCost {
            base: AutoCost::default(),
            switch: 100,
        };

        let cost = recost_forward(
            &tiles,
            &costing,
            &path,
            0.0,
            1.0,
            TimeInfo::from_epoch(0),
        )
        .unwrap();
        assert!((cost.secs - 200.0).abs() < 1e-3);

        // Departing after the switch doubles everything.
        let cost = recost_forward(
            &tiles,
            &costing,
            &path,
            0.0,
            1.0,
            TimeInfo::from_epoch(500),
        )
        .unwrap();
        assert!((cost.secs - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_recost_partial_edges() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let a = b.add_node(tile);
        let c = b.add_node(tile);
        let (edge, _) = b.add_edge_pair(a, c, EdgeSpec::unit().with_length(100.0));
        let tiles = b.build();
        let costing = AutoCost::default();

        // Single shared edge from 20% to 70%: half the edge.
        let cost = recost_forward(
            &tiles,
            &costing,
            &[edge],
            0.2,
            0.7,
            TimeInfo::default(),
        )
        .unwrap();
        let full = costing.edge_cost(tiles.directed_edge(edge).unwrap(), None);
        assert!((cost.secs - full.secs * 0.5).abs() < 1e-3);
    }
}
