//! Reference shortest-path oracle.
//!
//! An exhaustive edge-based Dijkstra with the same seeding, u-turn and
//! access semantics as the matrix engine but none of its thresholds,
//! hierarchy pruning or shared bookkeeping. Correctness tests compare
//! engine output against it pair by pair.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::costing::{Cost, DynamicCost, TransitionContext};
use crate::error::Result;
use crate::graph::{GraphId, GraphReader};
use crate::request::MatrixLocation;

/// Min-heap entry; ties break by edge id to keep pops deterministic.
struct QueueEntry {
    cost: f32,
    edge: GraphId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.edge == other.edge
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the cheapest entry first.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

struct RefLabel {
    cost: Cost,
    distance: f32,
    seed: bool,
    opp_edgeid: GraphId,
    endnode: GraphId,
    deadend: bool,
    not_thru: bool,
}

/// Outcome of one reference query.
#[derive(Debug, Clone, Default)]
pub struct ReferenceResult {
    pub cost: Option<Cost>,
    pub distance: f32,
    /// Edges settled; used to compare work against the shared engine.
    pub settled: usize,
}

/// One-to-one best cost between two locations by plain Dijkstra.
pub fn shortest_cost(
    reader: &dyn GraphReader,
    costing: &dyn DynamicCost,
    source: &MatrixLocation,
    target: &MatrixLocation,
    timestamp: Option<u64>,
) -> Result<ReferenceResult> {
    let mut labels: FxHashMap<GraphId, RefLabel> = FxHashMap::default();
    let mut settled: FxHashSet<GraphId> = FxHashSet::default();
    let mut heap: BinaryHeap<QueueEntry> = BinaryHeap::new();

    for candidate in &source.candidates {
        let edge_id = candidate.edge_id;
        if labels.contains_key(&edge_id) {
            continue;
        }
        let edge = reader.directed_edge(edge_id)?;
        if !costing.allowed(edge) {
            continue;
        }
        let pct = candidate.percent_along.clamp(0.0, 1.0);
        let cost = costing.edge_cost(edge, timestamp) * (1.0 - pct);
        let label = RefLabel {
            cost,
            distance: edge.length * (1.0 - pct),
            seed: true,
            opp_edgeid: reader.opposing_edge_id(edge_id)?,
            endnode: edge.endnode,
            deadend: reader.node_info(edge.endnode)?.edges.len() <= 1,
            not_thru: edge.not_thru,
        };
        heap.push(QueueEntry {
            cost: cost.cost,
            edge: edge_id,
        });
        labels.insert(edge_id, label);
    }

    let mut result = ReferenceResult::default();
    let mut best = Cost::max();
    let mut best_distance = f32::INFINITY;

    while let Some(QueueEntry { cost, edge: edge_id }) = heap.pop() {
        if settled.contains(&edge_id) || labels[&edge_id].cost.cost < cost {
            continue;
        }
        settled.insert(edge_id);
        result.settled += 1;

        // Arrival check: the target may sit anywhere along this edge.
        let settled_cost = labels[&edge_id].cost;
        let settled_distance = labels[&edge_id].distance;
        let settled_seed = labels[&edge_id].seed;
        for candidate in &target.candidates {
            if candidate.edge_id != edge_id {
                continue;
            }
            let edge = reader.directed_edge(edge_id)?;
            let full = costing.edge_cost(edge, timestamp);
            let pct = candidate.percent_along.clamp(0.0, 1.0);
            let (arrival, distance) = if settled_seed {
                let source_pct = source
                    .candidates
                    .iter()
                    .find(|c| c.edge_id == edge_id)
                    .map(|c| c.percent_along.clamp(0.0, 1.0))
                    .unwrap_or(0.0);
                (
                    full * (pct - source_pct).abs(),
                    edge.length * (pct - source_pct).abs(),
                )
            } else {
                (
                    Cost::new(
                        (settled_cost.cost - full.cost * (1.0 - pct)).max(0.0),
                        (settled_cost.secs - full.secs * (1.0 - pct)).max(0.0),
                    ),
                    (settled_distance - edge.length * (1.0 - pct)).max(0.0),
                )
            };
            if arrival.cost < best.cost {
                best = arrival;
                best_distance = distance;
            }
        }

        // Relax successors across all levels reachable by transitions.
        let pred_deadend = labels[&edge_id].deadend;
        let pred_not_thru = labels[&edge_id].not_thru;
        let pred_opp = labels[&edge_id].opp_edgeid;
        for node_id in transition_closure(reader, labels[&edge_id].endnode)? {
            let node = reader.node_info(node_id)?;
            for &edge_local in &node.edges {
                let next_id = GraphId::new(node_id.level(), node_id.tile(), edge_local as u64);
                let uturn = next_id == pred_opp;
                if uturn && !pred_deadend {
                    continue;
                }
                if settled.contains(&next_id) {
                    continue;
                }
                let next = reader.directed_edge(next_id)?;
                if next.not_thru && !pred_not_thru {
                    continue;
                }
                if !costing.allowed(next) {
                    continue;
                }
                let transition = costing.transition_cost(&TransitionContext {
                    uturn,
                    deadend: pred_deadend,
                });
                let cost = settled_cost + transition + costing.edge_cost(next, timestamp);
                let distance = settled_distance + next.length;
                let improved = labels
                    .get(&next_id)
                    .map(|l| cost.cost < l.cost.cost)
                    .unwrap_or(true);
                if improved {
                    labels.insert(
                        next_id,
                        RefLabel {
                            cost,
                            distance,
                            seed: false,
                            opp_edgeid: reader.opposing_edge_id(next_id)?,
                            endnode: next.endnode,
                            deadend: reader.node_info(next.endnode)?.edges.len() <= 1,
                            not_thru: next.not_thru || pred_not_thru,
                        },
                    );
                    heap.push(QueueEntry {
                        cost: cost.cost,
                        edge: next_id,
                    });
                }
            }
        }
    }

    if best.is_valid() {
        result.cost = Some(best);
        result.distance = best_distance;
    }
    Ok(result)
}

/// The node itself plus everything reachable over level transitions.
fn transition_closure(reader: &dyn GraphReader, node_id: GraphId) -> Result<Vec<GraphId>> {
    let mut seen: FxHashSet<GraphId> = FxHashSet::default();
    let mut queue = vec![node_id];
    let mut out = Vec::new();
    seen.insert(node_id);
    while let Some(id) = queue.pop() {
        out.push(id);
        for transition in &reader.node_info(id)?.transitions {
            if seen.insert(transition.endnode) {
                queue.push(transition.endnode);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::AutoCost;
    use crate::graph::{EdgeSpec, TileId, TileSetBuilder};

    #[test]
    fn test_reference_line_graph() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let nodes: Vec<_> = (0..4).map(|_| b.add_node(tile)).collect();
        let mut edges = Vec::new();
        for w in nodes.windows(2) {
            let (fwd, _) = b.add_edge_pair(w[0], w[1], EdgeSpec::unit());
            edges.push(fwd);
        }
        let tiles = b.build();

        let result = shortest_cost(
            &tiles,
            &AutoCost::default(),
            &MatrixLocation::on_edge(edges[0], 0.0),
            &MatrixLocation::on_edge(edges[2], 1.0),
            None,
        )
        .unwrap();
        let cost = result.cost.expect("path exists");
        assert!((cost.secs - 3.0).abs() < 1e-3);
        assert!((result.distance - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_reference_unreachable() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let a = b.add_node(tile);
        let c = b.add_node(tile);
        let (ab, _) = b.add_edge_pair(a, c, EdgeSpec::unit());
        let x = b.add_node(tile);
        let y = b.add_node(tile);
        let (xy, _) = b.add_edge_pair(x, y, EdgeSpec::unit());
        let tiles = b.build();

        let result = shortest_cost(
            &tiles,
            &AutoCost::default(),
            &MatrixLocation::on_edge(ab, 0.0),
            &MatrixLocation::on_edge(xy, 1.0),
            None,
        )
        .unwrap();
        assert!(result.cost.is_none());
    }

    #[test]
    fn test_reference_same_edge() {
        let mut b = TileSetBuilder::new();
        let tile = TileId::new(2, 0);
        let a = b.add_node(tile);
        let c = b.add_node(tile);
        let (ab, _) = b.add_edge_pair(a, c, EdgeSpec::unit().with_length(100.0));
        let tiles = b.build();

        let result = shortest_cost(
            &tiles,
            &AutoCost::default(),
            &MatrixLocation::on_edge(ab, 0.25),
            &MatrixLocation::on_edge(ab, 0.75),
            None,
        )
        .unwrap();
        let cost = result.cost.expect("same edge");
        assert!((cost.secs - 50.0).abs() < 1e-3);
        assert!((result.distance - 50.0).abs() < 1e-3);
    }
}
