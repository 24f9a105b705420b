//! The expansion driver and its per-location search state.
//!
//! One forward search per source and one backward search per target share
//! a single round-robin loop, each advancing by one settled edge per turn.
//! Forward settles are the only meeting point: every one consults the
//! target map for the settled edge's opposing twin and folds any meeting
//! into the per-pair best connection.

use log::debug;
use rustc_hash::FxHashSet;

use super::bucket_queue::DoubleBucketQueue;
use super::edge_label::{EdgeLabel, INVALID_LABEL};
use super::edge_status::{EdgeSet, EdgeStatus};
use super::recost;
use super::target_map::TargetMap;
use super::{MatrixCell, MatrixConfig, MatrixResponse, MatrixStats};
use crate::costing::{Cost, DynamicCost, HierarchyLimits, ModeCosting, TransitionContext};
use crate::error::{Error, Result};
use crate::graph::{GraphId, GraphReader};
use crate::request::MatrixRequest;
use crate::time::TimeInfo;

/// Location threshold before the settle countdown is armed.
const UNSETTLED_THRESHOLD: u32 = u32::MAX;

/// Which level transitions may be followed while expanding one settled
/// edge. Keeping the direction monotone per settle bounds the recursion to
/// the number of levels.
#[derive(Clone, Copy, PartialEq)]
enum TransitionDir {
    Any,
    Up,
    Down,
}

/// Per-location bookkeeping: the indices of the opposing side not yet met,
/// and the iterations left once every one of them has been.
struct LocationStatus {
    threshold: u32,
    remaining: FxHashSet<u32>,
}

impl LocationStatus {
    fn new(remaining_count: usize) -> LocationStatus {
        LocationStatus {
            threshold: UNSETTLED_THRESHOLD,
            remaining: (0..remaining_count as u32).collect(),
        }
    }
}

/// Best connection found so far for one source–target pair.
#[derive(Clone, Debug)]
pub struct BestCandidate {
    pub found: bool,
    /// Meeting edge on the forward side.
    pub edgeid: GraphId,
    /// Its opposing twin on the backward side.
    pub opp_edgeid: GraphId,
    pub cost: Cost,
    pub distance: f32,
    /// Forward iterations of the source during which a cheaper meeting may
    /// still supersede this one.
    pub threshold: u32,
}

impl BestCandidate {
    fn empty() -> BestCandidate {
        BestCandidate {
            found: false,
            edgeid: GraphId::INVALID,
            opp_edgeid: GraphId::INVALID,
            cost: Cost::max(),
            distance: f32::INFINITY,
            threshold: 0,
        }
    }

    fn update(&mut self, edgeid: GraphId, opp_edgeid: GraphId, cost: Cost, distance: f32) {
        self.edgeid = edgeid;
        self.opp_edgeid = opp_edgeid;
        self.cost = cost;
        self.distance = distance;
    }

    /// Ties break by shorter distance, then by lower edge id.
    fn improves(&self, cost: Cost, distance: f32, edgeid: GraphId) -> bool {
        if cost.cost != self.cost.cost {
            return cost.cost < self.cost.cost;
        }
        if distance != self.distance {
            return distance < self.distance;
        }
        edgeid < self.edgeid
    }
}

/// The many-to-many cost matrix engine. Reusable across queries; all
/// per-query state is released by [`CostMatrix::clear`].
pub struct CostMatrix {
    config: MatrixConfig,
    current_cost_threshold: f32,

    source_count: usize,
    target_count: usize,
    remaining_sources: usize,
    remaining_targets: usize,

    source_status: Vec<LocationStatus>,
    target_status: Vec<LocationStatus>,
    source_hierarchy_limits: Vec<Vec<HierarchyLimits>>,
    target_hierarchy_limits: Vec<Vec<HierarchyLimits>>,
    source_queue: Vec<DoubleBucketQueue>,
    target_queue: Vec<DoubleBucketQueue>,
    source_labels: Vec<Vec<EdgeLabel>>,
    target_labels: Vec<Vec<EdgeLabel>>,
    source_edgestatus: Vec<EdgeStatus>,
    target_edgestatus: Vec<EdgeStatus>,
    source_times: Vec<TimeInfo>,

    best_connection: Vec<BestCandidate>,
    targets: TargetMap,
    stats: MatrixStats,
}

impl Default for CostMatrix {
    fn default() -> CostMatrix {
        CostMatrix::new(MatrixConfig::default())
    }
}

impl CostMatrix {
    pub fn new(config: MatrixConfig) -> CostMatrix {
        CostMatrix {
            config,
            current_cost_threshold: 0.0,
            source_count: 0,
            target_count: 0,
            remaining_sources: 0,
            remaining_targets: 0,
            source_status: Vec::new(),
            target_status: Vec::new(),
            source_hierarchy_limits: Vec::new(),
            target_hierarchy_limits: Vec::new(),
            source_queue: Vec::new(),
            target_queue: Vec::new(),
            source_labels: Vec::new(),
            target_labels: Vec::new(),
            source_edgestatus: Vec::new(),
            target_edgestatus: Vec::new(),
            source_times: Vec::new(),
            best_connection: Vec::new(),
            targets: TargetMap::default(),
            stats: MatrixStats::default(),
        }
    }

    /// Compute the matrix for `request`. The caller supplies the costing
    /// table; the active mode is taken from the request. `interrupt` is
    /// polled between outer iterations; returning true cancels the query
    /// and yields the partial matrix found so far.
    pub fn source_to_target(
        &mut self,
        request: &MatrixRequest,
        reader: &dyn GraphReader,
        mode_costing: &ModeCosting,
        interrupt: Option<&dyn Fn() -> bool>,
    ) -> Result<MatrixResponse> {
        let costing = mode_costing.get(request.mode);
        self.clear();

        if request.sources.is_empty() || request.targets.is_empty() {
            return Ok(MatrixResponse {
                source_count: request.sources.len(),
                target_count: request.targets.len(),
                ..MatrixResponse::default()
            });
        }

        self.current_cost_threshold = self
            .config
            .cost_threshold(request.mode, request.max_matrix_distance);
        self.initialize(request, costing);
        self.set_sources(request, reader, costing)?;
        self.set_targets(request, reader, costing)?;

        let mut cancelled = false;
        let mut n: u32 = 0;
        while self.remaining_sources > 0 || self.remaining_targets > 0 {
            if let Some(interrupt) = interrupt {
                if interrupt() {
                    debug!("matrix query interrupted at iteration {n}");
                    cancelled = true;
                    break;
                }
            }
            for s in 0..self.source_count {
                if self.source_status[s].threshold > 0 {
                    self.forward_search(s, n, reader, costing)?;
                }
            }
            for t in 0..self.target_count {
                if self.target_status[t].threshold > 0 {
                    self.backward_search(t, reader, costing)?;
                }
            }
            n += 1;
        }
        self.stats.iterations = n;

        if !cancelled && request.has_time && !request.invariant {
            self.recost_paths(request, reader, costing)?;
        }

        debug!(
            "matrix {}x{}: {} connections, {} settles, {} iterations",
            self.source_count,
            self.target_count,
            self.stats.connections,
            self.stats.settled(),
            n
        );
        let response = self.form_response(request, cancelled);
        self.clear();
        Ok(response)
    }

    /// Release all per-location state from the previous query.
    pub fn clear(&mut self) {
        self.current_cost_threshold = 0.0;
        self.source_count = 0;
        self.target_count = 0;
        self.remaining_sources = 0;
        self.remaining_targets = 0;
        self.source_status.clear();
        self.target_status.clear();
        self.source_hierarchy_limits.clear();
        self.target_hierarchy_limits.clear();
        self.source_queue.clear();
        self.target_queue.clear();
        self.source_labels.clear();
        self.target_labels.clear();
        self.source_edgestatus.clear();
        self.target_edgestatus.clear();
        self.source_times.clear();
        self.best_connection.clear();
        self.targets.clear();
        self.stats = MatrixStats::default();
    }

    fn initialize(&mut self, request: &MatrixRequest, costing: &dyn DynamicCost) {
        self.source_count = request.sources.len();
        self.target_count = request.targets.len();
        self.remaining_sources = self.source_count;
        self.remaining_targets = self.target_count;

        let unit = costing.unit_size();
        let reserve = self.config.max_reserved_labels_count;

        for _ in 0..self.source_count {
            self.source_status.push(LocationStatus::new(self.target_count));
            self.source_hierarchy_limits.push(costing.hierarchy_limits());
            self.source_queue
                .push(DoubleBucketQueue::new(0.0, self.current_cost_threshold, unit));
            self.source_labels.push(Vec::with_capacity(reserve));
            self.source_edgestatus.push(EdgeStatus::default());
        }
        for _ in 0..self.target_count {
            self.target_status.push(LocationStatus::new(self.source_count));
            self.target_hierarchy_limits.push(costing.hierarchy_limits());
            self.target_queue
                .push(DoubleBucketQueue::new(0.0, self.current_cost_threshold, unit));
            self.target_labels.push(Vec::with_capacity(reserve));
            self.target_edgestatus.push(EdgeStatus::default());
        }

        self.best_connection = (0..self.source_count * self.target_count)
            .map(|_| BestCandidate::empty())
            .collect();
        self.source_times = if request.has_time {
            request.sources.iter().map(TimeInfo::make).collect()
        } else {
            vec![TimeInfo::default(); self.source_count]
        };
    }

    /// Seed one forward search per source from its candidate edges. Initial
    /// cost is scaled by the remaining fraction of the edge.
    fn set_sources(
        &mut self,
        request: &MatrixRequest,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        for (s, location) in request.sources.iter().enumerate() {
            let timestamp = self.source_times[s].timestamp();
            for candidate in &location.candidates {
                let edge_id = candidate.edge_id;
                if self.source_edgestatus[s].get(edge_id).set != EdgeSet::Unreached {
                    continue;
                }
                let edge = reader.directed_edge(edge_id)?;
                if !costing.allowed(edge) {
                    continue;
                }
                let full = costing.edge_cost(edge, timestamp);
                if !full.is_valid() {
                    return Err(Error::CostingError(edge_id));
                }
                let pct = candidate.percent_along.clamp(0.0, 1.0);
                let cost = full * (1.0 - pct);
                let distance = edge.length * (1.0 - pct);
                let opp_edgeid = reader.opposing_edge_id(edge_id)?;
                let deadend = reader.node_info(edge.endnode)?.edges.len() <= 1;

                let index = self.source_labels[s].len() as u32;
                self.source_labels[s].push(EdgeLabel {
                    predecessor: INVALID_LABEL,
                    edgeid: edge_id,
                    opp_edgeid,
                    endnode: edge.endnode,
                    cost,
                    sortcost: cost.cost,
                    distance,
                    level: edge_id.level(),
                    not_thru: edge.not_thru,
                    deadend,
                    transition_cost: Cost::default(),
                });
                self.source_queue[s].add(index, cost.cost);
                self.source_edgestatus[s].set(edge_id, EdgeSet::Temporary, index);
                self.stats.forward_labels += 1;
            }
            if self.source_labels[s].is_empty() {
                debug!("source {s} has no usable candidate edges");
                self.terminate_forward(s);
            }
        }
        Ok(())
    }

    /// Seed one backward search per target. Seeds go onto the opposing
    /// orientation of each candidate edge, scaled by the traversed fraction,
    /// and are registered in the target map immediately so a forward settle
    /// can meet a target whose backward search has not stepped yet.
    fn set_targets(
        &mut self,
        request: &MatrixRequest,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        for (t, location) in request.targets.iter().enumerate() {
            for candidate in &location.candidates {
                let edge_id = candidate.edge_id;
                let opp_id = reader.opposing_edge_id(edge_id)?;
                if self.target_edgestatus[t].get(opp_id).set != EdgeSet::Unreached {
                    continue;
                }
                let opp_edge = reader.directed_edge(opp_id)?;
                if !costing.allowed_reverse(opp_edge) {
                    continue;
                }
                let full = costing.edge_cost_reverse(opp_edge, None);
                if !full.is_valid() {
                    return Err(Error::CostingError(opp_id));
                }
                let pct = candidate.percent_along.clamp(0.0, 1.0);
                let cost = full * pct;
                let distance = opp_edge.length * pct;
                let deadend = reader.node_info(opp_edge.endnode)?.edges.len() <= 1;

                let index = self.target_labels[t].len() as u32;
                self.target_labels[t].push(EdgeLabel {
                    predecessor: INVALID_LABEL,
                    edgeid: opp_id,
                    opp_edgeid: edge_id,
                    endnode: opp_edge.endnode,
                    cost,
                    sortcost: cost.cost,
                    distance,
                    level: opp_id.level(),
                    not_thru: opp_edge.not_thru,
                    deadend,
                    transition_cost: Cost::default(),
                });
                self.target_queue[t].add(index, cost.cost);
                self.target_edgestatus[t].set(opp_id, EdgeSet::Temporary, index);
                self.targets.add(opp_id, t as u32, index);
                self.stats.backward_labels += 1;
            }
            if self.target_labels[t].is_empty() {
                debug!("target {t} has no usable candidate edges");
                self.terminate_backward(t);
            }
        }
        Ok(())
    }

    /// One step of source `s`'s forward search: settle the cheapest edge,
    /// detect meetings, relax its successors, then age the settle countdown.
    fn forward_search(
        &mut self,
        s: usize,
        n: u32,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        let Some(predindex) = self.source_queue[s].pop() else {
            debug!("source {s} exhausted at iteration {n}");
            self.terminate_forward(s);
            return Ok(());
        };
        let pred = self.source_labels[s][predindex as usize].clone();
        if pred.cost.cost > self.current_cost_threshold {
            debug!("source {s} beyond the cost ceiling at iteration {n}");
            self.terminate_forward(s);
            return Ok(());
        }
        self.source_edgestatus[s].update(pred.edgeid, EdgeSet::Permanent);
        self.stats.forward_settled += 1;

        // Age the armed pairs first so a meeting found this turn keeps its
        // full supersession window.
        for t in 0..self.target_count {
            let bc = &mut self.best_connection[s * self.target_count + t];
            if bc.found && bc.threshold > 0 {
                bc.threshold -= 1;
            }
        }

        let updated = self.check_forward_connections(s, &pred, reader, costing)?;
        self.expand_forward(s, predindex, &pred, reader, costing)?;

        let status = &mut self.source_status[s];
        if status.remaining.is_empty() && !updated && status.threshold > 0 {
            status.threshold -= 1;
            if status.threshold == 0 {
                self.remaining_sources -= 1;
            }
        }
        Ok(())
    }

    /// One step of target `t`'s backward search. Backward settles never
    /// check for connections themselves; they only extend the target map
    /// that forward settles consult.
    fn backward_search(
        &mut self,
        t: usize,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        let Some(predindex) = self.target_queue[t].pop() else {
            self.terminate_backward(t);
            return Ok(());
        };
        let pred = self.target_labels[t][predindex as usize].clone();
        if pred.cost.cost > self.current_cost_threshold {
            self.terminate_backward(t);
            return Ok(());
        }
        self.target_edgestatus[t].update(pred.edgeid, EdgeSet::Permanent);
        self.stats.backward_settled += 1;

        // Seed edges were registered at set_targets time.
        if !pred.is_seed() {
            self.targets.add(pred.edgeid, t as u32, predindex);
        }

        self.expand_reverse(t, predindex, &pred, reader, costing)?;

        let status = &mut self.target_status[t];
        if status.remaining.is_empty() && status.threshold > 0 {
            status.threshold -= 1;
            if status.threshold == 0 {
                self.remaining_targets -= 1;
            }
        }
        Ok(())
    }

    /// Detect meetings at a forward settle: any target whose backward tree
    /// reached the opposing twin of the settled edge closes (or improves)
    /// that pair.
    fn check_forward_connections(
        &mut self,
        s: usize,
        pred: &EdgeLabel,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<bool> {
        let Some(entries) = self.targets.get(pred.opp_edgeid) else {
            return Ok(false);
        };
        let entries = entries.to_vec();
        let mut updated = false;

        for (target, label_index) in entries {
            let t = target as usize;
            let idx = s * self.target_count + t;
            if self.best_connection[idx].found && self.best_connection[idx].threshold == 0 {
                // Frozen: the supersession window has closed.
                continue;
            }

            let opp_label = &self.target_labels[t][label_index as usize];
            let (cost, distance) = if opp_label.is_seed() {
                // The target lies on the meeting edge itself: both labels
                // cover (part of) the same edge, so trim one full traversal.
                let edge = reader.directed_edge(pred.edgeid)?;
                let full = costing.edge_cost(edge, self.source_times[s].timestamp());
                let cost = Cost::new(
                    pred.cost.cost + opp_label.cost.cost - full.cost,
                    pred.cost.secs + opp_label.cost.secs - full.secs,
                );
                let distance = pred.distance + opp_label.distance - edge.length;
                if pred.is_seed() {
                    // Source and target share the edge; the signed overlap
                    // collapses to the span between the two points.
                    (cost.abs(), distance.abs())
                } else {
                    (
                        Cost::new(cost.cost.max(0.0), cost.secs.max(0.0)),
                        distance.max(0.0),
                    )
                }
            } else {
                // Forward cost covers the meeting edge; the opposing label's
                // predecessor covers everything beyond it, and the opposing
                // label's transition snapshot pays for the junction.
                let prior = &self.target_labels[t][opp_label.predecessor as usize];
                (
                    pred.cost + prior.cost + opp_label.transition_cost,
                    pred.distance + prior.distance,
                )
            };

            if !self.best_connection[idx].found {
                let bc = &mut self.best_connection[idx];
                bc.update(pred.edgeid, pred.opp_edgeid, cost, distance);
                bc.found = true;
                bc.threshold = self.config.pair_meeting_threshold;
                self.stats.connections += 1;
                self.update_status(s, t);
                updated = true;
            } else if self.best_connection[idx].improves(cost, distance, pred.edgeid) {
                let bc = &mut self.best_connection[idx];
                bc.update(pred.edgeid, pred.opp_edgeid, cost, distance);
                // Progress keeps the supersession window open.
                bc.threshold = self.config.pair_meeting_threshold;
                // A fresh connection restarts the settle countdowns.
                self.rearm_settle_countdown(s, t);
                updated = true;
            }
        }
        Ok(updated)
    }

    /// Strike the pair off both remaining sets; when a location has met
    /// every counterpart its settle countdown is armed.
    fn update_status(&mut self, s: usize, t: usize) {
        let settle = self.config.location_settle_threshold.max(1);
        let status = &mut self.source_status[s];
        if status.remaining.remove(&(t as u32))
            && status.remaining.is_empty()
            && status.threshold == UNSETTLED_THRESHOLD
        {
            status.threshold = settle;
        }
        let status = &mut self.target_status[t];
        if status.remaining.remove(&(s as u32))
            && status.remaining.is_empty()
            && status.threshold == UNSETTLED_THRESHOLD
        {
            status.threshold = settle;
        }
    }

    fn rearm_settle_countdown(&mut self, s: usize, t: usize) {
        let settle = self.config.location_settle_threshold.max(1);
        let status = &mut self.source_status[s];
        if status.remaining.is_empty() && status.threshold > 0 {
            status.threshold = settle;
        }
        let status = &mut self.target_status[t];
        if status.remaining.is_empty() && status.threshold > 0 {
            status.threshold = settle;
        }
    }

    fn terminate_forward(&mut self, s: usize) {
        let status = &mut self.source_status[s];
        if status.threshold != 0 {
            status.threshold = 0;
            self.remaining_sources -= 1;
        }
    }

    fn terminate_backward(&mut self, t: usize) {
        let status = &mut self.target_status[t];
        if status.threshold != 0 {
            status.threshold = 0;
            self.remaining_targets -= 1;
        }
    }

    fn expand_forward(
        &mut self,
        s: usize,
        predindex: u32,
        pred: &EdgeLabel,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        self.expand_forward_node(
            s,
            predindex,
            pred,
            pred.endnode,
            TransitionDir::Any,
            reader,
            costing,
        )
    }

    /// Relax the outgoing edges at `node_id`, then follow its level
    /// transitions with the frontier (the label is unchanged; only the
    /// expansion point moves across levels).
    fn expand_forward_node(
        &mut self,
        s: usize,
        predindex: u32,
        pred: &EdgeLabel,
        node_id: GraphId,
        dir: TransitionDir,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        let node = reader.node_info(node_id)?;
        let timestamp = self.source_times[s].timestamp();

        for &edge_local in &node.edges {
            let edge_id = GraphId::new(node_id.level(), node_id.tile(), edge_local as u64);
            let uturn = edge_id == pred.opp_edgeid;
            if uturn && !pred.deadend {
                continue;
            }
            let status = self.source_edgestatus[s].get(edge_id);
            if status.set == EdgeSet::Permanent {
                continue;
            }
            let edge = reader.directed_edge(edge_id)?;
            if edge.not_thru && !pred.not_thru {
                continue;
            }
            let level = edge_id.level() as usize;
            if !self.source_hierarchy_limits[s][level].expansion_allowed(pred.distance) {
                continue;
            }
            if !costing.allowed(edge) {
                continue;
            }

            let transition = costing.transition_cost(&TransitionContext {
                uturn,
                deadend: pred.deadend,
            });
            let cost = pred.cost + transition + costing.edge_cost(edge, timestamp);
            if !cost.is_valid() {
                return Err(Error::CostingError(edge_id));
            }
            let distance = pred.distance + edge.length;

            if status.set == EdgeSet::Temporary {
                let label = &mut self.source_labels[s][status.index as usize];
                if cost.cost < label.cost.cost {
                    let old_sortcost = label.sortcost;
                    label.predecessor = predindex;
                    label.cost = cost;
                    label.sortcost = cost.cost;
                    label.distance = distance;
                    label.transition_cost = transition;
                    self.source_queue[s].decrease(status.index, old_sortcost, cost.cost);
                }
                continue;
            }

            if self.source_labels[s].len() >= self.config.max_label_count {
                return Err(Error::ResourceExhaustion {
                    labels: self.source_labels[s].len(),
                    cap: self.config.max_label_count,
                });
            }
            let opp_edgeid = reader.opposing_edge_id(edge_id)?;
            let deadend = reader.node_info(edge.endnode)?.edges.len() <= 1;
            let index = self.source_labels[s].len() as u32;
            self.source_labels[s].push(EdgeLabel {
                predecessor: predindex,
                edgeid: edge_id,
                opp_edgeid,
                endnode: edge.endnode,
                cost,
                sortcost: cost.cost,
                distance,
                level: level as u8,
                not_thru: edge.not_thru || pred.not_thru,
                deadend,
                transition_cost: transition,
            });
            self.source_queue[s].add(index, cost.cost);
            self.source_edgestatus[s].set(edge_id, EdgeSet::Temporary, index);
            self.stats.forward_labels += 1;
        }

        for transition in &node.transitions {
            let follow = match dir {
                TransitionDir::Any => true,
                TransitionDir::Up => transition.up,
                TransitionDir::Down => !transition.up,
            };
            if !follow {
                continue;
            }
            let level = transition.endnode.level() as usize;
            if transition.up {
                if !self.source_hierarchy_limits[s][level].allow_up_transition() {
                    continue;
                }
            } else if !self.source_hierarchy_limits[s][level].expansion_allowed(pred.distance) {
                continue;
            }
            let next_dir = if transition.up {
                TransitionDir::Up
            } else {
                TransitionDir::Down
            };
            self.expand_forward_node(
                s,
                predindex,
                pred,
                transition.endnode,
                next_dir,
                reader,
                costing,
            )?;
        }
        Ok(())
    }

    fn expand_reverse(
        &mut self,
        t: usize,
        predindex: u32,
        pred: &EdgeLabel,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        self.expand_reverse_node(
            t,
            predindex,
            pred,
            pred.endnode,
            TransitionDir::Any,
            reader,
            costing,
        )
    }

    /// Mirror of the forward expansion. Labels go onto the outgoing edges
    /// of the node but cost their opposing twins, so the backward tree
    /// walks every edge against its direction.
    fn expand_reverse_node(
        &mut self,
        t: usize,
        predindex: u32,
        pred: &EdgeLabel,
        node_id: GraphId,
        dir: TransitionDir,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        let node = reader.node_info(node_id)?;

        for &edge_local in &node.edges {
            let edge_id = GraphId::new(node_id.level(), node_id.tile(), edge_local as u64);
            let uturn = edge_id == pred.opp_edgeid;
            if uturn && !pred.deadend {
                continue;
            }
            let status = self.target_edgestatus[t].get(edge_id);
            if status.set == EdgeSet::Permanent {
                continue;
            }
            let edge = reader.directed_edge(edge_id)?;
            if edge.not_thru && !pred.not_thru {
                continue;
            }
            let level = edge_id.level() as usize;
            if !self.target_hierarchy_limits[t][level].expansion_allowed(pred.distance) {
                continue;
            }
            if !costing.allowed_reverse(edge) {
                continue;
            }

            let transition = costing.transition_cost_reverse(&TransitionContext {
                uturn,
                deadend: pred.deadend,
            });
            let cost = pred.cost + transition + costing.edge_cost_reverse(edge, None);
            if !cost.is_valid() {
                return Err(Error::CostingError(edge_id));
            }
            let distance = pred.distance + edge.length;

            if status.set == EdgeSet::Temporary {
                let label = &mut self.target_labels[t][status.index as usize];
                if cost.cost < label.cost.cost {
                    let old_sortcost = label.sortcost;
                    label.predecessor = predindex;
                    label.cost = cost;
                    label.sortcost = cost.cost;
                    label.distance = distance;
                    label.transition_cost = transition;
                    self.target_queue[t].decrease(status.index, old_sortcost, cost.cost);
                }
                continue;
            }

            if self.target_labels[t].len() >= self.config.max_label_count {
                return Err(Error::ResourceExhaustion {
                    labels: self.target_labels[t].len(),
                    cap: self.config.max_label_count,
                });
            }
            let opp_edgeid = reader.opposing_edge_id(edge_id)?;
            let deadend = reader.node_info(edge.endnode)?.edges.len() <= 1;
            let index = self.target_labels[t].len() as u32;
            self.target_labels[t].push(EdgeLabel {
                predecessor: predindex,
                edgeid: edge_id,
                opp_edgeid,
                endnode: edge.endnode,
                cost,
                sortcost: cost.cost,
                distance,
                level: level as u8,
                not_thru: edge.not_thru || pred.not_thru,
                deadend,
                transition_cost: transition,
            });
            self.target_queue[t].add(index, cost.cost);
            self.target_edgestatus[t].set(edge_id, EdgeSet::Temporary, index);
            self.stats.backward_labels += 1;
        }

        for transition in &node.transitions {
            let follow = match dir {
                TransitionDir::Any => true,
                TransitionDir::Up => transition.up,
                TransitionDir::Down => !transition.up,
            };
            if !follow {
                continue;
            }
            let level = transition.endnode.level() as usize;
            if transition.up {
                if !self.target_hierarchy_limits[t][level].allow_up_transition() {
                    continue;
                }
            } else if !self.target_hierarchy_limits[t][level].expansion_allowed(pred.distance) {
                continue;
            }
            let next_dir = if transition.up {
                TransitionDir::Up
            } else {
                TransitionDir::Down
            };
            self.expand_reverse_node(
                t,
                predindex,
                pred,
                transition.endnode,
                next_dir,
                reader,
                costing,
            )?;
        }
        Ok(())
    }

    /// Re-walk every found pair with real timestamps and replace its cost.
    fn recost_paths(
        &mut self,
        request: &MatrixRequest,
        reader: &dyn GraphReader,
        costing: &dyn DynamicCost,
    ) -> Result<()> {
        for s in 0..self.source_count {
            let time = TimeInfo::make(&request.sources[s]);
            for t in 0..self.target_count {
                let idx = s * self.target_count + t;
                if !self.best_connection[idx].found {
                    continue;
                }
                let Some(path) = recost::reconstruct_path(
                    &self.source_labels[s],
                    &self.source_edgestatus[s],
                    &self.target_labels[t],
                    &self.target_edgestatus[t],
                    &self.best_connection[idx],
                ) else {
                    continue;
                };
                let source_pct = percent_for(&request.sources[s], path[0], 0.0);
                let target_pct = percent_for(&request.targets[t], *path.last().unwrap(), 1.0);
                let cost =
                    recost::recost_forward(reader, costing, &path, source_pct, target_pct, time)?;
                self.best_connection[idx].cost = cost;
                self.stats.recosted += 1;
            }
        }
        Ok(())
    }

    fn form_response(&self, request: &MatrixRequest, cancelled: bool) -> MatrixResponse {
        let mut cells = Vec::with_capacity(self.source_count * self.target_count);
        for s in 0..self.source_count {
            let begin_time = if request.has_time {
                request.sources[s].date_time
            } else {
                None
            };
            for t in 0..self.target_count {
                let bc = &self.best_connection[s * self.target_count + t];
                if bc.found && bc.cost.is_valid() {
                    cells.push(MatrixCell {
                        found: true,
                        seconds: bc.cost.secs,
                        cost: bc.cost.cost,
                        distance: bc.distance,
                        begin_time,
                        end_time: begin_time.map(|b| b + bc.cost.secs.max(0.0).round() as u64),
                    });
                } else {
                    cells.push(MatrixCell::not_found());
                }
            }
        }
        MatrixResponse {
            source_count: self.source_count,
            target_count: self.target_count,
            cells,
            cancelled,
            stats: self.stats.clone(),
        }
    }
}

/// Percent-along of the candidate matching `edge_id`. The fallback covers
/// the whole edge and cannot trigger for a found pair, whose path always
/// ends on candidate edges.
fn percent_for(location: &crate::request::MatrixLocation, edge_id: GraphId, default: f32) -> f32 {
    location
        .candidates
        .iter()
        .find(|c| c.edge_id == edge_id)
        .map(|c| c.percent_along.clamp(0.0, 1.0))
        .unwrap_or(default)
}
