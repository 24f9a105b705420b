//! Many-to-many cost matrix computation.
//!
//! Given S sources and T targets on the tiled graph, [`CostMatrix`]
//! produces the S×T matrix of best cost, time and distance with one
//! coordinated bidirectional search (Knopp, "Efficient Computation of
//! Many-to-Many Shortest Paths"):
//!
//! 1. Seeding: one forward search per source, one backward search per
//!    target, each seeded from the location's candidate edges.
//! 2. Expansion: a round-robin driver advances every live search by one
//!    settled edge per turn, so no location can exhaust the budget alone.
//! 3. Meeting: every forward settle consults the target map; a settled
//!    edge whose opposing twin was reached by a backward tree closes a
//!    source–target pair.
//! 4. Termination: per-location thresholds decay once a location has met
//!    all of its counterparts; a cost ceiling derived from the maximum
//!    matrix distance bounds work on unreachable pairs.
//! 5. Recosting: time-aware queries re-walk each meeting path with real
//!    timestamps before results are written.

pub mod bucket_queue;
pub mod cost_matrix;
pub mod edge_label;
pub mod edge_status;
mod recost;
pub mod target_map;

pub use bucket_queue::DoubleBucketQueue;
pub use cost_matrix::{BestCandidate, CostMatrix};
pub use edge_label::{EdgeLabel, INVALID_LABEL};
pub use edge_status::{EdgeSet, EdgeStatus, EdgeStatusInfo};
pub use target_map::TargetMap;

use serde::{Deserialize, Serialize};

use crate::costing::TravelMode;

/// Tunables of the matrix engine. All thresholds are per-query
/// configuration rather than compile-time constants so callers can tune
/// them without recompiling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Initial capacity of each per-location label buffer; buffers are
    /// trimmed back to this on `clear`.
    pub max_reserved_labels_count: usize,
    /// Hard cap on labels per location; exceeding it is fatal.
    pub max_label_count: usize,
    /// Iterations after a pair's first meeting during which a cheaper
    /// meeting may still supersede it.
    pub pair_meeting_threshold: u32,
    /// Iterations a location keeps expanding after its last new connection
    /// once every counterpart has been met.
    pub location_settle_threshold: u32,
    /// Divisors applied to `max_matrix_distance` to derive the cost
    /// ceiling, per mode.
    pub auto_cost_threshold_divisor: f32,
    pub bicycle_cost_threshold_divisor: f32,
    pub pedestrian_cost_threshold_divisor: f32,
}

impl Default for MatrixConfig {
    fn default() -> MatrixConfig {
        MatrixConfig {
            max_reserved_labels_count: 4_096,
            max_label_count: 1 << 22,
            pair_meeting_threshold: 16,
            location_settle_threshold: 16,
            // A 400 km auto ceiling yields a cost ceiling of ~7200 (two
            // hours at modal speed); pedestrians cover half the distance in
            // the same time.
            auto_cost_threshold_divisor: 56.0,
            bicycle_cost_threshold_divisor: 56.0,
            pedestrian_cost_threshold_divisor: 28.0,
        }
    }
}

impl MatrixConfig {
    /// Cost ceiling for a query: any label popped beyond it ends that
    /// location's search.
    pub fn cost_threshold(&self, mode: TravelMode, max_matrix_distance: f32) -> f32 {
        let divisor = match mode {
            TravelMode::Auto => self.auto_cost_threshold_divisor,
            TravelMode::Bicycle => self.bicycle_cost_threshold_divisor,
            TravelMode::Pedestrian => self.pedestrian_cost_threshold_divisor,
        };
        max_matrix_distance / divisor
    }
}

/// Work counters for one query.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatrixStats {
    /// Outer round-robin iterations.
    pub iterations: u32,
    pub forward_settled: usize,
    pub backward_settled: usize,
    pub forward_labels: usize,
    pub backward_labels: usize,
    /// Pairs that found at least one meeting.
    pub connections: usize,
    /// Pairs re-walked by the time-aware recoster.
    pub recosted: usize,
}

impl MatrixStats {
    /// Total settled edges across all searches.
    pub fn settled(&self) -> usize {
        self.forward_settled + self.backward_settled
    }
}

/// One source–target result.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MatrixCell {
    pub found: bool,
    /// Elapsed travel time in seconds.
    pub seconds: f32,
    /// Optimization objective.
    pub cost: f32,
    /// Arc length in meters.
    pub distance: f32,
    /// Departure epoch seconds, when the query was time-aware.
    pub begin_time: Option<u64>,
    /// Arrival epoch seconds, when the query was time-aware.
    pub end_time: Option<u64>,
}

impl MatrixCell {
    pub(crate) fn not_found() -> MatrixCell {
        MatrixCell::default()
    }
}

/// The S×T result matrix, row-major over sources.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatrixResponse {
    pub source_count: usize,
    pub target_count: usize,
    pub cells: Vec<MatrixCell>,
    /// The query was interrupted; unsettled cells are not-found.
    pub cancelled: bool,
    pub stats: MatrixStats,
}

impl MatrixResponse {
    pub fn cell(&self, source: usize, target: usize) -> &MatrixCell {
        &self.cells[source * self.target_count + target]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_threshold_per_mode() {
        let config = MatrixConfig::default();
        let auto = config.cost_threshold(TravelMode::Auto, 400_000.0);
        let ped = config.cost_threshold(TravelMode::Pedestrian, 400_000.0);
        assert!((auto - 7142.857).abs() < 1e-2);
        assert_eq!(ped, auto * 2.0);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: MatrixConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pair_meeting_threshold, 16);
        let config: MatrixConfig =
            serde_json::from_str(r#"{"pair_meeting_threshold": 4}"#).unwrap();
        assert_eq!(config.pair_meeting_threshold, 4);
        assert_eq!(config.location_settle_threshold, 16);
    }

    #[test]
    fn test_response_indexing() {
        let resp = MatrixResponse {
            source_count: 2,
            target_count: 3,
            cells: (0..6)
                .map(|i| MatrixCell {
                    found: true,
                    cost: i as f32,
                    ..MatrixCell::default()
                })
                .collect(),
            cancelled: false,
            stats: MatrixStats::default(),
        };
        assert_eq!(resp.cell(1, 2).cost, 5.0);
        assert_eq!(resp.cell(0, 1).cost, 1.0);
    }
}
