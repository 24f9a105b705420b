//! Per-mode edge costing.
//!
//! The engine consumes costing through the [`DynamicCost`] trait: access
//! filtering, edge costs (optionally time-dependent), transition costs and
//! hierarchy limits. The bundled profiles cover the three road modes; a
//! caller can slot any implementation into [`ModeCosting`].

pub mod auto;
pub mod bicycle;
pub mod pedestrian;

pub use auto::AutoCost;
pub use bicycle::BicycleCost;
pub use pedestrian::PedestrianCost;

use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

use crate::graph::{access, DirectedEdge, HIERARCHY_LEVELS};

/// Travel mode of a matrix query.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Auto,
    Bicycle,
    Pedestrian,
}

impl TravelMode {
    pub fn name(&self) -> &'static str {
        match self {
            TravelMode::Auto => "auto",
            TravelMode::Bicycle => "bicycle",
            TravelMode::Pedestrian => "pedestrian",
        }
    }
}

/// Cost of a partial path: the optimization objective plus elapsed seconds.
/// Costs compose by addition; partial edges scale multiplicatively.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub cost: f32,
    pub secs: f32,
}

impl Cost {
    pub fn new(cost: f32, secs: f32) -> Cost {
        Cost { cost, secs }
    }

    /// Upper bound used to initialize best-connection candidates.
    pub fn max() -> Cost {
        Cost::new(f32::INFINITY, f32::INFINITY)
    }

    /// A cost is usable when both components are finite and nonnegative.
    /// Anything else is a costing contract violation.
    pub fn is_valid(&self) -> bool {
        self.cost.is_finite() && self.cost >= 0.0 && self.secs.is_finite() && self.secs >= 0.0
    }

    pub fn abs(self) -> Cost {
        Cost::new(self.cost.abs(), self.secs.abs())
    }
}

impl Add for Cost {
    type Output = Cost;
    fn add(self, rhs: Cost) -> Cost {
        Cost::new(self.cost + rhs.cost, self.secs + rhs.secs)
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.cost += rhs.cost;
        self.secs += rhs.secs;
    }
}

impl Mul<f32> for Cost {
    type Output = Cost;
    fn mul(self, rhs: f32) -> Cost {
        Cost::new(self.cost * rhs, self.secs * rhs)
    }
}

/// Per-level expansion caps. Local roads are pruned far from the endpoints
/// by bounding both the number of upward transitions taken and the distance
/// within which a level may still be expanded.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HierarchyLimits {
    pub max_up_transitions: u32,
    pub expansion_within_dist: f32,
    #[serde(skip)]
    pub up_transition_count: u32,
}

impl HierarchyLimits {
    pub fn new(max_up_transitions: u32, expansion_within_dist: f32) -> HierarchyLimits {
        HierarchyLimits {
            max_up_transitions,
            expansion_within_dist,
            up_transition_count: 0,
        }
    }

    pub fn unlimited() -> HierarchyLimits {
        HierarchyLimits::new(u32::MAX, f32::INFINITY)
    }

    /// Whether edges of this level may still be expanded at `distance`
    /// meters from the search origin.
    pub fn expansion_allowed(&self, distance: f32) -> bool {
        distance <= self.expansion_within_dist
    }

    /// Account for one upward transition; returns false once the cap is
    /// exhausted.
    pub fn allow_up_transition(&mut self) -> bool {
        if self.up_transition_count >= self.max_up_transitions {
            return false;
        }
        self.up_transition_count += 1;
        true
    }
}

/// Context handed to transition costing at a junction.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitionContext {
    /// The candidate edge is the opposing twin of the predecessor.
    pub uturn: bool,
    /// The predecessor ends at a dead end, where turning around is the only
    /// way on.
    pub deadend: bool,
}

/// Mode-specific edge cost evaluation.
///
/// `timestamp` is seconds since the Unix epoch at edge entry, or `None`
/// when the query is not time-aware. Implementations must return finite,
/// nonnegative costs; the engine treats anything else as fatal.
pub trait DynamicCost {
    fn travel_mode(&self) -> TravelMode;

    /// Bitmask of [`access`] bits this mode requires on an edge.
    fn access_mode(&self) -> u8;

    /// Bucket granularity of the double-bucket queue, in cost units.
    fn unit_size(&self) -> f32 {
        1.0
    }

    /// Fresh per-level limits for one location's search.
    fn hierarchy_limits(&self) -> Vec<HierarchyLimits>;

    /// May this edge be traversed in its own direction?
    fn allowed(&self, edge: &DirectedEdge) -> bool {
        edge.forward_access & self.access_mode() != 0
    }

    /// May this edge be traversed against its direction?
    fn allowed_reverse(&self, edge: &DirectedEdge) -> bool {
        edge.reverse_access & self.access_mode() != 0
    }

    fn edge_cost(&self, edge: &DirectedEdge, timestamp: Option<u64>) -> Cost;

    /// Cost of traversing against the edge direction. Twin edges share
    /// geometry attributes, so the default forwards to `edge_cost`.
    fn edge_cost_reverse(&self, edge: &DirectedEdge, timestamp: Option<u64>) -> Cost {
        self.edge_cost(edge, timestamp)
    }

    fn transition_cost(&self, _ctx: &TransitionContext) -> Cost {
        Cost::default()
    }

    fn transition_cost_reverse(&self, ctx: &TransitionContext) -> Cost {
        self.transition_cost(ctx)
    }
}

/// The per-mode costing table a query selects from.
pub struct ModeCosting {
    pub auto: Box<dyn DynamicCost>,
    pub bicycle: Box<dyn DynamicCost>,
    pub pedestrian: Box<dyn DynamicCost>,
}

impl ModeCosting {
    pub fn get(&self, mode: TravelMode) -> &dyn DynamicCost {
        match mode {
            TravelMode::Auto => self.auto.as_ref(),
            TravelMode::Bicycle => self.bicycle.as_ref(),
            TravelMode::Pedestrian => self.pedestrian.as_ref(),
        }
    }
}

impl Default for ModeCosting {
    fn default() -> ModeCosting {
        ModeCosting {
            auto: Box::new(AutoCost::default()),
            bicycle: Box::new(BicycleCost::default()),
            pedestrian: Box::new(PedestrianCost::default()),
        }
    }
}

/// Seconds to traverse `length` meters at `speed` km/h.
pub(crate) fn travel_seconds(length: f32, speed: f32) -> f32 {
    length * 3.6 / speed
}

/// Default limits shared by the bundled profiles: no cap on the top level,
/// distance-bounded expansion on arterial and local levels.
pub(crate) fn default_limits(arterial: (u32, f32), local: (u32, f32)) -> Vec<HierarchyLimits> {
    debug_assert_eq!(HIERARCHY_LEVELS, 3);
    vec![
        HierarchyLimits::unlimited(),
        HierarchyLimits::new(arterial.0, arterial.1),
        HierarchyLimits::new(local.0, local.1),
    ]
}

/// Access bits required by each mode.
pub(crate) fn mode_access(mode: TravelMode) -> u8 {
    match mode {
        TravelMode::Auto => access::AUTO,
        TravelMode::Bicycle => access::BICYCLE,
        TravelMode::Pedestrian => access::PEDESTRIAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_arithmetic() {
        let a = Cost::new(2.0, 3.0);
        let b = Cost::new(0.5, 1.0);
        assert_eq!(a + b, Cost::new(2.5, 4.0));
        assert_eq!(a * 0.5, Cost::new(1.0, 1.5));
    }

    #[test]
    fn test_cost_validity() {
        assert!(Cost::new(0.0, 0.0).is_valid());
        assert!(!Cost::new(f32::NAN, 0.0).is_valid());
        assert!(!Cost::new(-1.0, 0.0).is_valid());
        assert!(!Cost::max().is_valid());
    }

    #[test]
    fn test_hierarchy_limit_up_transitions() {
        let mut l = HierarchyLimits::new(2, 1000.0);
        assert!(l.allow_up_transition());
        assert!(l.allow_up_transition());
        assert!(!l.allow_up_transition());
        assert!(l.expansion_allowed(999.0));
        assert!(!l.expansion_allowed(1001.0));
    }

    #[test]
    fn test_travel_seconds() {
        // 100 m at 3.6 km/h (1 m/s) takes 100 s.
        assert!((travel_seconds(100.0, 3.6) - 100.0).abs() < 1e-4);
    }
}
