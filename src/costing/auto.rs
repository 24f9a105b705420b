//! Automobile costing profile.

use serde::{Deserialize, Serialize};

use super::{
    default_limits, mode_access, travel_seconds, Cost, DynamicCost, HierarchyLimits,
    TransitionContext, TravelMode,
};
use crate::graph::DirectedEdge;

/// Drives at the edge speed; cost equals elapsed seconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCost {
    /// Cap on usable edge speed in km/h.
    pub top_speed: f32,
    /// Penalty in seconds for turning around at a dead end.
    pub uturn_penalty: f32,
}

impl Default for AutoCost {
    fn default() -> AutoCost {
        AutoCost {
            top_speed: 140.0,
            uturn_penalty: 30.0,
        }
    }
}

impl DynamicCost for AutoCost {
    fn travel_mode(&self) -> TravelMode {
        TravelMode::Auto
    }

    fn access_mode(&self) -> u8 {
        mode_access(TravelMode::Auto)
    }

    fn hierarchy_limits(&self) -> Vec<HierarchyLimits> {
        default_limits((400, 100_000.0), (100, 5_000.0))
    }

    fn edge_cost(&self, edge: &DirectedEdge, _timestamp: Option<u64>) -> Cost {
        let secs = travel_seconds(edge.length, edge.speed.min(self.top_speed));
        Cost::new(secs, secs)
    }

    fn transition_cost(&self, ctx: &TransitionContext) -> Cost {
        if ctx.uturn {
            Cost::new(self.uturn_penalty, self.uturn_penalty)
        } else {
            Cost::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{access, GraphId, RoadClass};

    fn edge(length: f32, speed: f32) -> DirectedEdge {
        DirectedEdge {
            endnode: GraphId::new(2, 0, 0),
            opp_index: 0,
            length,
            speed,
            classification: RoadClass::Residential,
            forward_access: access::ALL,
            reverse_access: access::ALL,
            not_thru: false,
        }
    }

    #[test]
    fn test_edge_cost_is_travel_time() {
        let c = AutoCost::default();
        // 1000 m at 36 km/h (10 m/s) takes 100 s.
        let cost = c.edge_cost(&edge(1000.0, 36.0), None);
        assert!((cost.secs - 100.0).abs() < 1e-3);
        assert_eq!(cost.cost, cost.secs);
    }

    #[test]
    fn test_top_speed_cap() {
        let c = AutoCost::default();
        let capped = c.edge_cost(&edge(1000.0, 300.0), None);
        let at_cap = c.edge_cost(&edge(1000.0, c.top_speed), None);
        assert_eq!(capped.secs, at_cap.secs);
    }

    #[test]
    fn test_uturn_penalty() {
        let c = AutoCost::default();
        let ctx = TransitionContext {
            uturn: true,
            deadend: true,
        };
        assert_eq!(c.transition_cost(&ctx).secs, c.uturn_penalty);
        assert_eq!(c.transition_cost(&TransitionContext::default()), Cost::default());
    }

    #[test]
    fn test_access_filtering() {
        let c = AutoCost::default();
        let mut e = edge(10.0, 50.0);
        assert!(c.allowed(&e));
        e.forward_access = access::PEDESTRIAN;
        assert!(!c.allowed(&e));
        assert!(c.allowed_reverse(&e));
    }
}
