//! Bicycle costing profile.

use serde::{Deserialize, Serialize};

use super::{
    default_limits, mode_access, travel_seconds, Cost, DynamicCost, HierarchyLimits,
    TransitionContext, TravelMode,
};
use crate::graph::DirectedEdge;

/// Rides at the cycling speed, slower where the road is slower.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BicycleCost {
    /// Cruising speed in km/h.
    pub cycling_speed: f32,
    /// Penalty in seconds for turning around at a dead end.
    pub uturn_penalty: f32,
}

impl Default for BicycleCost {
    fn default() -> BicycleCost {
        BicycleCost {
            cycling_speed: 18.0,
            uturn_penalty: 5.0,
        }
    }
}

impl DynamicCost for BicycleCost {
    fn travel_mode(&self) -> TravelMode {
        TravelMode::Bicycle
    }

    fn access_mode(&self) -> u8 {
        mode_access(TravelMode::Bicycle)
    }

    fn hierarchy_limits(&self) -> Vec<HierarchyLimits> {
        default_limits((200, 20_000.0), (100, 2_000.0))
    }

    fn edge_cost(&self, edge: &DirectedEdge, _timestamp: Option<u64>) -> Cost {
        let secs = travel_seconds(edge.length, edge.speed.min(self.cycling_speed));
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

    #[test]
    fn test_speed_capped_by_cycling_speed() {
        let c = BicycleCost::default();
        let edge = DirectedEdge {
            endnode: GraphId::new(2, 0, 0),
            opp_index: 0,
            length: 1000.0,
            speed: 100.0,
            classification: RoadClass::Primary,
            forward_access: access::ALL,
            reverse_access: access::ALL,
            not_thru: false,
        };
        let expected = travel_seconds(1000.0, c.cycling_speed);
        assert!((c.edge_cost(&edge, None).secs - expected).abs() < 1e-3);
    }
}
