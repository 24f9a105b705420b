//! Pedestrian costing profile.

use serde::{Deserialize, Serialize};

use super::{
    default_limits, mode_access, travel_seconds, Cost, DynamicCost, HierarchyLimits, TravelMode,
};
use crate::graph::DirectedEdge;

/// Walks at a constant speed regardless of the road speed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PedestrianCost {
    /// Walking speed in km/h.
    pub walking_speed: f32,
}

impl Default for PedestrianCost {
    fn default() -> PedestrianCost {
        PedestrianCost { walking_speed: 5.1 }
    }
}

impl DynamicCost for PedestrianCost {
    fn travel_mode(&self) -> TravelMode {
        TravelMode::Pedestrian
    }

    fn access_mode(&self) -> u8 {
        mode_access(TravelMode::Pedestrian)
    }

    fn hierarchy_limits(&self) -> Vec<HierarchyLimits> {
        default_limits((100, 10_000.0), (50, 2_000.0))
    }

    fn edge_cost(&self, edge: &DirectedEdge, _timestamp: Option<u64>) -> Cost {
        let secs = travel_seconds(edge.length, self.walking_speed);
        Cost::new(secs, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{access, GraphId, RoadClass};

    #[test]
    fn test_road_speed_is_ignored() {
        let c = PedestrianCost::default();
        let mut edge = DirectedEdge {
            endnode: GraphId::new(2, 0, 0),
            opp_index: 0,
            length: 500.0,
            speed: 120.0,
            classification: RoadClass::Motorway,
            forward_access: access::ALL,
            reverse_access: access::ALL,
            not_thru: false,
        };
        let fast = c.edge_cost(&edge, None);
        edge.speed = 10.0;
        let slow = c.edge_cost(&edge, None);
        assert_eq!(fast, slow);
    }
}
