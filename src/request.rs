//! Matrix query inputs.
//!
//! Candidate-edge resolution (snapping coordinates to the graph) happens
//! upstream; a request arrives with each location already expressed as one
//! or more partial edges.

use serde::{Deserialize, Serialize};

use crate::costing::TravelMode;
use crate::graph::GraphId;

/// A location projected onto one directed edge.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CandidateEdge {
    pub edge_id: GraphId,
    /// Position along the edge in [0, 1].
    #[serde(default)]
    pub percent_along: f32,
}

/// One source or target of the matrix.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatrixLocation {
    pub candidates: Vec<CandidateEdge>,
    /// Departure (sources) or arrival (targets) time, seconds since the
    /// Unix epoch. Only consulted when the request is time-aware.
    #[serde(default)]
    pub date_time: Option<u64>,
}

impl MatrixLocation {
    /// Location on a single edge.
    pub fn on_edge(edge_id: GraphId, percent_along: f32) -> MatrixLocation {
        MatrixLocation {
            candidates: vec![CandidateEdge {
                edge_id,
                percent_along,
            }],
            date_time: None,
        }
    }

    pub fn with_candidates(candidates: Vec<CandidateEdge>) -> MatrixLocation {
        MatrixLocation {
            candidates,
            date_time: None,
        }
    }

    pub fn departing_at(mut self, epoch_seconds: u64) -> MatrixLocation {
        self.date_time = Some(epoch_seconds);
        self
    }
}

/// A many-to-many matrix query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatrixRequest {
    pub sources: Vec<MatrixLocation>,
    pub targets: Vec<MatrixLocation>,
    pub mode: TravelMode,
    /// Maximum arc-length distance in meters for the current mode; also
    /// seeds the cost ceiling that bounds expansion.
    pub max_matrix_distance: f32,
    /// Evaluate costs against the locations' clocks and recost found paths
    /// with real timestamps.
    #[serde(default)]
    pub has_time: bool,
    /// Hold time constant during a time-aware query: the departure snapshot
    /// is used throughout and recosting is skipped.
    #[serde(default)]
    pub invariant: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_roundtrip() {
        let req = MatrixRequest {
            sources: vec![MatrixLocation::on_edge(GraphId::new(2, 0, 1), 0.25).departing_at(1600)],
            targets: vec![MatrixLocation::on_edge(GraphId::new(2, 0, 4), 1.0)],
            mode: TravelMode::Bicycle,
            max_matrix_distance: 50_000.0,
            has_time: true,
            invariant: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: MatrixRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sources.len(), 1);
        assert_eq!(back.sources[0].date_time, Some(1600));
        assert_eq!(back.mode, TravelMode::Bicycle);
        assert!(json.contains("\"bicycle\""));
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{
            "sources": [{"candidates": [{"edge_id": 33554434}]}],
            "targets": [{"candidates": [{"edge_id": 67108866}]}],
            "mode": "auto",
            "max_matrix_distance": 1000.0
        }"#;
        let req: MatrixRequest = serde_json::from_str(json).unwrap();
        assert!(!req.has_time);
        assert!(!req.invariant);
        assert_eq!(req.sources[0].candidates[0].percent_along, 0.0);
    }
}
