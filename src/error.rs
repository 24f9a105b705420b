//! Error types for the matrix engine.
//!
//! Only contract violations surface as `Error` values. Recoverable
//! conditions (no path within thresholds, a location without usable
//! candidate edges, cooperative cancellation) are reflected in the result
//! matrix instead and never cross the public API as errors.

use std::fmt;

use crate::graph::{GraphId, TileId};

/// Fatal failure of a matrix query.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A tile referenced by the graph could not be fetched.
    GraphUnavailable(TileId),

    /// An edge or node identifier pointed outside its tile.
    InvalidGraphId(GraphId),

    /// The costing produced a NaN or negative cost for an edge.
    CostingError(GraphId),

    /// A per-location label buffer exceeded the configured hard cap.
    ResourceExhaustion { labels: usize, cap: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::GraphUnavailable(tile) => {
                write!(f, "graph tile {tile} could not be fetched")
            }
            Error::InvalidGraphId(id) => {
                write!(f, "graph id {id} does not exist in its tile")
            }
            Error::CostingError(id) => {
                write!(f, "costing produced an invalid cost for edge {id}")
            }
            Error::ResourceExhaustion { labels, cap } => {
                write!(f, "edge label count {labels} exceeded the hard cap {cap}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Convenience result type for matrix operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphId;

    #[test]
    fn test_display_messages() {
        let err = Error::ResourceExhaustion { labels: 10, cap: 5 };
        assert!(err.to_string().contains("hard cap"));

        let err = Error::CostingError(GraphId::new(2, 0, 7));
        assert!(err.to_string().contains("edge"));
    }
}
