//! Skimmer: many-to-many cost matrix engine for tiled road graphs
//!
//! Computes the S×T matrix of best cost, time and distance between source
//! and target locations on a directed, weighted, hierarchical road graph.
//! Instead of S·T independent shortest-path queries, one coordinated
//! bidirectional search (after Knopp, "Efficient Computation of
//! Many-to-Many Shortest Paths") runs a forward expansion per source and a
//! backward expansion per target, meeting in the middle at every reached
//! edge.
//!
//! Module map:
//! - `graph`: tiled graph model and the `GraphReader` access trait
//! - `costing`: per-mode edge/transition costing behind `DynamicCost`
//! - `matrix`: the engine — double-bucket queues, per-location search
//!   state, connection detection, termination, time-aware recosting
//! - `request`: serde query model
//! - `validate`: exhaustive reference oracle for correctness testing
//!
//! Graph-tile construction, location snapping and service plumbing live
//! outside this crate; the engine consumes a `GraphReader` and a costing
//! table and fills a result matrix.

pub mod costing;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod request;
pub mod time;
pub mod validate;

pub use costing::{Cost, DynamicCost, ModeCosting, TravelMode};
pub use error::{Error, Result};
pub use matrix::{CostMatrix, MatrixCell, MatrixConfig, MatrixResponse, MatrixStats};
pub use request::{CandidateEdge, MatrixLocation, MatrixRequest};
