
//! Local environment matching library
//! 
//! This library clusters particles of a 3D point set by the similarity of their local
//! neighbor geometry, and tests particle neighborhoods against a reference motif.
//! It works on static snapshots (e.g. simulation frames) with periodic boundaries.

pub mod config;
pub mod error;
pub mod interfaces;
pub mod geometries;
pub mod locality;
pub mod environment;
pub mod match_env;

pub use error::{MatchEnvError, Result};
pub use geometries::SimBox;
pub use environment::{Correspondence, EnvDisjointSet, Environment};
pub use interfaces::{MatchingPolicy, PairStrategy, RunKind};
pub use locality::{CellListNeighbors, KNearestNeighbors, NeighborSource};
pub use match_env::{MatchEnv, MatchEnvBuilder, MatchEnvResults};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
