// Definitions that are used throughout all modules

use serde::{Deserialize, Serialize};

// How the vector assignment inside a similarity test is solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchingPolicy {
    /// Exact minimum-cost assignment; finds a valid pairing whenever one exists.
    #[default]
    Optimal,
    /// Pairs taken in ascending distance order, each vector used once.
    Greedy,
}

// Which particle pairs are tested during clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairStrategy {
    /// Each particle against its spatial neighbors.
    #[default]
    Neighbors,
    /// Every unordered pair of particles.
    AllPairs,
}

// Enumeration to track which analysis produced a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    Cluster,
    Motif,
}
