use crate::config::DEFAULT_NUM_NEIGHBORS;
use crate::error::{MatchEnvError, Result};
use crate::geometries::SimBox;
use crate::interfaces::{MatchingPolicy, PairStrategy};
use crate::locality::{KNearestNeighbors, NeighborSource};
use crate::match_env::matcher::MatchEnv;

/// Builder for constructing MatchEnv instances
#[derive(Debug, Clone)]
pub struct MatchEnvBuilder {
    sim_box: Option<SimBox>,
    rmax: Option<f64>,
    num_neighbors: usize,
    policy: MatchingPolicy,
    pair_strategy: PairStrategy,
}

impl MatchEnvBuilder {
    /// Create a new MatchEnvBuilder
    pub fn new() -> Self {
        MatchEnvBuilder {
            sim_box: None,
            rmax: None,
            num_neighbors: DEFAULT_NUM_NEIGHBORS,
            policy: MatchingPolicy::default(),
            pair_strategy: PairStrategy::default(),
        }
    }

    /// Set the simulation box
    pub fn with_box(mut self, sim_box: SimBox) -> Self {
        self.sim_box = Some(sim_box);
        self
    }

    /// Set the neighbor cutoff that scales the matching threshold
    pub fn with_rmax(mut self, rmax: f64) -> Self {
        self.rmax = Some(rmax);
        self
    }

    /// Set the number of neighbors per environment
    pub fn with_num_neighbors(mut self, k: usize) -> Self {
        self.num_neighbors = k;
        self
    }

    /// Set how vector assignments are solved
    pub fn with_matching_policy(mut self, policy: MatchingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set which particle pairs are tested during clustering
    pub fn with_pair_strategy(mut self, strategy: PairStrategy) -> Self {
        self.pair_strategy = strategy;
        self
    }

    /// Build a matcher using the brute-force neighbor source
    pub fn build(self) -> Result<MatchEnv<KNearestNeighbors>> {
        self.build_with::<KNearestNeighbors>()
    }

    /// Build a matcher using the neighbor source `N`
    pub fn build_with<N: NeighborSource>(self) -> Result<MatchEnv<N>> {
        let sim_box = self
            .sim_box
            .ok_or_else(|| MatchEnvError::invalid("simulation box not set"))?;
        let rmax = self
            .rmax
            .ok_or_else(|| MatchEnvError::invalid("rmax not set"))?;
        MatchEnv::from_parts(sim_box, rmax, self.num_neighbors, self.policy, self.pair_strategy)
    }
}

impl Default for MatchEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
