use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::{debug, info, warn};
use nalgebra::Vector3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{DEFAULT_NUM_NEIGHBORS, MAX_SENSIBLE_THRESHOLD, MOTIF_LABEL};
use crate::environment::correspondence::Correspondence;
use crate::environment::disjoint_set::EnvDisjointSet;
use crate::environment::local_environment::Environment;
use crate::environment::similarity;
use crate::error::{MatchEnvError, Result};
use crate::geometries::SimBox;
use crate::interfaces::{MatchingPolicy, PairStrategy, RunKind};
use crate::locality::neighbor_source::{validate_points, Neighbor, NeighborList};
use crate::locality::{KNearestNeighbors, NeighborSource};
use crate::match_env::builder::MatchEnvBuilder;
use crate::match_env::results::MatchEnvResults;

const NO_RUN: &str = "no cluster or match_motif run has completed";

/// Clusters particles by local environment and matches them against motifs.
///
/// A `MatchEnv` is bound to a box, a neighbor cutoff `rmax` and a neighbor count
/// `k` through its neighbor source `N`. Each run replaces the previously published
/// results; a failed run leaves none.
#[derive(Debug, Clone)]
pub struct MatchEnv<N: NeighborSource = KNearestNeighbors> {
    sim_box: SimBox,
    rmax: f64,
    rmax_sq: f64,
    k: usize,
    policy: MatchingPolicy,
    pair_strategy: PairStrategy,
    neighbors: N,
    results: Option<MatchEnvResults>,
}

impl MatchEnv<KNearestNeighbors> {
    /// Create a matcher with the brute-force neighbor source and default policies.
    pub fn new(sim_box: SimBox, rmax: f64, k: usize) -> Result<Self> {
        Self::from_parts(sim_box, rmax, k, MatchingPolicy::default(), PairStrategy::default())
    }

    /// Create a matcher with the default neighbor count.
    pub fn with_default_neighbors(sim_box: SimBox, rmax: f64) -> Result<Self> {
        Self::new(sim_box, rmax, DEFAULT_NUM_NEIGHBORS)
    }

    pub fn builder() -> MatchEnvBuilder {
        MatchEnvBuilder::new()
    }
}

impl<N: NeighborSource> MatchEnv<N> {
    pub(crate) fn from_parts(
        sim_box: SimBox,
        rmax: f64,
        k: usize,
        policy: MatchingPolicy,
        pair_strategy: PairStrategy,
    ) -> Result<Self> {
        let neighbors = N::configure(&sim_box, rmax, k)?;
        Ok(MatchEnv {
            sim_box,
            rmax,
            rmax_sq: rmax * rmax,
            k,
            policy,
            pair_strategy,
            neighbors,
            results: None,
        })
    }

    // ==================== Configuration ====================

    pub fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    pub fn rmax(&self) -> f64 {
        self.rmax
    }

    pub fn matching_policy(&self) -> MatchingPolicy {
        self.policy
    }

    pub fn pair_strategy(&self) -> PairStrategy {
        self.pair_strategy
    }

    pub fn neighbor_source(&self) -> &N {
        &self.neighbors
    }

    /// Number of neighbors per environment. Available without a run.
    pub fn num_neighbors(&self) -> usize {
        self.k
    }

    /// Rebind to a new box. The neighbor source is reconfigured and the results
    /// of the previous run are discarded.
    pub fn set_box(&mut self, sim_box: SimBox) -> Result<()> {
        self.neighbors = N::configure(&sim_box, self.rmax, self.k)?;
        self.sim_box = sim_box;
        self.results = None;
        Ok(())
    }

    /// Same as [`set_box`](Self::set_box), consuming and returning the matcher.
    pub fn with_box(mut self, sim_box: SimBox) -> Result<Self> {
        self.set_box(sim_box)?;
        Ok(self)
    }

    // ==================== Environments and similarity ====================

    /// Environment of point `i`: the wrapped displacement to each of its
    /// neighbors, nearest first, labelled `env_ind`.
    ///
    /// With `hard_r` only neighbors closer than `rmax` are kept.
    pub fn build_env(
        &self,
        points: &[Vector3<f64>],
        i: usize,
        env_ind: usize,
        hard_r: bool,
    ) -> Result<Environment> {
        let neighbors = self.neighbors.neighbors_of(points, i)?;
        self.env_from_neighbors(&neighbors, env_ind, hard_r)
    }

    fn env_from_neighbors(
        &self,
        neighbors: &[Neighbor],
        env_ind: usize,
        hard_r: bool,
    ) -> Result<Environment> {
        let mut env = Environment::new(self.k).with_env_index(env_ind);
        for neighbor in neighbors {
            if hard_r && neighbor.dist_sq >= self.rmax_sq {
                continue;
            }
            env.add_vec(neighbor.delta)?;
        }
        Ok(env)
    }

    /// Similarity test with this matcher's policy; `threshold_sq` is a squared
    /// distance, not scaled by `rmax`.
    pub fn is_similar(
        &self,
        e1: &Environment,
        e2: &Environment,
        threshold_sq: f64,
    ) -> Option<Correspondence> {
        similarity::is_similar(e1, e2, threshold_sq, self.policy)
    }

    /// Similarity test on two raw vector sets of equal length.
    pub fn is_similar_points(
        &self,
        ref_points1: &[Vector3<f64>],
        ref_points2: &[Vector3<f64>],
        threshold_sq: f64,
    ) -> Result<Option<Correspondence>> {
        similarity::is_similar_points(ref_points1, ref_points2, threshold_sq, self.policy)
    }

    // ==================== Runs ====================

    /// Group particles whose environments match within `threshold` (in units of
    /// `rmax`, squared distance `threshold * rmax²`).
    ///
    /// Labels are dense, numbered by first appearance in particle order.
    pub fn cluster(&mut self, points: &[Vector3<f64>], threshold: f64, hard_r: bool) -> Result<()> {
        self.results = None;
        let threshold_sq = self.scaled_threshold(threshold)?;

        let (list, environments) = self.build_environments(points, hard_r)?;
        debug!("cluster: built {} environments", environments.len());
        let mut dj = EnvDisjointSet::from_environments(self.k, environments)?;

        let pairs = self.candidate_pairs(&list);
        debug!("cluster: testing {} candidate pairs ({:?})", pairs.len(), self.pair_strategy);
        let merged = self.merge_matches(&mut dj, &pairs, threshold_sq)?;
        debug!("cluster: {} merges", merged);

        let results = self.populate_env(&dj, true)?;
        info!(
            "cluster: {} particles in {} clusters",
            results.num_particles, results.num_clusters
        );
        self.results = Some(results);
        Ok(())
    }

    /// Test every particle's environment against the motif `ref_points`.
    ///
    /// Matching particles get label `0`; all others keep their own element id
    /// (particle index + 1).
    pub fn match_motif(
        &mut self,
        points: &[Vector3<f64>],
        ref_points: &[Vector3<f64>],
        threshold: f64,
        hard_r: bool,
    ) -> Result<()> {
        self.results = None;
        let threshold_sq = self.scaled_threshold(threshold)?;
        validate_points(ref_points)?;

        let motif = Environment::from_vectors(self.k, ref_points)?.with_ghost(true);
        let (_, environments) = self.build_environments(points, hard_r)?;
        debug!(
            "match_motif: built {} environments against a {}-vector motif",
            environments.len(),
            ref_points.len()
        );

        let mut dj = EnvDisjointSet::new(self.k);
        let motif_id = dj.push(motif)?;
        debug_assert_eq!(motif_id, MOTIF_LABEL);
        for env in environments {
            dj.push(env)?;
        }

        let pairs: Vec<(usize, usize)> = (1..dj.len()).map(|i| (motif_id, i)).collect();
        let merged = self.merge_matches(&mut dj, &pairs, threshold_sq)?;

        let results = self.populate_env(&dj, false)?;
        info!(
            "match_motif: {} of {} particles match the motif",
            merged, results.num_particles
        );
        self.results = Some(results);
        Ok(())
    }

    /// Turn the classes of `dj` into published results.
    ///
    /// Ghost elements are skipped. With `relabel` the roots are renumbered densely
    /// in order of first appearance; without it each particle is labelled with its
    /// root's element id. `dj` must hold environments of this matcher's `k`.
    pub fn populate_env(&self, dj: &EnvDisjointSet, relabel: bool) -> Result<MatchEnvResults> {
        if dj.num_neigh() != self.k {
            return Err(MatchEnvError::invalid(format!(
                "disjoint set holds {}-neighbor environments, matcher uses {}",
                dj.num_neigh(),
                self.k
            )));
        }
        let mut dense: BTreeMap<usize, usize> = BTreeMap::new();
        let mut env_index = Vec::new();
        let mut tot_env = Vec::new();
        let mut env_by_cluster = BTreeMap::new();

        for (id, element) in dj.elements().iter().enumerate() {
            if element.ghost {
                continue;
            }
            let root = dj.find(id)?;
            let label = if relabel {
                let next = dense.len();
                *dense.entry(root).or_insert(next)
            } else {
                root
            };
            if let Entry::Vacant(slot) = env_by_cluster.entry(label) {
                slot.insert(dj.get_avg_env(root)?);
            }

            // Frames shorter than k are padded
            let mut individual = dj.get_individual_env(id)?;
            individual.resize(self.k, Vector3::zeros());
            env_index.push(label);
            tot_env.push(individual);
        }

        Ok(MatchEnvResults {
            run: if relabel { RunKind::Cluster } else { RunKind::Motif },
            num_particles: env_index.len(),
            num_neighbors: self.k,
            num_clusters: env_by_cluster.len(),
            env_index,
            env_by_cluster,
            tot_env,
        })
    }

    fn scaled_threshold(&self, threshold: f64) -> Result<f64> {
        if !threshold.is_finite() {
            return Err(MatchEnvError::invalid(format!(
                "threshold must be finite, got {}",
                threshold
            )));
        }
        if threshold <= 0.0 || threshold >= MAX_SENSIBLE_THRESHOLD {
            warn!(
                "threshold {} is outside (0, {}); results may be trivial",
                threshold, MAX_SENSIBLE_THRESHOLD
            );
        }
        Ok(threshold * self.rmax_sq)
    }

    fn build_environments(
        &self,
        points: &[Vector3<f64>],
        hard_r: bool,
    ) -> Result<(NeighborList, Vec<Environment>)> {
        let list = self.neighbors.compute(points)?;
        let build = |i: usize| -> Result<Environment> {
            self.env_from_neighbors(list.neighbors_of(i)?, i, hard_r)
        };

        #[cfg(feature = "parallel")]
        let environments = (0..points.len())
            .into_par_iter()
            .map(build)
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let environments = (0..points.len()).map(build).collect::<Result<Vec<_>>>()?;

        Ok((list, environments))
    }

    /// Element pairs `(i, j)`, `i < j`, to test during clustering.
    fn candidate_pairs(&self, list: &NeighborList) -> Vec<(usize, usize)> {
        let n = list.num_points();
        match self.pair_strategy {
            PairStrategy::Neighbors => {
                let mut pairs: Vec<(usize, usize)> = list
                    .iter()
                    .flat_map(|(i, neighbors)| {
                        neighbors
                            .iter()
                            .filter(move |nb| nb.index != i)
                            .map(move |nb| (i.min(nb.index), i.max(nb.index)))
                    })
                    .collect();
                pairs.sort_unstable();
                pairs.dedup();
                pairs
            }
            PairStrategy::AllPairs => (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .collect(),
        }
    }

    /// Test every pair against the raw vectors, then merge the matches in pair
    /// order. Returns the number of merges that joined two classes.
    fn merge_matches(
        &self,
        dj: &mut EnvDisjointSet,
        pairs: &[(usize, usize)],
        threshold_sq: f64,
    ) -> Result<usize> {
        let matches: Vec<(usize, usize, Correspondence)> = {
            let elements = dj.elements();
            let test = |&(i, j): &(usize, usize)| {
                self.is_similar(&elements[i], &elements[j], threshold_sq)
                    .map(|correspondence| (i, j, correspondence))
            };

            #[cfg(feature = "parallel")]
            let found = pairs.par_iter().filter_map(test).collect();
            #[cfg(not(feature = "parallel"))]
            let found = pairs.iter().filter_map(test).collect();
            found
        };

        let mut merged = 0;
        for (i, j, correspondence) in &matches {
            if dj.merge(*i, *j, correspondence)? {
                merged += 1;
            }
        }
        Ok(merged)
    }

    // ==================== Results ====================

    /// Results of the last completed run.
    pub fn results(&self) -> Result<&MatchEnvResults> {
        self.results.as_ref().ok_or(MatchEnvError::EmptyResult(NO_RUN))
    }

    /// Label of every particle.
    pub fn clusters(&self) -> Result<&[usize]> {
        Ok(&self.results()?.env_index)
    }

    /// Averaged environment of the cluster `label`.
    pub fn environment(&self, label: usize) -> Result<&[Vector3<f64>]> {
        self.results()?.environment(label)
    }

    /// Every particle's environment in its cluster frame.
    pub fn tot_environment(&self) -> Result<&[Vec<Vector3<f64>>]> {
        Ok(&self.results()?.tot_env)
    }

    pub fn num_clusters(&self) -> Result<usize> {
        Ok(self.results()?.num_clusters)
    }

    pub fn num_particles(&self) -> Result<usize> {
        Ok(self.results()?.num_particles)
    }
}
