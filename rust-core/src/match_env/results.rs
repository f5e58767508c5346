use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::MOTIF_LABEL;
use crate::error::{MatchEnvError, Result};
use crate::interfaces::RunKind;

/// Published outcome of one `cluster` or `match_motif` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEnvResults {
    /// Which analysis produced these results.
    pub run: RunKind,
    pub num_particles: usize,
    pub num_neighbors: usize,
    /// Distinct labels among the physical particles.
    pub num_clusters: usize,
    /// Label of every particle.
    pub env_index: Vec<usize>,
    /// Class-averaged environment per label, `num_neighbors` vectors each.
    pub env_by_cluster: BTreeMap<usize, Vec<Vector3<f64>>>,
    /// Environment of every particle in its class frame, `num_neighbors` vectors each.
    pub tot_env: Vec<Vec<Vector3<f64>>>,
}

impl MatchEnvResults {
    /// Averaged environment of the cluster `label`.
    pub fn environment(&self, label: usize) -> Result<&[Vector3<f64>]> {
        self.env_by_cluster
            .get(&label)
            .map(Vec::as_slice)
            .ok_or_else(|| MatchEnvError::invalid(format!("no cluster with label {}", label)))
    }

    /// Frame-aligned environment of particle `i`.
    pub fn particle_environment(&self, i: usize) -> Result<&[Vector3<f64>]> {
        self.tot_env.get(i).map(Vec::as_slice).ok_or_else(|| {
            MatchEnvError::invalid(format!(
                "particle {} out of range for {} particles",
                i, self.num_particles
            ))
        })
    }

    /// Per-particle motif outcome; `None` unless the run was `match_motif`.
    pub fn motif_matches(&self) -> Option<Vec<bool>> {
        match self.run {
            RunKind::Motif => Some(self.env_index.iter().map(|&l| l == MOTIF_LABEL).collect()),
            RunKind::Cluster => None,
        }
    }

    /// Number of particles carrying each label.
    pub fn cluster_sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for &label in &self.env_index {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes
    }
}
