use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{MatchEnvError, Result};

/// The local environment of one particle: up to `num_neigh` neighbor vectors.
///
/// `vectors` keeps the order the neighbors were discovered in and is never
/// permuted. `vec_ind` maps each slot of the environment's frame to a raw vector
/// index; it starts as the identity and is rewritten when the environment's class
/// is merged into another one, so that slot `j` means the same neighbor direction
/// for every member of a class. A slot without a counterpart in this environment
/// holds `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Class this environment currently belongs to.
    pub env_index: usize,
    /// Reference/bookkeeping environment, excluded from physical results.
    pub ghost: bool,
    num_neigh: usize,
    vectors: Vec<Vector3<f64>>,
    vec_ind: Vec<Option<usize>>,
}

impl Environment {
    /// Create an empty environment holding at most `num_neigh` vectors.
    pub fn new(num_neigh: usize) -> Self {
        Environment {
            env_index: 0,
            ghost: false,
            num_neigh,
            vectors: Vec::with_capacity(num_neigh),
            vec_ind: Vec::with_capacity(num_neigh),
        }
    }

    /// Create an environment from raw vectors, in order.
    pub fn from_vectors(num_neigh: usize, vectors: &[Vector3<f64>]) -> Result<Self> {
        let mut env = Environment::new(num_neigh);
        for v in vectors {
            env.add_vec(*v)?;
        }
        Ok(env)
    }

    /// Set the class index (builder pattern).
    pub fn with_env_index(mut self, env_index: usize) -> Self {
        self.env_index = env_index;
        self
    }

    /// Mark the environment as a ghost (builder pattern).
    pub fn with_ghost(mut self, ghost: bool) -> Self {
        self.ghost = ghost;
        self
    }

    /// Append a vector; fails once `num_neigh` vectors are held.
    pub fn add_vec(&mut self, v: Vector3<f64>) -> Result<()> {
        if self.vectors.len() >= self.num_neigh {
            return Err(MatchEnvError::OutOfCapacity {
                capacity: self.num_neigh,
            });
        }
        self.vec_ind.push(Some(self.vectors.len()));
        self.vectors.push(v);
        Ok(())
    }

    /// Number of vectors currently held.
    pub fn num_vecs(&self) -> usize {
        self.vectors.len()
    }

    /// Maximum number of vectors.
    pub fn num_neigh(&self) -> usize {
        self.num_neigh
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Raw vectors in discovery order.
    pub fn vectors(&self) -> &[Vector3<f64>] {
        &self.vectors
    }

    /// Frame slot → raw vector index.
    pub fn vec_ind(&self) -> &[Option<usize>] {
        &self.vec_ind
    }

    pub(crate) fn set_vec_ind(&mut self, vec_ind: Vec<Option<usize>>) {
        self.vec_ind = vec_ind;
    }

    /// Frame slot holding the raw vector `raw`, if any.
    pub fn frame_slot_of(&self, raw: usize) -> Option<usize> {
        self.vec_ind.iter().position(|&slot| slot == Some(raw))
    }

    /// Filled frame slots with their vectors.
    pub fn frame_entries(&self) -> impl Iterator<Item = (usize, Vector3<f64>)> + '_ {
        self.vec_ind
            .iter()
            .enumerate()
            .filter_map(move |(slot, raw)| raw.map(|raw| (slot, self.vectors[raw])))
    }

    /// Vectors in frame order; empty slots are zero vectors.
    pub fn frame_vectors(&self) -> Vec<Vector3<f64>> {
        self.vec_ind
            .iter()
            .map(|raw| raw.map_or_else(Vector3::zeros, |raw| self.vectors[raw]))
            .collect()
    }
}
