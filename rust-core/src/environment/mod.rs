// Environment module: Contains local environments and the machinery to group them
// This module provides the environment type, vector correspondences, the similarity
// test and the union-find used to cluster matching environments

// ======================== MODULE DECLARATIONS ========================
pub mod local_environment;
pub mod correspondence;
pub mod similarity;
pub mod disjoint_set;

mod _tests_disjoint_set;

// ======================== LOCAL ENVIRONMENTS ========================
pub use local_environment::Environment; // struct - up to num_neigh neighbor vectors of one particle
// Environment impl methods:
//   new(num_neigh: usize) -> Self                                    - creates empty environment
//   from_vectors(num_neigh, vectors: &[Vector3<f64>]) -> Result<Self> - environment from raw vectors
//   add_vec(&mut self, v: Vector3<f64>) -> Result<()>                 - appends a vector, OutOfCapacity when full
//   with_env_index / with_ghost                                       - builder-style bookkeeping setters
//   vectors(&self) -> &[Vector3<f64>]                                 - raw vectors in discovery order
//   vec_ind(&self) -> &[Option<usize>]                                - frame slot -> raw vector index
//   frame_vectors(&self) -> Vec<Vector3<f64>>                         - vectors in frame order, zero when empty

// ======================== CORRESPONDENCES ========================
pub use correspondence::Correspondence; // struct - partial injective map between vector slots
// Correspondence impl methods:
//   new(source_len, target_len) / identity(n)                         - empty or identity map
//   insert(&mut self, source, target) -> Result<()>                   - adds a pair, checks injectivity
//   get(source) / source_of(target) -> Option<usize>                  - forward and reverse lookup
//   inverse(&self) -> Self                                            - swaps source and target
//   to_map(&self) -> BTreeMap<usize, usize>                           - ordered source -> target map

// ======================== SIMILARITY ========================
pub use similarity::{
    is_similar,                     // fn(e1, e2, threshold_sq, policy) -> Option<Correspondence> - vector assignment under a threshold
    is_similar_points,              // fn(ref1, ref2, threshold_sq, policy) -> Result<Option<Correspondence>> - same on raw vector sets
};

// ======================== DISJOINT SET ========================
pub use disjoint_set::EnvDisjointSet; // struct - union-find over environments with frame re-indexing
// EnvDisjointSet impl methods:
//   from_environments(num_neigh, envs) -> Result<Self>                - one singleton class per environment
//   find(&self, c) -> Result<usize>                                   - class representative
//   merge(&mut self, a, b, correspondence) -> Result<bool>            - union by rank with re-indexing
//   find_set(&self, m) -> Result<Vec<usize>>                          - members of the class of m
//   get_avg_env(&self, m) -> Result<Vec<Vector3<f64>>>                - class-averaged vectors (num_neigh slots)
//   get_individual_env(&self, m) -> Result<Vec<Vector3<f64>>>         - element vectors in the class frame
