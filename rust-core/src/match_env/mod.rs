// Match env module: Contains the clustering and motif matching runs
// This module ties neighbor search, similarity tests and the disjoint set together

// ======================== MODULE DECLARATIONS ========================
pub mod matcher;
pub mod builder;
pub mod results;

// Test modules
mod _tests_match_env;

// ======================== MATCHER ========================
pub use matcher::MatchEnv; // struct - environment clustering and motif matching bound to (box, rmax, k)
// MatchEnv impl methods:
//   new(sim_box: SimBox, rmax: f64, k: usize) -> Result<Self>        - brute-force neighbor source, default policies
//   set_box(&mut self, sim_box) -> Result<()> / with_box(self, ..)    - rebind to a new box, drops results
//   build_env(&self, points, i, env_ind, hard_r) -> Result<Environment> - environment of point i
//   is_similar(&self, e1, e2, threshold_sq) -> Option<Correspondence> - similarity with the configured policy
//   cluster(&mut self, points, threshold, hard_r) -> Result<()>       - groups matching environments
//   match_motif(&mut self, points, ref_points, threshold, hard_r) -> Result<()> - tests particles against a motif
//   populate_env(&self, dj, relabel) -> Result<MatchEnvResults>        - turns classes into labels and averages
//   clusters / environment / tot_environment / num_clusters / num_particles - views over the last run

// ======================== BUILDER ========================
pub use builder::MatchEnvBuilder; // struct - box, rmax, k, policy and pair strategy
// MatchEnvBuilder impl methods:
//   with_box / with_rmax / with_num_neighbors                         - required geometry and neighbor count
//   with_matching_policy / with_pair_strategy                         - optional policies
//   build(self) -> Result<MatchEnv>                                   - brute-force neighbor source
//   build_with::<N>(self) -> Result<MatchEnv<N>>                      - any NeighborSource

// ======================== RESULTS ========================
pub use results::MatchEnvResults; // struct - labels, averaged and per-particle environments of one run
// MatchEnvResults impl methods:
//   environment(label) -> Result<&[Vector3<f64>]>                     - averaged environment of a cluster
//   particle_environment(i) -> Result<&[Vector3<f64>]>                - frame-aligned environment of a particle
//   motif_matches() -> Option<Vec<bool>>                              - per-particle outcome of a motif run
//   cluster_sizes() -> BTreeMap<usize, usize>                         - particles per label
