// Locality module: Contains the spatial neighbor query engines
// This module provides periodic k-nearest-neighbor lists used to build local environments

// ======================== MODULE DECLARATIONS ========================
pub mod neighbor_source;
pub mod nearest_neighbors;
pub mod cell_list;


// ======================== NEIGHBOR QUERY INTERFACE ========================
pub use neighbor_source::{
    Neighbor,                       // struct - neighbor index, wrapped displacement and squared distance
    NeighborList,                   // struct - ordered neighbors of every point of a point set
    NeighborSource,                 // trait - spatial query engine bound to (box, rmax, k)
};
// NeighborSource trait methods:
//   configure(sim_box: &SimBox, rmax: f64, k: usize) -> Result<Self> - binds a new source
//   num_neighbors(&self) -> usize                                     - neighbors returned per point
//   compute(&self, points: &[Vector3<f64>]) -> Result<NeighborList>   - neighbors of every point, nearest first
//   neighbors_of(&self, points, i: usize) -> Result<Vec<Neighbor>>    - neighbors of the single point i

// NeighborList impl methods:
//   neighbors_of(&self, i: usize) -> Result<&[Neighbor]>             - ordered neighbors of point i
//   num_points(&self) -> usize                                        - number of reference points

// ======================== IMPLEMENTATIONS ========================
pub use nearest_neighbors::KNearestNeighbors; // struct - brute-force O(N²) reference implementation
pub use cell_list::CellListNeighbors;         // struct - binned search growing shell by shell
