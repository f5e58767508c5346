// Neighbor source interface: k nearest neighbor displacement vectors per point
// This module defines the contract shared by all spatial query engines

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{MatchEnvError, Result};
use crate::geometries::SimBox;

/// One neighbor of a reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Index of the neighbor in the point set.
    pub index: usize,
    /// Wrapped displacement from the reference point to the neighbor.
    pub delta: Vector3<f64>,
    /// Squared length of `delta`.
    pub dist_sq: f64,
}

/// Neighbors of every point of a point set, each list ordered by increasing distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborList {
    neighbors: Vec<Vec<Neighbor>>,
}

impl NeighborList {
    pub fn new(neighbors: Vec<Vec<Neighbor>>) -> Self {
        NeighborList { neighbors }
    }

    /// Number of reference points in the list.
    pub fn num_points(&self) -> usize {
        self.neighbors.len()
    }

    /// Ordered neighbors of the reference point `i`.
    pub fn neighbors_of(&self, i: usize) -> Result<&[Neighbor]> {
        self.neighbors.get(i).map(Vec::as_slice).ok_or_else(|| {
            MatchEnvError::invalid(format!(
                "point index {} out of range for {} points",
                i,
                self.neighbors.len()
            ))
        })
    }

    /// Iterate over `(reference index, neighbors)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Neighbor])> {
        self.neighbors.iter().enumerate().map(|(i, n)| (i, n.as_slice()))
    }
}

/// A spatial query engine returning the k nearest (periodic) neighbors of each point.
///
/// Implementations are bound to a box, a length scale `rmax` and a neighbor count `k`
/// at configuration time; rebinding to another box means configuring a new source.
pub trait NeighborSource: Sized + Send + Sync {
    /// Bind a new source to a box, cutoff hint and neighbor count.
    fn configure(sim_box: &SimBox, rmax: f64, k: usize) -> Result<Self>;

    /// Number of neighbors returned per point.
    fn num_neighbors(&self) -> usize;

    /// Length scale the source was configured with.
    fn rmax(&self) -> f64;

    /// Box the source wraps displacements with.
    fn sim_box(&self) -> &SimBox;

    /// Neighbors of every point, nearest first. Points with fewer than `k`
    /// other points available get shorter lists.
    fn compute(&self, points: &[Vector3<f64>]) -> Result<NeighborList>;

    /// Neighbors of the single reference point `i`, nearest first; the same list
    /// `compute` reports for `i`.
    fn neighbors_of(&self, points: &[Vector3<f64>], i: usize) -> Result<Vec<Neighbor>>;
}

/// Check the `(rmax, k)` pair every source is configured with.
pub(crate) fn validate_configuration(rmax: f64, k: usize) -> Result<()> {
    if !(rmax.is_finite() && rmax > 0.0) {
        return Err(MatchEnvError::invalid(format!(
            "rmax must be positive and finite, got {}",
            rmax
        )));
    }
    if k == 0 {
        return Err(MatchEnvError::invalid("number of neighbors must be at least 1"));
    }
    Ok(())
}

/// Reject point sets containing NaN or infinite coordinates.
pub(crate) fn validate_points(points: &[Vector3<f64>]) -> Result<()> {
    match points.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
        Some(i) => Err(MatchEnvError::invalid(format!(
            "point {} has non-finite coordinates",
            i
        ))),
        None => Ok(()),
    }
}

/// Check a reference index against the point set it refers to.
pub(crate) fn validate_index(points: &[Vector3<f64>], i: usize) -> Result<()> {
    if i < points.len() {
        Ok(())
    } else {
        Err(MatchEnvError::invalid(format!(
            "point index {} out of range for {} points",
            i,
            points.len()
        )))
    }
}

/// Keep the `k` nearest candidates; ties are broken by point index.
pub(crate) fn select_nearest(mut candidates: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    candidates.sort_unstable_by(|a, b| {
        a.dist_sq
            .total_cmp(&b.dist_sq)
            .then_with(|| a.index.cmp(&b.index))
    });
    candidates.truncate(k);
    candidates
}
