use nalgebra::Vector3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
use crate::geometries::SimBox;
use crate::locality::neighbor_source::{
    select_nearest, validate_configuration, validate_index, validate_points, Neighbor,
    NeighborList, NeighborSource,
};

/// Brute-force k nearest neighbors.
///
/// Every point is compared against every other point, O(N²) overall. This is the
/// reference implementation the binned source is checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct KNearestNeighbors {
    sim_box: SimBox,
    rmax: f64,
    k: usize,
}

impl KNearestNeighbors {
    fn neighbors_of_point(&self, points: &[Vector3<f64>], i: usize) -> Vec<Neighbor> {
        let reference = points[i];
        let candidates = points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, p)| {
                let delta = self.sim_box.wrap(&(p - reference));
                Neighbor {
                    index: j,
                    delta,
                    dist_sq: delta.norm_squared(),
                }
            })
            .collect();
        select_nearest(candidates, self.k)
    }
}

impl NeighborSource for KNearestNeighbors {
    fn configure(sim_box: &SimBox, rmax: f64, k: usize) -> Result<Self> {
        validate_configuration(rmax, k)?;
        Ok(KNearestNeighbors {
            sim_box: *sim_box,
            rmax,
            k,
        })
    }

    fn num_neighbors(&self) -> usize {
        self.k
    }

    fn rmax(&self) -> f64 {
        self.rmax
    }

    fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    fn compute(&self, points: &[Vector3<f64>]) -> Result<NeighborList> {
        validate_points(points)?;

        #[cfg(feature = "parallel")]
        let neighbors = (0..points.len())
            .into_par_iter()
            .map(|i| self.neighbors_of_point(points, i))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let neighbors = (0..points.len())
            .map(|i| self.neighbors_of_point(points, i))
            .collect();

        Ok(NeighborList::new(neighbors))
    }

    fn neighbors_of(&self, points: &[Vector3<f64>], i: usize) -> Result<Vec<Neighbor>> {
        validate_points(points)?;
        validate_index(points, i)?;
        Ok(self.neighbors_of_point(points, i))
    }
}
