// Cell list module: binned k-nearest-neighbor search for periodic boxes
// Points are binned along the box vectors; each query grows a block of cells
// shell by shell until the k nearest neighbors are guaranteed to be inside it.

use nalgebra::Vector3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
use crate::geometries::SimBox;
use crate::locality::neighbor_source::{
    select_nearest, validate_configuration, validate_index, validate_points, Neighbor,
    NeighborList, NeighborSource,
};

// Upper bound on the number of cells per point, keeps huge sparse boxes cheap
const MAX_CELLS_PER_POINT: usize = 4;

/// k nearest neighbors using a cell list with cells at least `rmax` wide.
#[derive(Debug, Clone, PartialEq)]
pub struct CellListNeighbors {
    sim_box: SimBox,
    rmax: f64,
    k: usize,
}

/// Points binned on a regular grid in fractional coordinates.
struct CellGrid {
    /// Number of cells along each box vector (1 along non-periodic directions).
    dims: [usize; 3],
    /// Perpendicular width of one cell along each box vector.
    widths: [f64; 3],
    /// Point indices per linear cell index.
    cells: Vec<Vec<usize>>,
    /// Cell coordinates of each point.
    point_cells: Vec<[usize; 3]>,
}

impl CellGrid {
    fn build(sim_box: &SimBox, rmax: f64, points: &[Vector3<f64>]) -> Self {
        let box_widths = sim_box.perpendicular_widths();
        let periodic = sim_box.periodic();

        // 1) Cells at least rmax wide along periodic directions
        let mut cell_size = rmax;
        let max_cells = (points.len() * MAX_CELLS_PER_POINT).max(8);
        let mut dims = Self::grid_dims(&box_widths, periodic, cell_size);
        let total: usize = dims.iter().product();
        if total > max_cells {
            let num_periodic = periodic.iter().filter(|&&p| p).count().max(1);
            cell_size *= (total as f64 / max_cells as f64).powf(1.0 / num_periodic as f64);
            dims = Self::grid_dims(&box_widths, periodic, cell_size);
        }

        let mut widths = [f64::INFINITY; 3];
        for dim in 0..3 {
            if periodic[dim] {
                widths[dim] = box_widths[dim] / dims[dim] as f64;
            }
        }

        // 2) Bin every point
        let mut grid = CellGrid {
            dims,
            widths,
            cells: vec![Vec::new(); dims[0] * dims[1] * dims[2]],
            point_cells: Vec::with_capacity(points.len()),
        };
        for (i, point) in points.iter().enumerate() {
            let frac = sim_box.make_fractional(point);
            let mut coords = [0usize; 3];
            for dim in 0..3 {
                if grid.dims[dim] > 1 {
                    let u = frac[dim] - frac[dim].floor();
                    coords[dim] = ((u * grid.dims[dim] as f64) as usize).min(grid.dims[dim] - 1);
                }
            }
            let cell = grid.linear_index(coords);
            grid.cells[cell].push(i);
            grid.point_cells.push(coords);
        }
        grid
    }

    fn grid_dims(box_widths: &Vector3<f64>, periodic: [bool; 3], cell_size: f64) -> [usize; 3] {
        let mut dims = [1usize; 3];
        for dim in 0..3 {
            if periodic[dim] {
                dims[dim] = ((box_widths[dim] / cell_size).floor() as usize).max(1);
            }
        }
        dims
    }

    fn linear_index(&self, coords: [usize; 3]) -> usize {
        coords[0] + self.dims[0] * (coords[1] + self.dims[1] * coords[2])
    }

    /// Cell coordinates along `dim` within `shell` cells of `center`, each listed once.
    fn shell_range(&self, dim: usize, center: usize, shell: usize) -> Vec<usize> {
        let n = self.dims[dim];
        if self.covers_dim(dim, shell) {
            (0..n).collect()
        } else {
            (0..=2 * shell).map(|offset| (center + n + offset - shell) % n).collect()
        }
    }

    fn covers_dim(&self, dim: usize, shell: usize) -> bool {
        2 * shell + 1 >= self.dims[dim]
    }

    fn covers_everything(&self, shell: usize) -> bool {
        (0..3).all(|dim| self.covers_dim(dim, shell))
    }

    /// Radius around any point of the center cell that lies fully inside the searched block.
    fn guaranteed_radius(&self, shell: usize) -> f64 {
        (0..3)
            .filter(|&dim| !self.covers_dim(dim, shell))
            .map(|dim| shell as f64 * self.widths[dim])
            .fold(f64::INFINITY, f64::min)
    }
}

impl CellListNeighbors {
    fn neighbors_of_point(
        &self,
        grid: &CellGrid,
        points: &[Vector3<f64>],
        i: usize,
    ) -> Vec<Neighbor> {
        let reference = points[i];
        let center = grid.point_cells[i];
        let mut shell = 1;

        loop {
            let mut candidates = Vec::new();
            for cz in grid.shell_range(2, center[2], shell) {
                for cy in grid.shell_range(1, center[1], shell) {
                    for cx in grid.shell_range(0, center[0], shell) {
                        let cell = grid.linear_index([cx, cy, cz]);
                        for &j in grid.cells[cell].iter().filter(|&&j| j != i) {
                            let delta = self.sim_box.wrap(&(points[j] - reference));
                            candidates.push(Neighbor {
                                index: j,
                                delta,
                                dist_sq: delta.norm_squared(),
                            });
                        }
                    }
                }
            }

            if grid.covers_everything(shell) {
                return select_nearest(candidates, self.k);
            }
            let radius = grid.guaranteed_radius(shell);
            let radius_sq = radius * radius;
            if candidates.iter().filter(|n| n.dist_sq <= radius_sq).count() >= self.k {
                return select_nearest(candidates, self.k);
            }
            shell += 1;
        }
    }
}

impl NeighborSource for CellListNeighbors {
    fn configure(sim_box: &SimBox, rmax: f64, k: usize) -> Result<Self> {
        validate_configuration(rmax, k)?;
        Ok(CellListNeighbors {
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
        let grid = CellGrid::build(&self.sim_box, self.rmax, points);
        log::debug!(
            "cell list: {}x{}x{} cells for {} points",
            grid.dims[0],
            grid.dims[1],
            grid.dims[2],
            points.len()
        );

        #[cfg(feature = "parallel")]
        let neighbors = (0..points.len())
            .into_par_iter()
            .map(|i| self.neighbors_of_point(&grid, points, i))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let neighbors = (0..points.len())
            .map(|i| self.neighbors_of_point(&grid, points, i))
            .collect();

        Ok(NeighborList::new(neighbors))
    }

    // Bins the whole point set for a single query
    fn neighbors_of(&self, points: &[Vector3<f64>], i: usize) -> Result<Vec<Neighbor>> {
        validate_points(points)?;
        validate_index(points, i)?;
        let grid = CellGrid::build(&self.sim_box, self.rmax, points);
        Ok(self.neighbors_of_point(&grid, points, i))
    }
}
