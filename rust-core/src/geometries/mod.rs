// Geometries module: Contains the periodic simulation box
// This module provides the box collaborator used to wrap neighbor displacement vectors

// ======================== MODULE DECLARATIONS ========================
pub mod sim_box;


// ======================== SIMULATION BOX ========================
pub use sim_box::SimBox;           // struct - periodic orthorhombic/triclinic (or 2D) simulation cell
// SimBox impl methods:
//   triclinic(lx, ly, lz, xy, xz, yz) -> Result<Self>         - general box from lengths and tilt factors
//   new(lx, ly, lz) -> Result<Self>                           - orthorhombic box
//   cube(l) -> Result<Self>                                   - cubic box
//   square(lx, ly) -> Result<Self>                            - 2D box in the xy plane
//   with_periodic(self, periodic: [bool; 3]) -> Self          - sets periodicity per box vector
//   wrap(&self, v: &Vector3<f64>) -> Vector3<f64>             - minimum image of a displacement vector
//   make_fractional / make_absolute                           - cartesian <-> fractional coordinates
//   perpendicular_widths(&self) -> Vector3<f64>               - distance between opposite faces
