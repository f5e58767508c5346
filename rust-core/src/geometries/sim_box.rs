// Simulation box module: periodic cell used to wrap displacement vectors
// This module provides the minimum-image convention for orthorhombic and triclinic boxes

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{MatchEnvError, Result};

/// A periodic simulation box.
///
/// The box vectors are stored as the columns of `h`:
/// `a1 = (Lx, 0, 0)`, `a2 = (xy·Ly, Ly, 0)`, `a3 = (xz·Lz, yz·Lz, Lz)`.
/// A 2D box ignores the z direction entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimBox {
    /// Box vectors (columns).
    h: Matrix3<f64>,
    /// Inverse of `h`, cached for fractional coordinates.
    h_inv: Matrix3<f64>,
    /// Periodicity along each box vector.
    periodic: [bool; 3],
    /// Whether the box is two dimensional.
    is_2d: bool,
}

impl SimBox {
    /// Construct a general triclinic 3D box from edge lengths and tilt factors.
    pub fn triclinic(lx: f64, ly: f64, lz: f64, xy: f64, xz: f64, yz: f64) -> Result<Self> {
        for (name, value) in [("Lx", lx), ("Ly", ly), ("Lz", lz)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MatchEnvError::invalid(format!(
                    "box length {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("xy", xy), ("xz", xz), ("yz", yz)] {
            if !value.is_finite() {
                return Err(MatchEnvError::invalid(format!(
                    "tilt factor {} must be finite, got {}",
                    name, value
                )));
            }
        }

        let h = Matrix3::new(
            lx, xy * ly, xz * lz,
            0.0, ly, yz * lz,
            0.0, 0.0, lz,
        );
        let h_inv = h
            .try_inverse()
            .ok_or_else(|| MatchEnvError::invalid("box vectors are linearly dependent"))?;

        Ok(SimBox {
            h,
            h_inv,
            periodic: [true; 3],
            is_2d: false,
        })
    }

    /// Construct an orthorhombic 3D box.
    pub fn new(lx: f64, ly: f64, lz: f64) -> Result<Self> {
        Self::triclinic(lx, ly, lz, 0.0, 0.0, 0.0)
    }

    /// Construct a cubic 3D box of edge `l`.
    pub fn cube(l: f64) -> Result<Self> {
        Self::new(l, l, l)
    }

    /// Construct a rectangular 2D box in the xy plane.
    pub fn square(lx: f64, ly: f64) -> Result<Self> {
        let mut sim_box = Self::triclinic(lx, ly, 1.0, 0.0, 0.0, 0.0)?;
        sim_box.periodic[2] = false;
        sim_box.is_2d = true;
        Ok(sim_box)
    }

    /// Set periodicity per box vector (builder pattern).
    ///
    /// The z direction of a 2D box is never periodic.
    pub fn with_periodic(mut self, periodic: [bool; 3]) -> Self {
        self.periodic = periodic;
        if self.is_2d {
            self.periodic[2] = false;
        }
        self
    }

    /// Box vectors as matrix columns.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    /// Edge lengths (Lx, Ly, Lz).
    pub fn lengths(&self) -> Vector3<f64> {
        Vector3::new(self.h[(0, 0)], self.h[(1, 1)], self.h[(2, 2)])
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    /// Box volume (area for a 2D box).
    pub fn volume(&self) -> f64 {
        if self.is_2d {
            self.h[(0, 0)] * self.h[(1, 1)]
        } else {
            self.h.determinant().abs()
        }
    }

    /// Convert cartesian coords → fractional coords along the box vectors.
    pub fn make_fractional(&self, v_cart: &Vector3<f64>) -> Vector3<f64> {
        self.h_inv * v_cart
    }

    /// Convert fractional coords → cartesian.
    pub fn make_absolute(&self, v_frac: &Vector3<f64>) -> Vector3<f64> {
        self.h * v_frac
    }

    /// Distance between opposite faces for each box vector.
    ///
    /// For a triclinic box this is `V / |a_j × a_k|`, not the edge length.
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        let a1 = self.h.column(0).into_owned();
        let a2 = self.h.column(1).into_owned();
        let a3 = self.h.column(2).into_owned();
        let volume = self.h.determinant().abs();
        Vector3::new(
            volume / a2.cross(&a3).norm(),
            volume / a3.cross(&a1).norm(),
            volume / a1.cross(&a2).norm(),
        )
    }

    /// Wrap a displacement vector back into the box (minimum image).
    ///
    /// Non-periodic directions are left untouched. A 2D box drops the z component.
    pub fn wrap(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let mut frac = self.make_fractional(v);
        for dim in 0..3 {
            if self.periodic[dim] {
                frac[dim] -= frac[dim].round();
            }
        }
        let mut wrapped = self.make_absolute(&frac);
        if self.is_2d {
            wrapped.z = 0.0;
        }
        wrapped
    }
}
