//! Lattices and periodic geometry. A [`Lattice`] is a particular basis of 3D space, given as the
//! columns a, b, c of a matrix in angstroms. Everything that compares two positions in a crystal
//! goes through the helpers here: positions are wrapped modulo the unit cell, displacements use
//! the minimum-image convention, and neighbor searches enumerate exactly the periodic images that
//! can fall within a radius.

use crate::units::{angstrom, radian, Angle, Length, Volume};
use nalgebra::{Matrix3, Vector3};
use std::cmp::Ordering;
use thiserror::Error;

/// A basis in 3D space. Columns are the a, b, c lattice vectors in angstroms.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    m: Matrix3<f64>,
    inv_m: Matrix3<f64>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Angles cannot be satisfied: {0}, {1}, {2}")]
    InvalidAngles(f64, f64, f64),
    #[error("Lattice matrix is singular or not finite: {0}")]
    Singular(Matrix3<f64>),
}

/// A periodic image of a point: which point, which lattice translation, and where it lands.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicImage {
    /// Index into the point list that was searched.
    pub index: usize,
    /// The integer lattice translation applied to the wrapped point.
    pub shift: Vector3<i32>,
    /// Cartesian position of the image.
    pub cart: Vector3<f64>,
    /// Distance from the search center.
    pub distance: f64,
}

/// Wraps a single fractional coordinate into [0, 1). Values that round up to exactly 1 are sent
/// to 0.
pub fn wrap_component(x: f64) -> f64 {
    let w = x.rem_euclid(1.0);
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// Wraps a single fractional difference into [-0.5, 0.5).
pub fn centered_component(x: f64) -> f64 {
    let w = x - x.round();
    if w >= 0.5 {
        w - 1.0
    } else {
        w
    }
}

impl Lattice {
    /// A new lattice from a matrix whose columns are the basis vectors, in angstroms. Fails if the
    /// matrix is not invertible.
    pub fn new(m: Matrix3<f64>) -> Result<Self, LatticeError> {
        let det = m.determinant();
        if !det.is_finite() || det.abs() < 1e-8 {
            return Err(LatticeError::Singular(m));
        }
        let inv_m = m.try_inverse().ok_or(LatticeError::Singular(m))?;
        Ok(Self { m, inv_m })
    }

    /// A new lattice from the three basis vectors given as rows, which is how most structure files
    /// list them.
    pub fn from_rows(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Result<Self, LatticeError> {
        Self::new(Matrix3::from_columns(&[
            Vector3::from(a),
            Vector3::from(b),
            Vector3::from(c),
        ]))
    }

    /// A cubic lattice with edge `a`.
    pub fn cubic(a: f64) -> Result<Self, LatticeError> {
        Self::new(Matrix3::from_diagonal_element(a))
    }

    /// Initializes from a, b, c, α, β, γ. Out of all potential rotations of a lattice that satisfy
    /// the parameters, we choose the one that is upper triangular, with no nonzero entries below
    /// the main diagonal. [AFlow](https://aflow.org/prototype-encyclopedia/triclinic_lattice.html)
    /// gives the formulae.
    ///
    /// This is fallible: [not all combinations give valid unit
    /// cells.](https://journals.iucr.org/a/issues/2011/01/00/au5114/au5114.pdf).
    ///
    /// Assumes inputs are in angstroms and degrees.
    pub fn try_from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, LatticeError> {
        let (alpha, beta, gamma) = (alpha % 360., beta % 360., gamma % 360.);
        for expr in &[
            alpha + beta + gamma,
            alpha + beta - gamma,
            alpha - beta + gamma,
            -alpha + beta + gamma,
        ] {
            if !(0f64..360f64).contains(expr) {
                return Err(LatticeError::InvalidAngles(alpha, beta, gamma));
            }
        }
        let (alpha, beta, gamma) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());

        let cos_a = alpha.cos();
        let cos_b = beta.cos();
        let (sin_y, cos_y) = gamma.sin_cos();
        if sin_y.abs() < 1e-12 {
            return Err(LatticeError::InvalidAngles(
                alpha.to_degrees(),
                beta.to_degrees(),
                gamma.to_degrees(),
            ));
        }

        let a_vec = Vector3::x().scale(a);
        let b_vec = Vector3::new(cos_y, sin_y, 0.).scale(b);
        let cx = cos_b;
        let cy = (cos_a - cos_b * cos_y) / sin_y;
        let cz2 = 1. - cx * cx - cy * cy;
        if cz2 <= 0. {
            return Err(LatticeError::InvalidAngles(
                alpha.to_degrees(),
                beta.to_degrees(),
                gamma.to_degrees(),
            ));
        }
        let c_vec = Vector3::new(cx, cy, cz2.sqrt()).scale(c);

        Self::new(Matrix3::from_columns(&[a_vec, b_vec, c_vec]))
    }

    /// The lattice matrix, columns a, b, c.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    /// Gets the first basis vector.
    pub fn a_vec(&self) -> Vector3<f64> {
        self.m.column(0).into()
    }

    /// Gets the second basis vector.
    pub fn b_vec(&self) -> Vector3<f64> {
        self.m.column(1).into()
    }

    /// Gets the third basis vector.
    pub fn c_vec(&self) -> Vector3<f64> {
        self.m.column(2).into()
    }

    pub fn a(&self) -> Length {
        Length::new::<angstrom>(self.a_vec().norm())
    }

    pub fn b(&self) -> Length {
        Length::new::<angstrom>(self.b_vec().norm())
    }

    pub fn c(&self) -> Length {
        Length::new::<angstrom>(self.c_vec().norm())
    }

    /// Gets the angle between b and c, called α.
    pub fn alpha(&self) -> Angle {
        Angle::new::<radian>(self.b_vec().angle(&self.c_vec()))
    }

    /// Gets the angle between c and a, called β.
    pub fn beta(&self) -> Angle {
        Angle::new::<radian>(self.c_vec().angle(&self.a_vec()))
    }

    /// Gets the angle between a and b, called γ.
    pub fn gamma(&self) -> Angle {
        Angle::new::<radian>(self.a_vec().angle(&self.b_vec()))
    }

    /// Gets the parameters (a, b, c, α, β, γ), in units.
    pub fn params(&self) -> (Length, Length, Length, Angle, Angle, Angle) {
        (
            self.a(),
            self.b(),
            self.c(),
            self.alpha(),
            self.beta(),
            self.gamma(),
        )
    }

    /// Returns the metric tensor G = MᵀM. For two fractional vectors v, w the Cartesian dot
    /// product is vᵀ G w, so two lattices with the same metric tensor are equivalent up to an
    /// isometry.
    pub fn metric_tensor(&self) -> Matrix3<f64> {
        self.m.transpose() * self.m
    }

    /// Returns the volume of the unit cell.
    pub fn volume(&self) -> Volume {
        let l = Length::new::<angstrom>(1.0);
        l * l * l * self.m.determinant().abs()
    }

    /// Volume of the unit cell in cubic angstroms, for internal arithmetic.
    pub(crate) fn volume_value(&self) -> f64 {
        self.m.determinant().abs()
    }

    /// Returns the inverse matrix of the lattice, which maps from Cartesian coordinates to
    /// fractional coordinates.
    pub fn inv_m(&self) -> &Matrix3<f64> {
        &self.inv_m
    }

    pub fn to_cartesian(&self, f: &Vector3<f64>) -> Vector3<f64> {
        self.m * f
    }

    pub fn to_fractional(&self, c: &Vector3<f64>) -> Vector3<f64> {
        self.inv_m * c
    }

    /// Reduces each component into [0, 1).
    pub fn wrap(&self, f: &Vector3<f64>) -> Vector3<f64> {
        f.map(wrap_component)
    }

    /// The separation between lattice planes normal to each reciprocal axis. A sphere of radius R
    /// crosses at most ⌈R / spacing⌉ planes along that axis.
    pub fn interplanar_spacings(&self) -> Vector3<f64> {
        Vector3::from_fn(|i, _| 1.0 / self.inv_m.row(i).norm())
    }

    /// The shortest displacement from `f1` to any image of `f2`, as (fractional, Cartesian).
    ///
    /// The fractional difference is first wrapped into [-0.5, 0.5), which is already the answer
    /// for orthogonal cells. For skewed cells a neighboring image can be closer, so at least the
    /// 26 surrounding images are searched, and more for cells sheared badly enough that a shorter
    /// vector could lie further out.
    pub fn min_image(&self, f1: &Vector3<f64>, f2: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let base = (f2 - f1).map(centered_component);
        let mut best_frac = base;
        let mut best_cart = self.to_cartesian(&base);
        let mut best_norm = best_cart.norm_squared();
        // |base_i + n_i| <= |v| / spacing_i for any shorter v
        let reach = self
            .interplanar_spacings()
            .map(|s| ((best_norm.sqrt() / s + 0.5).ceil() as i32).max(1));
        for i in -reach.x..=reach.x {
            for j in -reach.y..=reach.y {
                for k in -reach.z..=reach.z {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let df = base + Vector3::new(i as f64, j as f64, k as f64);
                    let dc = self.to_cartesian(&df);
                    let n = dc.norm_squared();
                    if n < best_norm - 1e-12 {
                        best_norm = n;
                        best_frac = df;
                        best_cart = dc;
                    }
                }
            }
        }
        (best_frac, best_cart)
    }

    /// Minimum-image Cartesian distance between two fractional positions.
    pub fn distance(&self, f1: &Vector3<f64>, f2: &Vector3<f64>) -> f64 {
        self.min_image(f1, f2).1.norm()
    }

    /// Whether two fractional positions coincide modulo the lattice: every component of the
    /// wrapped difference is within `tol`, in fractional units.
    pub fn same_position(&self, f1: &Vector3<f64>, f2: &Vector3<f64>, tol: f64) -> bool {
        (f2 - f1)
            .iter()
            .all(|&d| centered_component(d).abs() <= tol)
    }

    /// Every periodic image of `points` within `radius` angstroms of `center`, sorted by distance,
    /// then point index, then lattice translation. Points are wrapped into the unit cell before
    /// the translations are applied, so `shift` is relative to the wrapped point.
    pub fn images_within(
        &self,
        center: &Vector3<f64>,
        points: &[Vector3<f64>],
        radius: f64,
    ) -> Vec<PeriodicImage> {
        let center = self.wrap(center);
        let center_cart = self.to_cartesian(&center);
        let spacings = self.interplanar_spacings();
        let n_images = spacings.map(|s| (radius / s).ceil() as i32 + 1);

        let mut images = vec![];
        for (index, p) in points.iter().enumerate() {
            let p = self.wrap(p);
            for i in -n_images.x..=n_images.x {
                for j in -n_images.y..=n_images.y {
                    for k in -n_images.z..=n_images.z {
                        let shift = Vector3::new(i, j, k);
                        let cart = self.to_cartesian(&(p + shift.map(f64::from)));
                        let distance = (cart - center_cart).norm();
                        if distance <= radius {
                            images.push(PeriodicImage {
                                index,
                                shift,
                                cart,
                                distance,
                            });
                        }
                    }
                }
            }
        }
        images.sort_by(compare_images);
        images
    }
}

fn compare_images(a: &PeriodicImage, b: &PeriodicImage) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.index.cmp(&b.index))
        .then_with(|| a.shift.as_slice().cmp(b.shift.as_slice()))
}
