//! Space group operations of a structure and the equivalence of positions under them.
//!
//! Operations come from a [`SymmetryService`]. Two are provided: [`SymmetryFinder`] searches for
//! every operation that maps a structure onto itself within a Cartesian tolerance, and
//! [`TabulatedSymmetry`] takes operations written as triplets and only checks that they are
//! actually symmetries of the structure. A [`SymmetryOracle`] asks a service once and then
//! answers whether two positions are related by any of the operations.

use std::cmp::Ordering;
use std::str::FromStr;

use log::{debug, trace};
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

use crate::{
    algebra::{generate_elements, FinitelyGeneratedGroup, Group},
    isometry::{int_inverse, is_unimodular, Isometry, IsometryError},
    lattice::{centered_component, Lattice},
    orbit::Equivalence,
    structure::Structure,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("Symmetry could not be determined at tolerance {tolerance}: {reason}")]
    Undetermined { tolerance: f64, reason: String },
    #[error(transparent)]
    Parse(#[from] IsometryError),
}

fn undetermined(tolerance: f64, reason: impl Into<String>) -> SymmetryError {
    SymmetryError::Undetermined {
        tolerance,
        reason: reason.into(),
    }
}

/// A space group operation acting on fractional coordinates: f ↦ Rf + τ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryOperation {
    pub rot: Matrix3<i32>,
    pub tau: Vector3<f64>,
}

impl SymmetryOperation {
    pub fn new(rot: Matrix3<i32>, tau: Vector3<f64>) -> Self {
        Self { rot, tau }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// Applies the operation to a fractional position. The result is not wrapped.
    pub fn apply(&self, f: &Vector3<f64>) -> Vector3<f64> {
        self.rot.map(f64::from) * f + self.tau
    }

    /// `a.compose(&b)` is "do b, then do a".
    pub fn compose(&self, other: &Self) -> Self {
        Self::new(self.rot * other.rot, self.apply(&other.tau))
    }

    /// The inverse operation, if the rotation is unimodular.
    pub fn inverse(&self) -> Option<Self> {
        let rot = int_inverse(&self.rot)?;
        Some(Self::new(rot, -(rot.map(f64::from) * self.tau)))
    }

    /// The same operation with the translation reduced into [0, 1).
    pub fn modulo_unit_cell(&self) -> Self {
        Self::new(self.rot, self.tau.map(crate::lattice::wrap_component))
    }

    fn has_identity_rotation(&self) -> bool {
        self.rot == Matrix3::identity()
    }
}

impl From<Isometry> for SymmetryOperation {
    fn from(iso: Isometry) -> Self {
        Self::new(iso.rot(), iso.tau().map(f64::from))
    }
}

/// Anything that can report the space group operations of a structure at a given Cartesian
/// tolerance, in angstroms.
pub trait SymmetryService: Send + Sync {
    fn operations(
        &self,
        structure: &Structure,
        tolerance: f64,
    ) -> Result<Vec<SymmetryOperation>, SymmetryError>;
}

/// The seven lattice systems, identified by the order of the lattice point group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LatticeSystem {
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Rhombohedral,
    Tetragonal,
    Hexagonal,
    Cubic,
}

impl LatticeSystem {
    /// The lattice system whose holohedry has the given order.
    pub fn from_holohedry_order(order: usize) -> Option<Self> {
        match order {
            2 => Some(Self::Triclinic),
            4 => Some(Self::Monoclinic),
            8 => Some(Self::Orthorhombic),
            12 => Some(Self::Rhombohedral),
            16 => Some(Self::Tetragonal),
            24 => Some(Self::Hexagonal),
            48 => Some(Self::Cubic),
            _ => None,
        }
    }
}

/// Operations compared modulo lattice translations, with translations equal when their
/// Cartesian separation is within a tolerance. Used to check that a numerically found set of
/// operations is a group.
struct ToleranceGroup<'a> {
    lattice: &'a Lattice,
    tolerance: f64,
}

impl Group<SymmetryOperation> for ToleranceGroup<'_> {
    fn identity(&self) -> SymmetryOperation {
        SymmetryOperation::identity()
    }

    fn inv(&self, element: &SymmetryOperation) -> SymmetryOperation {
        element
            .inverse()
            .unwrap_or_else(SymmetryOperation::identity)
            .modulo_unit_cell()
    }

    fn compose(&self, a: &SymmetryOperation, b: &SymmetryOperation) -> SymmetryOperation {
        a.compose(b).modulo_unit_cell()
    }

    fn equiv(&self, a: &SymmetryOperation, b: &SymmetryOperation) -> bool {
        a.rot == b.rot && {
            let d = (a.tau - b.tau).map(centered_component);
            self.lattice.to_cartesian(&d).norm() <= self.tolerance
        }
    }

    fn residue(&self, el: &SymmetryOperation) -> SymmetryOperation {
        el.modulo_unit_cell()
    }
}

/// Exact operations modulo lattice translations, generated from a list of generators. [`Isometry`]
/// already keeps its translation in [0, 1), so plain equality is equivalence.
struct TabulatedGroup<'a> {
    generators: &'a [Isometry],
}

impl Group<Isometry> for TabulatedGroup<'_> {
    fn identity(&self) -> Isometry {
        Isometry::identity()
    }

    fn inv(&self, element: &Isometry) -> Isometry {
        element.inv()
    }

    fn compose(&self, a: &Isometry, b: &Isometry) -> Isometry {
        *a * *b
    }

    fn equiv(&self, a: &Isometry, b: &Isometry) -> bool {
        a == b
    }

    fn residue(&self, el: &Isometry) -> Isometry {
        *el
    }
}

impl FinitelyGeneratedGroup<Isometry> for TabulatedGroup<'_> {
    type Generators = Vec<Isometry>;

    fn generators(&self) -> Self::Generators {
        self.generators.to_vec()
    }
}

fn validate_tolerance(tolerance: f64) -> Result<(), SymmetryError> {
    if tolerance.is_finite() && tolerance > 0.0 {
        Ok(())
    } else {
        Err(undetermined(tolerance, "tolerance must be positive and finite"))
    }
}

/// Indices of sites with identical occupancy, in order of first appearance.
fn occupancy_groups(structure: &Structure) -> Vec<usize> {
    let mut reps: Vec<usize> = vec![];
    structure
        .sites()
        .iter()
        .enumerate()
        .map(|(i, site)| {
            match reps
                .iter()
                .position(|&r| structure.sites()[r].occupancy.matches(&site.occupancy))
            {
                Some(g) => g,
                None => {
                    reps.push(i);
                    reps.len() - 1
                }
            }
        })
        .collect()
}

/// Whether `op` sends every site onto a site with the same occupancy, within `tolerance`
/// angstroms.
fn maps_onto_itself(
    structure: &Structure,
    groups: &[usize],
    op: &SymmetryOperation,
    tolerance: f64,
) -> bool {
    let lattice = structure.lattice();
    let sites = structure.sites();
    sites.iter().enumerate().all(|(i, site)| {
        let image = op.apply(&site.frac);
        sites
            .iter()
            .enumerate()
            .any(|(k, other)| groups[k] == groups[i] && lattice.distance(&image, &other.frac) <= tolerance)
    })
}

fn compare_operations(a: &SymmetryOperation, b: &SymmetryOperation) -> Ordering {
    // identity rotation first, then pure translations in order
    (!a.has_identity_rotation())
        .cmp(&!b.has_identity_rotation())
        .then_with(|| a.rot.transpose().as_slice().cmp(b.rot.transpose().as_slice()))
        .then_with(|| {
            a.tau
                .iter()
                .zip(b.tau.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
}

/// Finds the space group operations of a structure by brute force: every rotation of the lattice
/// is tried with every translation that sends a site onto another site of the same kind.
///
/// The lattice point group is searched among integer matrices with entries in {-1, 0, 1}, which
/// finds every operation when the basis is reasonably reduced (as conventional and Niggli cells
/// are).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetryFinder;

impl SymmetryFinder {
    pub fn new() -> Self {
        Self
    }

    /// Every integer matrix W with det ±1 that preserves the metric tensor, WᵀGW ≈ G.
    pub fn lattice_point_group(&self, lattice: &Lattice, tolerance: f64) -> Vec<Matrix3<i32>> {
        let g = lattice.metric_tensor();
        let max_len = [lattice.a_vec(), lattice.b_vec(), lattice.c_vec()]
            .iter()
            .map(|v| v.norm())
            .fold(0.0, f64::max);
        let metric_tol = 2.0 * tolerance * max_len + tolerance * tolerance;

        let mut rotations = vec![];
        for code in 0..3i32.pow(9) {
            let mut c = code;
            let w = Matrix3::from_fn(|_, _| {
                let entry = c % 3 - 1;
                c /= 3;
                entry
            });
            if !is_unimodular(&w) {
                continue;
            }
            let wf = w.map(f64::from);
            let diff = wf.transpose() * g * wf - g;
            if diff.iter().all(|d| d.abs() <= metric_tol) {
                rotations.push(w);
            }
        }
        rotations.sort_by(|a, b| a.transpose().as_slice().cmp(b.transpose().as_slice()));
        rotations
    }

    /// The lattice system of a lattice, from the order of its point group.
    pub fn lattice_system(
        &self,
        lattice: &Lattice,
        tolerance: f64,
    ) -> Result<LatticeSystem, SymmetryError> {
        validate_tolerance(tolerance)?;
        holohedry(&self.lattice_point_group(lattice, tolerance), tolerance)
    }
}

/// The lattice system of an already computed lattice point group.
fn holohedry(rotations: &[Matrix3<i32>], tolerance: f64) -> Result<LatticeSystem, SymmetryError> {
    let order = rotations.len();
    LatticeSystem::from_holohedry_order(order).ok_or_else(|| {
        undetermined(
            tolerance,
            format!("lattice point group of order {order} is not a holohedry"),
        )
    })
}

impl SymmetryService for SymmetryFinder {
    fn operations(
        &self,
        structure: &Structure,
        tolerance: f64,
    ) -> Result<Vec<SymmetryOperation>, SymmetryError> {
        validate_tolerance(tolerance)?;
        if structure.is_empty() {
            return Err(undetermined(tolerance, "structure has no sites"));
        }
        let lattice = structure.lattice();
        let rotations = self.lattice_point_group(lattice, tolerance);
        let system = holohedry(&rotations, tolerance)?;

        let groups = occupancy_groups(structure);
        let n_groups = groups.iter().max().map_or(0, |g| g + 1);
        let anchor_group = (0..n_groups)
            .min_by_key(|&g| (groups.iter().filter(|&&x| x == g).count(), g))
            .unwrap_or(0);
        let anchor = groups.iter().position(|&g| g == anchor_group).unwrap_or(0);
        let anchor_frac = structure.sites()[anchor].frac;
        let targets: Vec<usize> = (0..structure.len())
            .filter(|&j| groups[j] == anchor_group)
            .collect();

        let group = ToleranceGroup { lattice, tolerance };
        let mut ops: Vec<SymmetryOperation> = vec![];
        for rot in &rotations {
            let rotated_anchor = rot.map(f64::from) * anchor_frac;
            for &j in &targets {
                let tau = lattice.wrap(&(structure.sites()[j].frac - rotated_anchor));
                let op = SymmetryOperation::new(*rot, tau);
                if group.contains_equiv(&ops, &op) {
                    continue;
                }
                if maps_onto_itself(structure, &groups, &op, tolerance) {
                    ops.push(op);
                }
            }
        }
        trace!("{} candidate rotations, {} operations", rotations.len(), ops.len());

        if !group.is_closed(&ops) {
            return Err(undetermined(
                tolerance,
                format!("{} operations found do not form a group", ops.len()),
            ));
        }
        ops.sort_by(compare_operations);
        debug!(
            "{}: {:?} lattice, {} symmetry operations",
            structure.formula(),
            system,
            ops.len()
        );
        Ok(ops)
    }
}

/// Space group operations given explicitly as triplets. The service does not search for
/// symmetry; it reports the tabulated operations after checking that each one really maps the
/// structure onto itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedSymmetry {
    operations: Vec<Isometry>,
}

impl TabulatedSymmetry {
    /// Uses exactly the listed operations, e.g. `["x, y, z", "-x, -y, -z"]`.
    pub fn from_triplets<S: AsRef<str>>(triplets: &[S]) -> Result<Self, SymmetryError> {
        let operations = triplets
            .iter()
            .map(|t| Isometry::from_str(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { operations })
    }

    /// Uses every operation generated by the listed ones, modulo lattice translations.
    pub fn from_generators<S: AsRef<str>>(generators: &[S]) -> Result<Self, SymmetryError> {
        let gens = Self::from_triplets(generators)?.operations;
        let operations = generate_elements(&TabulatedGroup { generators: &gens });
        Ok(Self { operations })
    }

    pub fn isometries(&self) -> &[Isometry] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl SymmetryService for TabulatedSymmetry {
    fn operations(
        &self,
        structure: &Structure,
        tolerance: f64,
    ) -> Result<Vec<SymmetryOperation>, SymmetryError> {
        validate_tolerance(tolerance)?;
        if structure.is_empty() {
            return Err(undetermined(tolerance, "structure has no sites"));
        }
        let groups = occupancy_groups(structure);
        let mut ops = Vec::with_capacity(self.operations.len());
        for iso in &self.operations {
            let op = SymmetryOperation::from(*iso);
            if !maps_onto_itself(structure, &groups, &op, tolerance) {
                return Err(undetermined(
                    tolerance,
                    format!("operation {iso} does not map the structure onto itself"),
                ));
            }
            ops.push(op);
        }
        if !ops.iter().any(|op| op.has_identity_rotation() && op.tau == Vector3::zeros()) {
            ops.insert(0, SymmetryOperation::identity());
        }
        debug!("{}: {} tabulated operations", structure.formula(), ops.len());
        Ok(ops)
    }
}

/// Decides whether two positions in a structure are symmetry-equivalent. The symmetry service is
/// consulted once, on construction.
#[derive(Debug, Clone)]
pub struct SymmetryOracle {
    lattice: Lattice,
    operations: Vec<SymmetryOperation>,
    position_tolerance: f64,
}

impl SymmetryOracle {
    /// `symmetry_tolerance` is the Cartesian tolerance handed to the service, in angstroms;
    /// `position_tolerance` is the fractional tolerance for comparing images of positions.
    pub fn new<S: SymmetryService + ?Sized>(
        service: &S,
        structure: &Structure,
        symmetry_tolerance: f64,
        position_tolerance: f64,
    ) -> Result<Self, SymmetryError> {
        let operations = service.operations(structure, symmetry_tolerance)?;
        if operations.is_empty() {
            return Err(undetermined(symmetry_tolerance, "no operations returned"));
        }
        Ok(Self {
            lattice: structure.lattice().clone(),
            operations,
            position_tolerance,
        })
    }

    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    /// Whether some operation maps `a` onto `b`, modulo lattice translations.
    pub fn are_equivalent(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        self.operations
            .iter()
            .any(|op| self.lattice.same_position(&op.apply(a), b, self.position_tolerance))
    }

    /// The distinct images of `a` under every operation, wrapped into the unit cell, in the order
    /// the operations first produce them.
    pub fn orbit_of(&self, a: &Vector3<f64>) -> Vec<Vector3<f64>> {
        let mut orbit: Vec<Vector3<f64>> = vec![];
        for op in &self.operations {
            let image = self.lattice.wrap(&op.apply(a));
            if !orbit
                .iter()
                .any(|p| self.lattice.same_position(p, &image, self.position_tolerance))
            {
                orbit.push(image);
            }
        }
        orbit
    }
}

impl Equivalence<Vector3<f64>> for SymmetryOracle {
    fn equivalent(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        self.are_equivalent(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::tests::{fcc, mgo};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lattice_systems() {
        let finder = SymmetryFinder::new();
        let cases = [
            (Lattice::cubic(4.0).unwrap(), LatticeSystem::Cubic),
            (
                Lattice::try_from_parameters(4., 4., 6., 90., 90., 90.).unwrap(),
                LatticeSystem::Tetragonal,
            ),
            (
                Lattice::try_from_parameters(3., 4., 5., 90., 90., 90.).unwrap(),
                LatticeSystem::Orthorhombic,
            ),
            (
                Lattice::try_from_parameters(3., 3., 5., 90., 90., 120.).unwrap(),
                LatticeSystem::Hexagonal,
            ),
            (
                Lattice::try_from_parameters(3., 4., 5., 90., 100., 90.).unwrap(),
                LatticeSystem::Monoclinic,
            ),
            (
                Lattice::try_from_parameters(3., 4., 5., 70., 80., 100.).unwrap(),
                LatticeSystem::Triclinic,
            ),
        ];
        for (lat, system) in cases {
            assert_eq!(finder.lattice_system(&lat, 1e-3), Ok(system));
        }
    }

    #[test]
    fn test_holohedry_from_point_group() {
        let lat = Lattice::try_from_parameters(3., 3., 5., 90., 90., 120.).unwrap();
        let rotations = SymmetryFinder.lattice_point_group(&lat, 1e-3);
        assert_eq!(rotations.len(), 24);
        assert_eq!(holohedry(&rotations, 1e-3), Ok(LatticeSystem::Hexagonal));
        assert!(matches!(
            holohedry(&rotations[..5], 1e-3),
            Err(SymmetryError::Undetermined { .. })
        ));
    }

    #[test]
    fn test_parse_overflow_rejected() {
        assert!(matches!(
            TabulatedSymmetry::from_triplets(&["x+2000, y, z"]),
            Err(SymmetryError::Parse(IsometryError::CoordParse(_)))
        ));
        assert!(matches!(
            TabulatedSymmetry::from_generators(&["2000000x, y, z"]),
            Err(SymmetryError::Parse(IsometryError::NotUnimodular(_)))
        ));
        // large but representable translations are lattice translations
        let tab = TabulatedSymmetry::from_triplets(&["x+1000, y, z"]).unwrap();
        assert_eq!(tab.isometries(), &[Isometry::identity()]);
    }

    #[test]
    fn test_mgo_operations() {
        let ops = SymmetryFinder.operations(&mgo(), 1e-3).unwrap();
        // Fm-3m in the conventional cell: 48 rotations times 4 centering translations
        assert_eq!(ops.len(), 192);
        assert_eq!(ops[0], SymmetryOperation::identity());
        assert!(ToleranceGroup {
            lattice: mgo().lattice(),
            tolerance: 1e-3
        }
        .is_closed(&ops));
    }

    #[test]
    fn test_deterministic() {
        let s = fcc(3.6, "Cu");
        assert_eq!(
            SymmetryFinder.operations(&s, 1e-3),
            SymmetryFinder.operations(&s, 1e-3)
        );
    }

    #[test]
    fn test_invalid_tolerance() {
        for tol in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SymmetryFinder.operations(&mgo(), tol),
                Err(SymmetryError::Undetermined { .. })
            ));
        }
    }

    #[test]
    fn test_oracle() {
        let s = mgo();
        let oracle = SymmetryOracle::new(&SymmetryFinder, &s, 1e-3, 1e-3).unwrap();
        let mg = s.sites()[0].frac;
        let o = s.sites()[4].frac;
        assert!(oracle.are_equivalent(&mg, &s.sites()[3].frac));
        assert!(!oracle.are_equivalent(&mg, &o));
        let tet = Vector3::new(0.25, 0.25, 0.25);
        assert_eq!(oracle.orbit_of(&tet).len(), 8);
        assert_eq!(oracle.orbit_of(&mg).len(), 4);
        assert!(!oracle.are_equivalent(&tet, &mg));
    }

    #[test]
    fn test_tabulated() {
        let s = mgo();
        let tab = TabulatedSymmetry::from_generators(&["-x, -y, -z", "-y, x, z", "z, x, y"])
            .unwrap();
        assert_eq!(tab.len(), 48);
        let ops = tab.operations(&s, 1e-3).unwrap();
        assert_eq!(ops.len(), 48);

        let bad = TabulatedSymmetry::from_triplets(&["x+1/4, y, z"]).unwrap();
        assert!(matches!(
            bad.operations(&s, 1e-3),
            Err(SymmetryError::Undetermined { .. })
        ));
        assert!(matches!(
            TabulatedSymmetry::from_triplets(&["x, y"]),
            Err(SymmetryError::Parse(_))
        ));
    }

    #[test]
    fn test_operation_algebra() {
        let a = SymmetryOperation::from(Isometry::from_str("-y+1/2, x, z+1/4").unwrap());
        let inv = a.inverse().unwrap();
        let f = Vector3::new(0.1, 0.2, 0.3);
        assert_relative_eq!(inv.apply(&a.apply(&f)), f, epsilon = 1e-12);
        assert_relative_eq!(a.compose(&inv).apply(&f), f, epsilon = 1e-12);
    }
}
