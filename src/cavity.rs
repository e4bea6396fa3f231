//! Geometry of the space a defect occupies. A vacancy leaves a polyhedral cavity bounded by its
//! coordination shell; an interstitial position has an empty sphere around it.
//!
//! Degenerate geometry is not an error: the descriptor falls back to zero, a warning is logged,
//! and [`CavityOutcome::degenerate`] is set.

use log::warn;
use nalgebra::Vector3;

use crate::{
    coordination::CoordinationShell,
    element::{ElementError, ElementTable},
    polyhedron::{ConvexPolyhedron, Plane},
    structure::Structure,
    units::{angstrom, cubic_angstrom, square_angstrom, Area, Length, Volume},
    voronoi::site_radii,
};

const MAX_SEARCH_DOUBLINGS: usize = 8;

/// Which cavity computation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CavityEngine {
    #[default]
    Precise,
    /// Reports zero for every cavity. Useful when only coordination matters.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CavityDescriptor {
    /// The Voronoi cell of a vacancy within its coordination shell.
    Polyhedron { volume: f64, surface_area: f64 },
    /// The largest sphere around an interstitial position that overlaps no atom.
    EmptySphere { radius: f64 },
}

impl CavityDescriptor {
    /// In cubic angstroms. Zero for an empty sphere descriptor.
    pub fn volume(&self) -> f64 {
        match *self {
            CavityDescriptor::Polyhedron { volume, .. } => volume,
            CavityDescriptor::EmptySphere { .. } => 0.0,
        }
    }

    /// In square angstroms. Zero for an empty sphere descriptor.
    pub fn surface_area(&self) -> f64 {
        match *self {
            CavityDescriptor::Polyhedron { surface_area, .. } => surface_area,
            CavityDescriptor::EmptySphere { .. } => 0.0,
        }
    }

    /// In angstroms. Zero for a polyhedron descriptor.
    pub fn radius(&self) -> f64 {
        match *self {
            CavityDescriptor::EmptySphere { radius } => radius,
            CavityDescriptor::Polyhedron { .. } => 0.0,
        }
    }

    pub fn volume_quantity(&self) -> Volume {
        Volume::new::<cubic_angstrom>(self.volume())
    }

    pub fn surface_area_quantity(&self) -> Area {
        Area::new::<square_angstrom>(self.surface_area())
    }

    pub fn radius_quantity(&self) -> Length {
        Length::new::<angstrom>(self.radius())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CavityOutcome {
    pub descriptor: CavityDescriptor,
    /// Set when the geometry could not be computed and the descriptor holds the zero fallback.
    pub degenerate: bool,
}

impl CavityOutcome {
    fn exact(descriptor: CavityDescriptor) -> Self {
        Self {
            descriptor,
            degenerate: false,
        }
    }

    fn degenerate(descriptor: CavityDescriptor) -> Self {
        Self {
            descriptor,
            degenerate: true,
        }
    }
}

const EMPTY_POLYHEDRON: CavityDescriptor = CavityDescriptor::Polyhedron {
    volume: 0.0,
    surface_area: 0.0,
};

const EMPTY_SPHERE: CavityDescriptor = CavityDescriptor::EmptySphere { radius: 0.0 };

/// The Voronoi cell of `center` with the shell's neighbors as the only other generators.
pub fn shell_cell(center: &Vector3<f64>, shell: &CoordinationShell) -> ConvexPolyhedron {
    let reach = shell
        .neighbors()
        .iter()
        .map(|n| n.distance)
        .fold(0.0, f64::max);
    let mut cell = ConvexPolyhedron::cube(center, 2.0 * reach.max(1.0));
    for (g, n) in shell.neighbors().iter().enumerate() {
        if let Some(plane) = Plane::from_opposite_points(center, &n.cart) {
            cell.clip(&plane, g);
        }
    }
    cell
}

impl CavityEngine {
    /// The polyhedral cavity of a vacancy at Cartesian position `center`.
    pub fn vacancy_cavity(&self, center: &Vector3<f64>, shell: &CoordinationShell) -> CavityOutcome {
        if *self == CavityEngine::Placeholder {
            warn!("placeholder cavity engine: reporting zero vacancy volume and area");
            return CavityOutcome::exact(EMPTY_POLYHEDRON);
        }
        if shell.len() < 4 {
            warn!(
                "vacancy at {:?} has only {} neighbors, cavity is not enclosed",
                center.as_slice(),
                shell.len()
            );
            return CavityOutcome::degenerate(EMPTY_POLYHEDRON);
        }
        let cell = shell_cell(center, shell);
        let (volume, surface_area) = (cell.volume(), cell.surface_area());
        if cell.is_empty()
            || cell.touches_bounding_box()
            || !(volume.is_finite() && surface_area.is_finite())
        {
            warn!(
                "vacancy at {:?}: coordination shell does not enclose a finite cavity",
                center.as_slice()
            );
            return CavityOutcome::degenerate(EMPTY_POLYHEDRON);
        }
        CavityOutcome::exact(CavityDescriptor::Polyhedron {
            volume: volume.max(0.0),
            surface_area: surface_area.max(0.0),
        })
    }

    /// The empty sphere at fractional position `position`: the distance to the nearest atomic
    /// surface, or zero if the position is inside an atom.
    pub fn interstitial_cavity<T: ElementTable + ?Sized>(
        &self,
        structure: &Structure,
        position: &Vector3<f64>,
        table: &T,
    ) -> Result<CavityOutcome, ElementError> {
        let radii = site_radii(structure, table)?;
        if *self == CavityEngine::Placeholder {
            warn!("placeholder cavity engine: reporting zero interstitial radius");
            return Ok(CavityOutcome::exact(EMPTY_SPHERE));
        }
        let lattice = structure.lattice();
        let points = structure.frac_coords();
        let rmax = radii.iter().copied().fold(0.0, f64::max);
        let mut radius = 2.0 * (lattice.volume_value() / points.len() as f64).cbrt() + rmax;
        for _ in 0..=MAX_SEARCH_DOUBLINGS {
            let best = lattice
                .images_within(position, &points, radius)
                .iter()
                .map(|im| im.distance - radii[im.index])
                .fold(f64::INFINITY, f64::min);
            // atoms further out than the search radius cannot do better
            if best < radius - rmax {
                return Ok(CavityOutcome::exact(CavityDescriptor::EmptySphere {
                    radius: best.max(0.0),
                }));
            }
            radius *= 2.0;
        }
        warn!(
            "no atom found near {:?}, empty sphere is unbounded",
            position.as_slice()
        );
        Ok(CavityOutcome::degenerate(EMPTY_SPHERE))
    }
}
