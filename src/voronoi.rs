//! Voronoi and power (radical Voronoi) cells in a periodic structure. Interstitial candidates are
//! the vertices of the power tessellation: the points where three or more cells meet are locally
//! as far from the surrounding atomic spheres as possible.

use log::{debug, trace, warn};
use nalgebra::Vector3;

use crate::{
    element::{ElementError, ElementTable},
    lattice::{Lattice, PeriodicImage},
    polyhedron::{ConvexPolyhedron, Plane},
    structure::Structure,
};

/// How many times the search radius may double before a cell is accepted as is.
const MAX_RADIUS_DOUBLINGS: usize = 6;

/// Images closer than this to the center are the center itself, in angstroms.
const SELF_DISTANCE: f64 = 1e-8;

/// A cell around a point, with the neighbor images that were used to cut it. Face generators
/// index into `neighbors`.
#[derive(Debug, Clone)]
pub struct PeriodicCell {
    pub center: Vector3<f64>,
    pub polyhedron: ConvexPolyhedron,
    pub neighbors: Vec<PeriodicImage>,
    /// Whether every neighbor that could cut the cell was considered.
    pub complete: bool,
}

impl PeriodicCell {
    /// The neighbor images that contribute a face, with the face area.
    pub fn face_neighbors(&self) -> Vec<(&PeriodicImage, f64)> {
        self.polyhedron
            .generator_faces()
            .map(|(g, area)| (&self.neighbors[g], area))
            .collect()
    }
}

/// Builds the power cell of a point around the atoms of a periodic structure.
///
/// `center` is fractional and has weight `center_radius`; `radii` gives the radius of each point
/// in `points`. With all radii zero this is the ordinary Voronoi cell. If `exclude` names a
/// point, its image at the center is ignored, which is how a vacancy sees its surroundings.
pub fn periodic_cell(
    lattice: &Lattice,
    center: &Vector3<f64>,
    center_radius: f64,
    points: &[Vector3<f64>],
    radii: &[f64],
    exclude: Option<usize>,
) -> PeriodicCell {
    let rmax = radii.iter().copied().fold(center_radius, f64::max);
    let per_point = (lattice.volume_value() / points.len().max(1) as f64).cbrt();
    let mut radius = 2.0 * per_point + 2.0 * rmax;
    let center_cart = lattice.to_cartesian(&lattice.wrap(center));

    let mut doublings = 0;
    loop {
        let neighbors: Vec<PeriodicImage> = lattice
            .images_within(center, points, radius)
            .into_iter()
            .filter(|im| {
                !(im.distance <= SELF_DISTANCE && exclude.map_or(true, |ex| ex == im.index))
            })
            .collect();

        let mut polyhedron = ConvexPolyhedron::cube(&center_cart, radius);
        let mut reach = polyhedron.max_distance_from(&center_cart);
        for (g, nb) in neighbors.iter().enumerate() {
            // no plane from here on can come closer than this
            let closest_plane = nb.distance / 2.0 - rmax * rmax / (2.0 * nb.distance);
            if closest_plane > reach {
                break;
            }
            if let Some(plane) = Plane::radical(&center_cart, center_radius, &nb.cart, radii[nb.index])
            {
                if polyhedron.clip(&plane, g) {
                    reach = polyhedron.max_distance_from(&center_cart);
                }
            }
        }

        let unseen_plane = radius / 2.0 - rmax * rmax / (2.0 * radius);
        let complete = !polyhedron.touches_bounding_box() && reach < unseen_plane;
        if complete || doublings >= MAX_RADIUS_DOUBLINGS {
            if !complete {
                warn!(
                    "cell at {:?} still open after growing the search radius to {radius:.2} Å",
                    center.as_slice()
                );
            }
            return PeriodicCell {
                center: center_cart,
                polyhedron,
                neighbors,
                complete,
            };
        }
        trace!("growing cell search radius to {:.2} Å", 2.0 * radius);
        radius *= 2.0;
        doublings += 1;
    }
}

/// The radius each site is given in the power tessellation.
pub fn site_radii<T: ElementTable + ?Sized>(
    structure: &Structure,
    table: &T,
) -> Result<Vec<f64>, ElementError> {
    structure
        .sites()
        .iter()
        .map(|s| table.site_radius(&s.occupancy))
        .collect()
}

/// Vertices of the power tessellation of the structure, wrapped into the unit cell, without
/// duplicates and without points that coincide with an atom. Ordered by site, then by vertex
/// within each site's cell.
pub fn interstitial_candidates<T: ElementTable + ?Sized>(
    structure: &Structure,
    table: &T,
    position_tolerance: f64,
) -> Result<Vec<Vector3<f64>>, ElementError> {
    let lattice = structure.lattice();
    let points = structure.frac_coords();
    let radii = site_radii(structure, table)?;

    let mut candidates: Vec<Vector3<f64>> = vec![];
    for (i, p) in points.iter().enumerate() {
        let cell = periodic_cell(lattice, p, radii[i], &points, &radii, Some(i));
        for v in cell.polyhedron.vertices() {
            let f = lattice.wrap(&lattice.to_fractional(&v));
            let known = |q: &Vector3<f64>| lattice.same_position(q, &f, position_tolerance);
            if !candidates.iter().any(known) && !points.iter().any(known) {
                candidates.push(f);
            }
        }
    }
    debug!(
        "{}: {} power tessellation vertices",
        structure.formula(),
        candidates.len()
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::PeriodicTable;
    use crate::structure::tests::{fcc, mgo};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fcc_voronoi_cell() {
        let s = fcc(3.6, "Cu");
        let points = s.frac_coords();
        let cell = periodic_cell(s.lattice(), &points[0], 0.0, &points, &[0.0; 4], Some(0));
        assert!(cell.complete);
        // rhombic dodecahedron: a quarter of the cubic cell, 12 faces, 14 vertices
        assert_relative_eq!(cell.polyhedron.volume(), 3.6f64.powi(3) / 4.0, epsilon = 1e-8);
        assert_eq!(cell.polyhedron.faces().len(), 12);
        assert_eq!(cell.polyhedron.vertices().len(), 14);
        assert!(cell
            .face_neighbors()
            .iter()
            .all(|(nb, _)| (nb.distance - 3.6 / 2f64.sqrt()).abs() < 1e-9));
    }

    #[test]
    fn test_fcc_candidates() {
        let s = fcc(3.6, "Cu");
        let c = interstitial_candidates(&s, &PeriodicTable, 1e-3).unwrap();
        // 4 octahedral and 8 tetrahedral holes per conventional cell
        assert_eq!(c.len(), 12);
    }

    #[test]
    fn test_mgo_candidates() {
        let s = mgo();
        let c = interstitial_candidates(&s, &PeriodicTable, 1e-3).unwrap();
        // 8c tetrahedral holes plus 32f points pulled towards the smaller cation
        assert_eq!(c.len(), 40);
        assert!(c
            .iter()
            .any(|f| s.lattice().same_position(f, &Vector3::new(0.25, 0.25, 0.25), 1e-6)));
        for f in &c {
            assert!(f.iter().all(|x| (0.0..1.0).contains(x)));
        }
    }

    #[test]
    fn test_power_cells_fill_space() {
        let s = mgo();
        let points = s.frac_coords();
        let radii = site_radii(&s, &PeriodicTable).unwrap();
        let total: f64 = (0..points.len())
            .map(|i| {
                periodic_cell(s.lattice(), &points[i], radii[i], &points, &radii, Some(i))
                    .polyhedron
                    .volume()
            })
            .sum();
        assert_relative_eq!(total, s.lattice().volume_value(), max_relative = 1e-8);
    }
}
