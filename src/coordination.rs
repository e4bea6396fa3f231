//! Coordination shells: which atoms surround a point, and what charges they carry.

use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::{
    element::{ElementError, ElementTable},
    lattice::PeriodicImage,
    structure::Structure,
    voronoi::periodic_cell,
};

/// Neighbors within this distance of the shell boundary are kept together, in angstroms.
pub const TIE_TOLERANCE: f64 = 1e-6;

const SELF_DISTANCE: f64 = 1e-8;

/// How many times the search radius may double while looking for a nearest neighbor.
const MAX_SEARCH_DOUBLINGS: usize = 8;

/// Which neighbors belong to the coordination shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinationPolicy {
    /// Every neighbor within `radius` angstroms.
    Cutoff { radius: f64 },
    /// Every neighbor within `factor` times the nearest-neighbor distance.
    RelativeNearest { factor: f64 },
    /// Every neighbor whose Voronoi face has at least `min_area_fraction` of the largest face's
    /// area.
    VoronoiFace { min_area_fraction: f64 },
}

impl Default for CoordinationPolicy {
    fn default() -> Self {
        Self::RelativeNearest { factor: 1.1 }
    }
}

/// One coordinating atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub site_index: usize,
    /// Cartesian position of the image that coordinates.
    pub cart: Vector3<f64>,
    pub distance: f64,
    /// Occupancy-weighted nominal charge of the site.
    pub charge: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinationShell {
    neighbors: Vec<Neighbor>,
    element_counts: BTreeMap<String, f64>,
}

impl CoordinationShell {
    /// Neighbors ordered by distance, then site index.
    pub fn neighbors(&self) -> &[Neighbor] {
        &self.neighbors
    }

    pub fn element_counts(&self) -> &BTreeMap<String, f64> {
        &self.element_counts
    }

    /// The sum of the element counts. Integral for fully ordered structures.
    pub fn coordination_number(&self) -> f64 {
        self.element_counts.values().sum()
    }

    /// Sorted, distinct element symbols in the shell.
    pub fn coordinated_elements(&self) -> Vec<String> {
        self.element_counts.keys().cloned().collect()
    }

    /// Structure site index of each neighbor, in neighbor order. A site appears once per
    /// coordinating image.
    pub fn coordinated_sites(&self) -> Vec<usize> {
        self.neighbors.iter().map(|n| n.site_index).collect()
    }

    pub fn charge_sum(&self) -> f64 {
        self.neighbors.iter().map(|n| n.charge).sum()
    }

    /// `None` for an empty shell.
    pub fn min_max_charge(&self) -> Option<(f64, f64)> {
        self.neighbors.iter().map(|n| n.charge).fold(None, |acc, c| {
            Some(match acc {
                None => (c, c),
                Some((lo, hi)) => (f64::min(lo, c), f64::max(hi, c)),
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }
}

fn is_self_image(im: &PeriodicImage, exclude: Option<usize>) -> bool {
    im.distance <= SELF_DISTANCE && exclude == Some(im.index)
}

fn images_excluding(
    structure: &Structure,
    position: &Vector3<f64>,
    exclude: Option<usize>,
    radius: f64,
) -> Vec<PeriodicImage> {
    structure
        .lattice()
        .images_within(position, &structure.frac_coords(), radius)
        .into_iter()
        .filter(|im| !is_self_image(im, exclude))
        .collect()
}

/// Neighbor images of a fractional position under a coordination policy. `exclude` removes the
/// image of that site sitting at the position itself.
pub fn shell_images(
    structure: &Structure,
    position: &Vector3<f64>,
    exclude: Option<usize>,
    policy: &CoordinationPolicy,
) -> Vec<PeriodicImage> {
    let lattice = structure.lattice();
    match *policy {
        CoordinationPolicy::Cutoff { radius } => {
            images_excluding(structure, position, exclude, radius + TIE_TOLERANCE)
        }
        CoordinationPolicy::RelativeNearest { factor } => {
            let mut radius = 2.0 * (lattice.volume_value() / structure.len() as f64).cbrt();
            for _ in 0..=MAX_SEARCH_DOUBLINGS {
                let images = images_excluding(structure, position, exclude, radius);
                if let Some(nearest) = images.first() {
                    let cutoff = factor * nearest.distance + TIE_TOLERANCE;
                    return if cutoff <= radius {
                        images.into_iter().filter(|im| im.distance <= cutoff).collect()
                    } else {
                        images_excluding(structure, position, exclude, cutoff)
                    };
                }
                radius *= 2.0;
            }
            vec![]
        }
        CoordinationPolicy::VoronoiFace { min_area_fraction } => {
            let points = structure.frac_coords();
            let zeros = vec![0.0; points.len()];
            let cell = periodic_cell(lattice, position, 0.0, &points, &zeros, exclude);
            let faces = cell.face_neighbors();
            let max_area = faces.iter().map(|(_, a)| *a).fold(0.0, f64::max);
            let mut images: Vec<PeriodicImage> = faces
                .into_iter()
                .filter(|(_, a)| *a > 0.0 && *a >= min_area_fraction * max_area)
                .map(|(im, _)| im.clone())
                .collect();
            images.sort_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then(a.index.cmp(&b.index))
                    .then_with(|| a.shift.as_slice().cmp(b.shift.as_slice()))
            });
            images
        }
    }
}

/// The coordination shell around a fractional position.
pub fn shell_of<T: ElementTable + ?Sized>(
    position: &Vector3<f64>,
    exclude: Option<usize>,
    structure: &Structure,
    table: &T,
    policy: &CoordinationPolicy,
) -> Result<CoordinationShell, ElementError> {
    let mut neighbors = vec![];
    let mut element_counts = BTreeMap::new();
    for im in shell_images(structure, position, exclude, policy) {
        let occupancy = &structure.sites()[im.index].occupancy;
        for (sp, occ) in occupancy.iter() {
            *element_counts.entry(sp.element.clone()).or_insert(0.0) += occ;
        }
        neighbors.push(Neighbor {
            site_index: im.index,
            cart: im.cart,
            distance: im.distance,
            charge: table.site_charge(occupancy)?,
        });
    }
    Ok(CoordinationShell {
        neighbors,
        element_counts,
    })
}
