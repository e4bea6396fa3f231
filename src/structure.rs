//! Periodic crystal structures: a lattice and an ordered list of sites. A [`Structure`] is
//! validated on construction and never changes afterwards; everything that analyzes defects only
//! borrows it.

use std::{collections::BTreeMap, fmt::Display};

use nalgebra::Vector3;
use thiserror::Error;

use crate::{
    lattice::{Lattice, LatticeError},
    species::{SpeciesError, SpeciesOccupancy, OCCUPANCY_TOLERANCE},
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("A structure needs at least one site")]
    Empty,
    #[error("Got {species} species for {coords} coordinates")]
    LengthMismatch { species: usize, coords: usize },
    #[error("Invalid occupancy on site {site}: {occupancy}")]
    InvalidOccupancy { site: usize, occupancy: String },
    #[error("Non-finite coordinates on site {0}")]
    NonFinite(usize),
    #[error(transparent)]
    Species(#[from] SpeciesError),
    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

/// A single site: a fractional position and what sits there.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub frac: Vector3<f64>,
    pub occupancy: SpeciesOccupancy,
}

impl Site {
    pub fn new(frac: Vector3<f64>, occupancy: SpeciesOccupancy) -> Self {
        Self { frac, occupancy }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    lattice: Lattice,
    sites: Vec<Site>,
}

impl Structure {
    /// Validates and builds a structure. Occupancy fractions must be positive and sum to at most
    /// one per site.
    pub fn new(lattice: Lattice, sites: Vec<Site>) -> Result<Self, StructureError> {
        if sites.is_empty() {
            return Err(StructureError::Empty);
        }
        for (i, site) in sites.iter().enumerate() {
            if !site.frac.iter().all(|x| x.is_finite()) {
                return Err(StructureError::NonFinite(i));
            }
            let valid = !site.occupancy.is_empty()
                && site.occupancy.iter().all(|(_, o)| o.is_finite() && o > 0.0)
                && site.occupancy.total() <= 1.0 + OCCUPANCY_TOLERANCE;
            if !valid {
                return Err(StructureError::InvalidOccupancy {
                    site: i,
                    occupancy: site.occupancy.to_string(),
                });
            }
        }
        Ok(Self { lattice, sites })
    }

    /// Builds an ordered structure from species symbols (`"Mg2+"`, `"O"`) and fractional
    /// coordinates.
    pub fn from_species<S: AsRef<str>>(
        lattice: Lattice,
        species: &[S],
        coords: &[[f64; 3]],
    ) -> Result<Self, StructureError> {
        if species.len() != coords.len() {
            return Err(StructureError::LengthMismatch {
                species: species.len(),
                coords: coords.len(),
            });
        }
        let sites = species
            .iter()
            .zip(coords)
            .map(|(sp, &c)| Ok(Site::new(Vector3::from(c), sp.as_ref().parse()?)))
            .collect::<Result<Vec<_>, StructureError>>()?;
        Self::new(lattice, sites)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, i: usize) -> Option<&Site> {
        self.sites.get(i)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Fractional coordinates of every site, in order.
    pub fn frac_coords(&self) -> Vec<Vector3<f64>> {
        self.sites.iter().map(|s| s.frac).collect()
    }

    /// Cartesian coordinates of site `i`.
    pub fn cart_coords(&self, i: usize) -> Option<Vector3<f64>> {
        self.site(i).map(|s| self.lattice.to_cartesian(&s.frac))
    }

    /// Number of atoms of each element per cell, weighted by occupancy.
    pub fn element_amounts(&self) -> BTreeMap<String, f64> {
        let mut amounts = BTreeMap::new();
        for site in &self.sites {
            for (sp, occ) in site.occupancy.iter() {
                *amounts.entry(sp.element.clone()).or_insert(0.0) += occ;
            }
        }
        amounts
    }

    /// The distinct element symbols in the structure, sorted.
    pub fn composition(&self) -> Vec<String> {
        self.element_amounts().into_keys().collect()
    }

    /// The cell formula, e.g. `Mg4 O4`.
    pub fn formula(&self) -> String {
        self.element_amounts()
            .into_iter()
            .map(|(el, n)| {
                if (n - n.round()).abs() < OCCUPANCY_TOLERANCE {
                    format!("{el}{}", n.round())
                } else {
                    format!("{el}{n:.3}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({} sites)", self.formula(), self.len())?;
        for (i, site) in self.sites.iter().enumerate() {
            writeln!(
                f,
                "{i:>4} {:<12} {:>8.5} {:>8.5} {:>8.5}",
                site.occupancy.to_string(),
                site.frac.x,
                site.frac.y,
                site.frac.z
            )?;
        }
        Ok(())
    }
}
