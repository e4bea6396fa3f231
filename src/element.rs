//! Elemental data needed to analyze defects: nominal oxidation states and radii. The data lives in
//! a compile-time [`phf`] map, and is reached through the [`ElementTable`] trait so that callers
//! can supply their own values.

use std::fmt::Debug;

use phf::phf_map;
use thiserror::Error;

use crate::species::{Species, SpeciesOccupancy};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ElementError {
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),
}

/// Tabulated properties of a single element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    pub atomic_number: u8,
    /// The most common oxidation state.
    pub oxidation_state: i8,
    /// Shannon radius of the ion in its common state, six-coordinate, in angstroms.
    pub ionic_radius: f64,
    /// Empirical radius of the neutral atom, in angstroms.
    pub atomic_radius: f64,
}

const fn el(atomic_number: u8, oxidation_state: i8, ionic_radius: f64, atomic_radius: f64) -> ElementData {
    ElementData {
        atomic_number,
        oxidation_state,
        ionic_radius,
        atomic_radius,
    }
}

static ELEMENTS: phf::Map<&'static str, ElementData> = phf_map! {
    "H" => el(1, 1, 0.25, 0.25),
    "He" => el(2, 0, 1.20, 1.20),
    "Li" => el(3, 1, 0.76, 1.45),
    "Be" => el(4, 2, 0.45, 1.05),
    "B" => el(5, 3, 0.27, 0.85),
    "C" => el(6, 4, 0.16, 0.70),
    "N" => el(7, -3, 1.46, 0.65),
    "O" => el(8, -2, 1.40, 0.60),
    "F" => el(9, -1, 1.33, 0.50),
    "Ne" => el(10, 0, 1.54, 1.54),
    "Na" => el(11, 1, 1.02, 1.80),
    "Mg" => el(12, 2, 0.72, 1.50),
    "Al" => el(13, 3, 0.535, 1.25),
    "Si" => el(14, 4, 0.40, 1.10),
    "P" => el(15, 5, 0.38, 1.00),
    "S" => el(16, -2, 1.84, 1.00),
    "Cl" => el(17, -1, 1.81, 1.00),
    "Ar" => el(18, 0, 1.88, 1.88),
    "K" => el(19, 1, 1.38, 2.20),
    "Ca" => el(20, 2, 1.00, 1.80),
    "Sc" => el(21, 3, 0.745, 1.60),
    "Ti" => el(22, 4, 0.605, 1.40),
    "V" => el(23, 5, 0.54, 1.35),
    "Cr" => el(24, 3, 0.615, 1.40),
    "Mn" => el(25, 2, 0.83, 1.40),
    "Fe" => el(26, 3, 0.645, 1.40),
    "Co" => el(27, 2, 0.745, 1.35),
    "Ni" => el(28, 2, 0.69, 1.35),
    "Cu" => el(29, 2, 0.73, 1.35),
    "Zn" => el(30, 2, 0.74, 1.35),
    "Ga" => el(31, 3, 0.62, 1.30),
    "Ge" => el(32, 4, 0.53, 1.25),
    "As" => el(33, 5, 0.46, 1.15),
    "Se" => el(34, -2, 1.98, 1.15),
    "Br" => el(35, -1, 1.96, 1.15),
    "Kr" => el(36, 0, 2.02, 2.02),
    "Rb" => el(37, 1, 1.52, 2.35),
    "Sr" => el(38, 2, 1.18, 2.00),
    "Y" => el(39, 3, 0.90, 1.80),
    "Zr" => el(40, 4, 0.72, 1.55),
    "Nb" => el(41, 5, 0.64, 1.45),
    "Mo" => el(42, 6, 0.59, 1.45),
    "Ru" => el(44, 4, 0.62, 1.30),
    "Rh" => el(45, 3, 0.665, 1.35),
    "Pd" => el(46, 2, 0.86, 1.40),
    "Ag" => el(47, 1, 1.15, 1.60),
    "Cd" => el(48, 2, 0.95, 1.55),
    "In" => el(49, 3, 0.80, 1.55),
    "Sn" => el(50, 4, 0.69, 1.45),
    "Sb" => el(51, 3, 0.76, 1.45),
    "Te" => el(52, -2, 2.21, 1.40),
    "I" => el(53, -1, 2.20, 1.40),
    "Xe" => el(54, 0, 2.16, 2.16),
    "Cs" => el(55, 1, 1.67, 2.60),
    "Ba" => el(56, 2, 1.35, 2.15),
    "La" => el(57, 3, 1.032, 1.95),
    "Ce" => el(58, 4, 0.87, 1.85),
    "Nd" => el(60, 3, 0.983, 1.85),
    "Gd" => el(64, 3, 0.938, 1.80),
    "Hf" => el(72, 4, 0.71, 1.55),
    "Ta" => el(73, 5, 0.64, 1.45),
    "W" => el(74, 6, 0.60, 1.35),
    "Ir" => el(77, 4, 0.625, 1.35),
    "Pt" => el(78, 2, 0.80, 1.35),
    "Au" => el(79, 1, 1.37, 1.35),
    "Hg" => el(80, 2, 1.02, 1.50),
    "Tl" => el(81, 1, 1.50, 1.90),
    "Pb" => el(82, 2, 1.19, 1.80),
    "Bi" => el(83, 3, 1.03, 1.60),
    "U" => el(92, 4, 0.89, 1.75),
};

/// A source of elemental data. Unknown symbols are an error, never a silent zero.
pub trait ElementTable: Debug + Send + Sync {
    /// The element's usual oxidation state.
    fn nominal_oxidation_state(&self, symbol: &str) -> Result<i8, ElementError>;

    /// The radius of the element in the given oxidation state, in angstroms.
    fn radius(&self, symbol: &str, oxidation: i8) -> Result<f64, ElementError>;

    /// The charge of a species: its explicit oxidation state if it has one, otherwise the
    /// element's nominal state.
    fn species_charge(&self, species: &Species) -> Result<i8, ElementError> {
        match species.oxidation_state {
            Some(ox) => {
                // still reject symbols the table doesn't know
                self.nominal_oxidation_state(&species.element)?;
                Ok(ox)
            }
            None => self.nominal_oxidation_state(&species.element),
        }
    }

    /// The radius of a species, in its explicit or nominal oxidation state.
    fn species_radius(&self, species: &Species) -> Result<f64, ElementError> {
        let ox = self.species_charge(species)?;
        self.radius(&species.element, ox)
    }

    /// Occupancy-weighted charge of a site.
    fn site_charge(&self, occupancy: &SpeciesOccupancy) -> Result<f64, ElementError> {
        occupancy.iter().try_fold(0.0, |acc, (sp, occ)| {
            Ok(acc + occ * f64::from(self.species_charge(sp)?))
        })
    }

    /// The largest radius among the species on a site. Partially occupied sites are as large as
    /// their largest possible occupant.
    fn site_radius(&self, occupancy: &SpeciesOccupancy) -> Result<f64, ElementError> {
        occupancy.iter().try_fold(0.0f64, |acc, (sp, _occ)| {
            Ok(acc.max(self.species_radius(sp)?))
        })
    }
}

/// The built-in periodic table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicTable;

pub static PERIODIC_TABLE: PeriodicTable = PeriodicTable;

impl PeriodicTable {
    /// Looks up the raw data for an element.
    pub fn data(&self, symbol: &str) -> Result<&'static ElementData, ElementError> {
        ELEMENTS
            .get(symbol)
            .ok_or_else(|| ElementError::UnknownSpecies(symbol.to_owned()))
    }
}

impl ElementTable for PeriodicTable {
    fn nominal_oxidation_state(&self, symbol: &str) -> Result<i8, ElementError> {
        Ok(self.data(symbol)?.oxidation_state)
    }

    /// Ions use their ionic radius, neutral atoms their atomic radius.
    fn radius(&self, symbol: &str, oxidation: i8) -> Result<f64, ElementError> {
        let data = self.data(symbol)?;
        Ok(if oxidation != 0 {
            data.ionic_radius
        } else {
            data.atomic_radius
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup() {
        let table = PeriodicTable;
        assert_eq!(table.nominal_oxidation_state("Mg"), Ok(2));
        assert_eq!(table.nominal_oxidation_state("O"), Ok(-2));
        assert_eq!(table.data("Cu").unwrap().atomic_number, 29);
        assert_relative_eq!(table.radius("O", -2).unwrap(), 1.40);
        assert_relative_eq!(table.radius("O", 0).unwrap(), 0.60);
    }

    #[test]
    fn test_unknown() {
        let table = PeriodicTable;
        assert_eq!(
            table.nominal_oxidation_state("Xx"),
            Err(ElementError::UnknownSpecies("Xx".to_owned()))
        );
        assert!(table
            .species_charge(&Species::new("Xx", Some(2)))
            .is_err());
    }

    #[test]
    fn test_species_charge() {
        let table = PeriodicTable;
        assert_eq!(table.species_charge(&"Fe2+".parse().unwrap()), Ok(2));
        assert_eq!(table.species_charge(&"Fe".parse().unwrap()), Ok(3));
        let mixed: SpeciesOccupancy = [
            (Species::new("Fe", Some(2)), 0.5),
            (Species::new("Mg", Some(2)), 0.25),
        ]
        .into_iter()
        .collect();
        assert_relative_eq!(table.site_charge(&mixed).unwrap(), 1.5);
    }

    #[test]
    fn test_table_consistency() {
        for (sym, data) in ELEMENTS.entries() {
            assert!(data.atomic_number > 0, "{sym}");
            assert!(data.ionic_radius > 0.0 && data.atomic_radius > 0.0, "{sym}");
        }
    }
}
