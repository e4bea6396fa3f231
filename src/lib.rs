//! Enumeration and analysis of symmetry-distinct point defects (vacancies and interstitials) in
//! periodic crystal structures.

// frac!(-1) gets expanded to frac!(-1 * Frac::DENOM). I don't want to change this.
#![allow(clippy::neg_multiply)]

#[macro_use]
extern crate uom;

pub mod algebra;
pub mod cavity;
pub mod config;
pub mod coordination;
pub mod defect;
pub mod element;
pub mod error;
pub mod frac;
pub mod interstitial;
pub mod isometry;
pub mod lattice;
pub mod orbit;
pub mod polyhedron;
pub mod report;
pub mod species;
pub mod structure;
pub mod symmetry;
pub mod units;
pub mod vacancy;
pub mod voronoi;

pub use cavity::{CavityDescriptor, CavityEngine, CavityOutcome};
pub use config::DefectConfig;
pub use coordination::{CoordinationPolicy, CoordinationShell};
pub use defect::{DefectKind, DefectSite, PointDefects};
pub use element::{ElementTable, PeriodicTable, PERIODIC_TABLE};
pub use error::{DefectError, Result};
pub use interstitial::Interstitial;
pub use lattice::Lattice;
pub use species::{Species, SpeciesOccupancy};
pub use structure::{Site, Structure};
pub use symmetry::{SymmetryFinder, SymmetryOperation, SymmetryService, TabulatedSymmetry};
pub use vacancy::Vacancy;
