use thiserror::Error;

use crate::{
    config::ConfigError, element::ElementError, lattice::LatticeError,
    structure::StructureError, symmetry::SymmetryError,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DefectError {
    #[error("Defect site index {index} out of range for {count} sites")]
    InvalidIndex { index: usize, count: usize },
    #[error(transparent)]
    SymmetryUndetermined(#[from] SymmetryError),
    #[error(transparent)]
    UnknownSpecies(#[from] ElementError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, DefectError>;
