#![allow(dead_code)]

use pointdefects::{Lattice, Structure};

const FCC: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.0, 0.5, 0.5],
    [0.5, 0.0, 0.5],
    [0.5, 0.5, 0.0],
];

/// Conventional rock-salt cell, cations first.
pub fn rock_salt(a: f64, cation: &str, anion: &str) -> Structure {
    let mut species = vec![cation; 4];
    species.extend([anion; 4]);
    let mut coords = FCC.to_vec();
    coords.extend(FCC.map(|[x, y, z]| [(x + 0.5) % 1.0, y, z]));
    Structure::from_species(Lattice::cubic(a).unwrap(), &species, &coords).unwrap()
}

pub fn mgo() -> Structure {
    rock_salt(4.212, "Mg2+", "O2-")
}

pub fn fcc(a: f64, el: &str) -> Structure {
    Structure::from_species(Lattice::cubic(a).unwrap(), &[el; 4], &FCC).unwrap()
}

/// Two-atom hexagonal close-packed cell.
pub fn hcp(a: f64, c: f64, el: &str) -> Structure {
    let lattice = Lattice::try_from_parameters(a, a, c, 90.0, 90.0, 120.0).unwrap();
    Structure::from_species(
        lattice,
        &[el; 2],
        &[[1. / 3., 2. / 3., 0.25], [2. / 3., 1. / 3., 0.75]],
    )
    .unwrap()
}

/// The generators of Fm-3m in the conventional cell.
pub const FM3M_GENERATORS: [&str; 7] = [
    "-x, -y, z",
    "-x, y, -z",
    "z, x, y",
    "y, x, -z",
    "-x, -y, -z",
    "x, y+1/2, z+1/2",
    "x+1/2, y, z+1/2",
];
