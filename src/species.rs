//! Chemical species and site occupancies. A species is an element with an optional explicit
//! oxidation state, written the usual way: `Mg`, `Mg2+`, `O2-`, `Cl-`, `Fe3+`.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use nom::{
    character::complete::{digit1, one_of, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::many0_count,
    sequence::{pair, tuple},
    IResult,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpeciesError {
    #[error("Cannot parse species: {0:?}")]
    Parse(String),
}

/// An element symbol with an optional explicit oxidation state. When present, the explicit state
/// overrides the nominal one from the element table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Species {
    pub element: String,
    pub oxidation_state: Option<i8>,
}

impl Species {
    pub fn new(element: impl Into<String>, oxidation_state: Option<i8>) -> Self {
        Self {
            element: element.into(),
            oxidation_state,
        }
    }

    /// A species with no explicit oxidation state.
    pub fn element(element: impl Into<String>) -> Self {
        Self::new(element, None)
    }
}

fn symbol(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_uppercase()),
        many0_count(satisfy(|c| c.is_ascii_lowercase())),
    ))(input)
}

/// `2+`, `3-`, `+`, `-`.
fn charge(input: &str) -> IResult<&str, i8> {
    map(
        tuple((opt(map_res(digit1, i8::from_str)), one_of("+-"))),
        |(n, s)| {
            let n = n.unwrap_or(1);
            if s == '-' {
                -n
            } else {
                n
            }
        },
    )(input)
}

fn species(input: &str) -> IResult<&str, Species> {
    map(all_consuming(pair(symbol, opt(charge))), |(el, ox)| {
        Species::new(el, ox)
    })(input)
}

impl FromStr for Species {
    type Err = SpeciesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        species(s.trim())
            .map(|(_, sp)| sp)
            .map_err(|_e| SpeciesError::Parse(s.to_owned()))
    }
}

impl Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.element)?;
        match self.oxidation_state {
            None => Ok(()),
            Some(0) => write!(f, "0+"),
            Some(n) if n.abs() == 1 => write!(f, "{}", if n > 0 { '+' } else { '-' }),
            Some(n) => write!(f, "{}{}", n.abs(), if n > 0 { '+' } else { '-' }),
        }
    }
}

/// Occupancies that agree within this tolerance are considered identical.
pub const OCCUPANCY_TOLERANCE: f64 = 1e-6;

/// The species present on a site and their fractional occupancies. Ordered so that two
/// occupancies can be compared and printed deterministically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeciesOccupancy(BTreeMap<Species, f64>);

impl SpeciesOccupancy {
    pub fn new(map: BTreeMap<Species, f64>) -> Self {
        Self(map)
    }

    /// A fully occupied site with a single species.
    pub fn single(sp: Species) -> Self {
        Self(BTreeMap::from([(sp, 1.0)]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Species, f64)> {
        self.0.iter().map(|(sp, &occ)| (sp, occ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total occupancy of the site.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// The distinct element symbols on the site.
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|sp| sp.element.as_str())
    }

    /// Same species with the same fractions, within [`OCCUPANCY_TOLERANCE`].
    pub fn matches(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|((s1, o1), (s2, o2))| s1 == s2 && (o1 - o2).abs() <= OCCUPANCY_TOLERANCE)
    }
}

impl FromStr for SpeciesOccupancy {
    type Err = SpeciesError;

    /// A single species symbol at full occupancy, e.g. `"O2-"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self::single)
    }
}

impl From<Species> for SpeciesOccupancy {
    fn from(sp: Species) -> Self {
        Self::single(sp)
    }
}

impl FromIterator<(Species, f64)> for SpeciesOccupancy {
    fn from_iter<T: IntoIterator<Item = (Species, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for SpeciesOccupancy {
    /// `O2-` for a fully occupied single species, `Fe2+:0.5 Mg2+:0.5` otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let [(sp, occ)] = self.0.iter().collect::<Vec<_>>()[..] {
            if (occ - 1.0).abs() <= OCCUPANCY_TOLERANCE {
                return write!(f, "{sp}");
            }
        }
        let parts: Vec<String> = self.iter().map(|(sp, occ)| format!("{sp}:{occ}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}
