//! Exact symmetry operations in fractional coordinates, as written in symmetry tables: an integer
//! rotation matrix and a rational translation. These are parsed from triplets such as
//! `-y+1/2, x, z+1/4` and kept exact so that composing them never drifts.

use std::{fmt::Display, ops::Mul, str::FromStr};

use nalgebra::{Matrix3, Vector3};
use nom::{
    branch::alt,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use num_traits::Zero;
use thiserror::Error;

use crate::frac::Frac;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IsometryError {
    #[error("Cannot parse coordinate triplet: {0}")]
    CoordParse(String),
    #[error("Rotation part is not unimodular: {0}")]
    NotUnimodular(Matrix3<i32>),
}

/// A symmetry operation in fractional coordinates: x ↦ Rx + τ, with τ always reduced into [0, 1).
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct Isometry {
    rot: Matrix3<i32>,
    tau: Vector3<Frac>,
}

/// `m[r0][c0]·m[r1][c1] − m[r0][c1]·m[r1][c0]`, or `None` on overflow.
fn minor(m: &Matrix3<i32>, (r0, r1): (usize, usize), (c0, c1): (usize, usize)) -> Option<i32> {
    m[(r0, c0)]
        .checked_mul(m[(r1, c1)])?
        .checked_sub(m[(r0, c1)].checked_mul(m[(r1, c0)])?)
}

/// Determinant of an integer matrix, computed exactly. `None` if it does not fit in an `i32`.
pub fn int_determinant(m: &Matrix3<i32>) -> Option<i32> {
    m[(0, 0)]
        .checked_mul(minor(m, (1, 2), (1, 2))?)?
        .checked_sub(m[(0, 1)].checked_mul(minor(m, (1, 2), (0, 2))?)?)?
        .checked_add(m[(0, 2)].checked_mul(minor(m, (1, 2), (0, 1))?)?)
}

/// Whether `m` has determinant ±1.
pub fn is_unimodular(m: &Matrix3<i32>) -> bool {
    matches!(int_determinant(m), Some(1 | -1))
}

/// Inverse of an integer matrix with determinant ±1, which is again an integer matrix.
pub fn int_inverse(m: &Matrix3<i32>) -> Option<Matrix3<i32>> {
    let det = int_determinant(m)?;
    if det.abs() != 1 {
        return None;
    }
    // adjugate / det, with det = ±1
    let others = |k: usize| match k {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let mut inv = Matrix3::zeros();
    for i in 0..3 {
        for j in 0..3 {
            let cof = minor(m, others(j), others(i))?;
            let cof = if (i + j) % 2 == 0 { cof } else { cof.checked_neg()? };
            inv[(i, j)] = cof.checked_mul(det)?;
        }
    }
    Some(inv)
}

/// Rτ, reduced modulo one.
fn rotate_frac(rot: &Matrix3<i32>, v: &Vector3<Frac>) -> Vector3<Frac> {
    Vector3::from_fn(|i, _| {
        let row = [rot[(i, 0)], rot[(i, 1)], rot[(i, 2)]];
        Frac::dot_modulo_one(&row, v.as_slice())
    })
}

impl Isometry {
    /// Creates a new operation from rotation and translation components. The rotation must have
    /// determinant ±1. The translation is reduced into [0, 1).
    pub fn new_rot_tau(rot: Matrix3<i32>, tau: Vector3<Frac>) -> Result<Self, IsometryError> {
        if !is_unimodular(&rot) {
            return Err(IsometryError::NotUnimodular(rot));
        }
        Ok(Self {
            rot,
            tau: tau.map(|t| t.modulo_one()),
        })
    }

    /// Creates a new identity symmetry operation.
    pub fn identity() -> Self {
        Self {
            rot: Matrix3::identity(),
            tau: Vector3::from_element(Frac::ZERO),
        }
    }

    /// Returns the rotation matrix.
    pub fn rot(&self) -> Matrix3<i32> {
        self.rot
    }

    /// Returns the translation vector.
    pub fn tau(&self) -> Vector3<Frac> {
        self.tau
    }

    /// The inverse operation: x ↦ R⁻¹x − R⁻¹τ.
    pub fn inv(&self) -> Self {
        // new_rot_tau guarantees |det| = 1
        let rot = int_inverse(&self.rot).unwrap_or_else(Matrix3::identity);
        let tau = rotate_frac(&rot, &self.tau.map(|t| -t));
        Self { rot, tau }
    }

    /// Applies the operation to a fractional position.
    pub fn transform(&self, f: &Vector3<f64>) -> Vector3<f64> {
        self.rot.map(f64::from) * f + self.tau.map(f64::from)
    }
}

impl Mul for Isometry {
    type Output = Self;

    /// `a * b` is "do b, then do a".
    fn mul(self, rhs: Isometry) -> Self::Output {
        Self {
            rot: self.rot * rhs.rot,
            tau: rotate_frac(&self.rot, &rhs.tau).zip_map(&self.tau, |a, b| (a + b).modulo_one()),
        }
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// One of x, y, z, as a column index.
fn axis(input: &str) -> IResult<&str, usize> {
    map(one_of("xyzXYZ"), |c| match c.to_ascii_lowercase() {
        'x' => 0,
        'y' => 1,
        _ => 2,
    })(input)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Term {
    Axis(i32, usize),
    Constant(Frac),
}

impl Term {
    fn negate(self) -> Self {
        match self {
            Term::Axis(k, i) => Term::Axis(-k, i),
            Term::Constant(f) => Term::Constant(-f),
        }
    }
}

/// `x`, `2y`, `2*z`, `1/2`, `0.25`.
fn term(input: &str) -> IResult<&str, Term> {
    alt((
        map(
            pair(
                opt(terminated(
                    map_res(digit1, i32::from_str),
                    opt(ws(char('*'))),
                )),
                axis,
            ),
            |(k, i)| Term::Axis(k.unwrap_or(1), i),
        ),
        map_res(
            recognize(pair(digit1, opt(pair(one_of("/."), digit1)))),
            |s: &str| Frac::from_str(s).map(Term::Constant),
        ),
    ))(input)
}

fn sign(input: &str) -> IResult<&str, bool> {
    map(ws(one_of("+-")), |c| c == '-')(input)
}

fn signed_term(input: &str) -> IResult<&str, Term> {
    map(pair(sign, ws(term)), |(neg, t)| if neg { t.negate() } else { t })(input)
}

/// A single coordinate such as `-x+y+1/3`, as (row of the rotation, translation). Coefficients or
/// translations that overflow are rejected.
fn coord(input: &str) -> IResult<&str, ([i32; 3], Frac)> {
    map_res(
        tuple((
            map(pair(opt(sign), ws(term)), |(neg, t)| {
                if neg == Some(true) {
                    t.negate()
                } else {
                    t
                }
            }),
            many0(signed_term),
        )),
        |(first, rest)| {
            let mut row = [0i32; 3];
            let mut tau = Frac::zero();
            for t in std::iter::once(first).chain(rest) {
                match t {
                    Term::Axis(k, i) => row[i] = row[i].checked_add(k).ok_or(t)?,
                    Term::Constant(f) => tau = tau.checked_add(f).ok_or(t)?,
                }
            }
            Ok::<_, Term>((row, tau))
        },
    )(input)
}

fn triplet(input: &str) -> IResult<&str, Vec<([i32; 3], Frac)>> {
    all_consuming(preceded(multispace0, separated_list1(char(','), coord)))(input)
}

impl FromStr for Isometry {
    type Err = IsometryError;

    /// Parses a symmetry operation from a triplet, e.g., `-y, x-y, z+1/3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || IsometryError::CoordParse(s.to_owned());
        let (_, rows) = triplet(s).map_err(|_e| err())?;
        if rows.len() != 3 {
            return Err(err());
        }
        let rot = Matrix3::from_fn(|i, j| rows[i].0[j]);
        let tau = Vector3::new(rows[0].1, rows[1].1, rows[2].1);
        Self::new_rot_tau(rot, tau)
    }
}

impl Display for Isometry {
    /// Writes the triplet form, e.g. `-y+1/2, x, z`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let coords: Vec<String> = (0..3)
            .map(|i| {
                let mut s = String::new();
                for (j, name) in ["x", "y", "z"].iter().enumerate() {
                    let k = self.rot[(i, j)];
                    if k == 0 {
                        continue;
                    }
                    if k < 0 {
                        s.push('-');
                    } else if !s.is_empty() {
                        s.push('+');
                    }
                    if k.abs() != 1 {
                        s.push_str(&k.abs().to_string());
                    }
                    s.push_str(name);
                }
                let t = self.tau[i];
                if !t.is_zero() {
                    if t.numerator > 0 && !s.is_empty() {
                        s.push('+');
                    }
                    s.push_str(&t.to_string());
                }
                if s.is_empty() {
                    s.push('0');
                }
                s
            })
            .collect();
        write!(f, "{}", coords.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::matrix;

    use super::*;
    use crate::frac;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identity() {
        let id = Isometry::identity();
        assert_eq!(id.rot(), Matrix3::identity());
        assert_eq!(id.tau(), Vector3::from_element(Frac::ZERO));
        assert_eq!("x, y, z".parse::<Isometry>().unwrap(), id);
    }

    #[test]
    fn test_parse_tau() {
        let iso_p = Isometry::from_str("-y+3/4, -x+1/4, z+1/4").unwrap();
        let iso = Isometry::new_rot_tau(
            matrix![
                0, -1, 0;
                -1, 0, 0;
                0, 0, 1
            ],
            Vector3::new(frac!(3 / 4), frac!(1 / 4), frac!(1 / 4)),
        )
        .unwrap();
        assert_eq!(iso_p, iso);
    }

    #[test]
    fn test_parse_forms() {
        let iso = Isometry::from_str(" -y ,x-y, 1/2 + z").unwrap();
        assert_eq!(iso.rot(), matrix![0, -1, 0; 1, -1, 0; 0, 0, 1]);
        assert_eq!(iso.tau(), Vector3::new(frac!(0), frac!(0), frac!(1 / 2)));
        let iso = Isometry::from_str("X, Y, -Z+0.25").unwrap();
        assert_eq!(iso.tau().z, frac!(1 / 4));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Isometry::from_str("x, y"),
            Err(IsometryError::CoordParse(_))
        ));
        assert!(matches!(
            Isometry::from_str("x, y, w"),
            Err(IsometryError::CoordParse(_))
        ));
        assert!(matches!(
            Isometry::from_str("x, x, z"),
            Err(IsometryError::NotUnimodular(_))
        ));
    }

    #[test]
    fn test_parse_overflow() {
        for s in [
            "x+2000, y, z",
            "x+1000+1000, y, z",
            "2147483647x+x, y, z",
            "99999999999x, y, z",
        ] {
            assert_eq!(
                Isometry::from_str(s),
                Err(IsometryError::CoordParse(s.to_owned()))
            );
        }
        // determinant too large for i32
        assert!(matches!(
            Isometry::from_str("2000000x, 2000000y, 2000000z"),
            Err(IsometryError::NotUnimodular(_))
        ));
        assert_eq!(int_determinant(&Matrix3::from_element(i32::MAX)), None);
    }

    #[test]
    fn test_translation_reduced() {
        let iso = Isometry::from_str("x+1000, y-1/4, z+5/4").unwrap();
        assert_eq!(iso.tau(), Vector3::new(frac!(0), frac!(3 / 4), frac!(1 / 4)));
        assert_eq!(iso.to_string(), "x, y+3/4, z+1/4");
    }

    #[test]
    fn test_compose_and_inverse() {
        let a = Isometry::from_str("-y+1/2, x, z+1/4").unwrap();
        let b = Isometry::from_str("-x, -y+1/2, z").unwrap();
        let ab = a * b;
        let f = Vector3::new(0.1, 0.2, 0.3);
        assert_relative_eq!(ab.transform(&f), a.transform(&b.transform(&f)), epsilon = 1e-12);
        assert_eq!(a * a.inv(), Isometry::identity());
        assert_eq!(a.inv() * a, Isometry::identity());
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["-y+1/2, x, z+1/4", "x-y, x, -z", "-x, -y, -z"] {
            let iso = Isometry::from_str(s).unwrap();
            assert_eq!(iso.to_string(), s);
            assert_eq!(Isometry::from_str(&iso.to_string()).unwrap(), iso);
        }
    }
}
