//! A rational data type for the translation parts of tabulated symmetry operations. Fractional
//! translations such as 1/2 or 3/4 accumulate rounding error when composed as floats, which breaks
//! group closure, so operations read from a table are kept exact until they act on a position.

use num_traits::Zero;
use std::{
    fmt::{Debug, Display},
    ops::{Add, Neg, Sub},
    str::FromStr,
};
use thiserror::Error;

/// The base type used. We don't need large values here, ±32768 is more than enough.
pub type BaseInt = i16;

/// The denominator needed to represent every translation that occurs in a space group: 24 is
/// what GEMMI uses.

// The Display code and tests need to change if this changes.
pub const DENOM: BaseInt = 24;

/// The tolerance used to convert floats to `Frac`s.

// Needs to be significantly smaller than 0.5/DENOM, otherwise every float would silently round to
// the nearest representable value.
pub const FLOAT_PARSE_TOLERANCE: f64 = 0.05 / DENOM as f64;

/// A fraction with a hardcoded denominator [`DENOM`].
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct Frac {
    /// The numerator.
    pub numerator: BaseInt,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FracError {
    #[error(
        "Could not convert {0} to a fraction with denominator {}: outside of tolerance {}",
        DENOM,
        FLOAT_PARSE_TOLERANCE
    )]
    FloatParseError(f64),
    #[error("Could not parse {0}")]
    StringParseError(String),
}

impl Frac {
    /// Creates a new `Frac` with the given numerator.
    pub const fn new_with_numerator(numerator: BaseInt) -> Self {
        Self { numerator }
    }

    /// Attempts to read a float as a [`Frac`]. If the float is not within [`FLOAT_PARSE_TOLERANCE`]
    /// of a valid [`Frac`], errors.
    pub fn try_from_float(x: f64) -> Result<Self, FracError> {
        let float_num = x * DENOM as f64;
        let frac_err = (float_num - float_num.round()).abs();
        if !float_num.is_finite()
            || frac_err > FLOAT_PARSE_TOLERANCE
            || float_num.abs() > BaseInt::MAX as f64
        {
            Err(FracError::FloatParseError(x))
        } else {
            Ok(Self::new_with_numerator(float_num.round() as BaseInt))
        }
    }

    /// Modulo 1: returns the fraction in [0, 1) that is an integer apart from this one.
    pub fn modulo_one(&self) -> Self {
        Self {
            numerator: self.numerator.rem_euclid(DENOM),
        }
    }

    /// Sum of two fractions, or `None` if the numerator leaves the range of [`BaseInt`].
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.numerator
            .checked_add(rhs.numerator)
            .map(Self::new_with_numerator)
    }

    /// `Σ kᵢ·fᵢ` reduced modulo one. The sum is taken in a wider type, so any integer row of a
    /// rotation matrix can act on a translation without overflowing.
    pub fn dot_modulo_one(coefs: &[i32], fracs: &[Frac]) -> Self {
        let n: i64 = coefs
            .iter()
            .zip(fracs)
            .map(|(&k, f)| i64::from(k) * i64::from(f.numerator))
            .sum();
        // the remainder is in [0, DENOM), which always fits
        Self::new_with_numerator(n.rem_euclid(i64::from(DENOM)) as BaseInt)
    }

    /// Greatest common divisor, used to print fractions in lowest terms.
    pub fn gcd(a: BaseInt, b: BaseInt) -> BaseInt {
        let (mut a, mut b) = (a.abs(), b.abs());
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }

    pub const ONE_HALF: Frac = Frac {
        numerator: DENOM / 2,
    };

    pub const ONE: Frac = Frac { numerator: DENOM };

    pub const ZERO: Frac = Frac { numerator: 0 };

    pub const NEG_ONE: Frac = Frac { numerator: -DENOM };

    pub const DENOM: BaseInt = DENOM;
}

impl From<Frac> for f64 {
    fn from(value: Frac) -> Self {
        (value.numerator as f64) / DENOM as f64
    }
}

impl TryFrom<BaseInt> for Frac {
    type Error = FracError;

    fn try_from(value: BaseInt) -> Result<Self, Self::Error> {
        value
            .checked_mul(DENOM)
            .map(Self::new_with_numerator)
            .ok_or_else(|| FracError::StringParseError(value.to_string()))
    }
}

impl FromStr for Frac {
    type Err = FracError;

    /// Reads integers (`2`), fractions (`3/4`) and decimals (`0.25`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || FracError::StringParseError(s.to_owned());
        if let Ok(i) = BaseInt::from_str(s) {
            return Self::try_from(i).map_err(|_e| err());
        }
        if let Some((n, d)) = s.split_once('/') {
            let n = BaseInt::from_str(n.trim()).map_err(|_e| err())?;
            let d = BaseInt::from_str(d.trim()).map_err(|_e| err())?;
            if d == 0 || DENOM % d != 0 {
                return Err(err());
            }
            return n
                .checked_mul(DENOM / d)
                .map(Self::new_with_numerator)
                .ok_or_else(err);
        }
        f64::from_str(s)
            .ok()
            .and_then(|f| Self::try_from_float(f).ok())
            .ok_or_else(err)
    }
}

impl Add for Frac {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new_with_numerator(self.numerator + rhs.numerator)
    }
}

impl Sub for Frac {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new_with_numerator(self.numerator - rhs.numerator)
    }
}

impl Neg for Frac {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new_with_numerator(-self.numerator)
    }
}

impl Zero for Frac {
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        self.numerator == 0
    }
}

impl Debug for Frac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Frac {
    /// Prints in lowest terms with an ASCII slash: `-3/4`, `1/2`, `0`, `2`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = Self::gcd(self.numerator, DENOM);
        let (n, d) = if g == 0 {
            (0, 1)
        } else {
            (self.numerator / g, DENOM / g)
        };
        if d == 1 {
            write!(f, "{n}")
        } else {
            write!(f, "{n}/{d}")
        }
    }
}

/// Builds a [`Frac`] from an integer or an integer fraction literal, e.g. `frac!(1 / 4)`.
#[macro_export]
macro_rules! frac {
    ($num:literal / $denom:expr) => {{
        let d = $denom;
        let n = $num;

        // n / d = x / DENOM
        if ($crate::frac::Frac::DENOM * n) % d == 0 {
            $crate::frac::Frac::new_with_numerator(($crate::frac::Frac::DENOM * n) / d)
        } else {
            panic!(
                "Invalid fraction: {}/{} cannot be represented as n/{}",
                n,
                d,
                $crate::frac::Frac::DENOM
            )
        }
    }};
    ($num:expr) => {
        $crate::frac::Frac::new_with_numerator(($num as i16) * $crate::frac::Frac::DENOM)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse() {
        assert_eq!("1/2".parse::<Frac>().unwrap(), Frac::ONE_HALF);
        assert_eq!("-1".parse::<Frac>().unwrap(), Frac::NEG_ONE);
        assert_eq!("0.25".parse::<Frac>().unwrap(), frac!(1 / 4));
        assert_eq!(" 2/3 ".parse::<Frac>().unwrap(), frac!(2 / 3));
        assert!("1/5".parse::<Frac>().is_err());
        assert!("0.2".parse::<Frac>().is_err());
        assert!("x".parse::<Frac>().is_err());
    }

    #[test]
    fn test_parse_out_of_range() {
        for s in ["2000", "-2000", "30000/2", "40000", "1e9"] {
            assert_eq!(
                s.parse::<Frac>(),
                Err(FracError::StringParseError(s.to_owned()))
            );
        }
        assert_eq!(Frac::try_from(1365i16), Ok(Frac::new_with_numerator(32760)));
        assert!(Frac::try_from(1366i16).is_err());
        assert_eq!(Frac::new_with_numerator(BaseInt::MAX).checked_add(Frac::ONE), None);
    }

    #[test]
    fn test_dot_modulo_one() {
        let taus = [frac!(1 / 2), frac!(1 / 4), frac!(3 / 4)];
        assert_eq!(Frac::dot_modulo_one(&[1, -1, 0], &taus), frac!(1 / 4));
        assert_eq!(Frac::dot_modulo_one(&[0, 0, -1], &taus), frac!(1 / 4));
        // huge coefficients still reduce
        let big = Frac::new_with_numerator(BaseInt::MAX);
        let f = Frac::dot_modulo_one(&[i32::MAX, i32::MIN, 1], &[big, big, big]);
        assert!((0..DENOM).contains(&f.numerator));
    }

    #[test]
    fn test_display() {
        assert_eq!(frac!(3 / 4).to_string(), "3/4");
        assert_eq!((-frac!(1 / 2)).to_string(), "-1/2");
        assert_eq!(frac!(2).to_string(), "2");
        assert_eq!(Frac::ZERO.to_string(), "0");
    }

    #[test]
    fn test_float_tolerance() {
        assert_eq!(Frac::try_from_float(0.5 + 1e-6).unwrap(), Frac::ONE_HALF);
        assert_eq!(
            Frac::try_from_float(0.51),
            Err(FracError::FloatParseError(0.51))
        );
        assert!(Frac::try_from_float(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn test_modulo_one_in_unit_interval(n in -2000i16..2000i16) {
            let f = Frac::new_with_numerator(n).modulo_one();
            let fl: f64 = f.into();
            prop_assert!((0.0..1.0).contains(&fl));
            prop_assert_eq!((n - f.numerator) % DENOM, 0);
        }
    }
}
