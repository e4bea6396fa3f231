//! Module to deal with units, using zero-cost compile-time checking to ensure dimensionality is
//! correct. Everything in a structure is measured in angstroms, so the cavity descriptors are
//! reported in cubic and square angstroms.

pub use uom::si::angle::{degree, radian};
pub use uom::si::f64::*;
pub use uom::si::length::angstrom;
pub use uom::si::Quantity;
pub use uom::unit;

pub mod volume {
    unit! {
        system: uom::si;
        quantity: uom::si::volume;

        @cubic_angstrom: 1.0E-30; "Å³", "cubic angstrom", "cubic angstroms";
    }
}

pub mod area {
    unit! {
        system: uom::si;
        quantity: uom::si::area;

        @square_angstrom: 1.0E-20; "Å²", "square angstrom", "square angstroms";
    }
}

pub use area::square_angstrom;
pub use volume::cubic_angstrom;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angstrom_units() {
        let l = Length::new::<angstrom>(2.0);
        let v: Volume = l * l * l;
        assert_relative_eq!(v.get::<cubic_angstrom>(), 8.0, max_relative = 1e-12);
        let a: Area = l * l;
        assert_relative_eq!(a.get::<square_angstrom>(), 4.0, max_relative = 1e-12);
    }
}
