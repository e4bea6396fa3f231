mod common;

use common::rock_salt;
use nalgebra::Vector3;
use pointdefects::{
    CavityEngine, DefectConfig, Interstitial, Lattice, PointDefects, Vacancy,
};
use proptest::prelude::*;

const ROCK_SALTS: [(&str, &str); 4] = [
    ("Mg2+", "O2-"),
    ("Na+", "Cl-"),
    ("Ca2+", "O2-"),
    ("Li+", "F-"),
];

fn engine() -> impl Strategy<Value = CavityEngine> {
    prop_oneof![Just(CavityEngine::Precise), Just(CavityEngine::Placeholder)]
}

fn check_descriptors<D: PointDefects>(defects: &D) -> Result<(), TestCaseError> {
    for i in 0..defects.defectsite_count() {
        let cavity = defects.cavity(i).unwrap().descriptor;
        for x in [cavity.volume(), cavity.surface_area(), cavity.radius()] {
            prop_assert!(x.is_finite() && x >= 0.0, "site {}: {:?}", i, cavity);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn vacancies_are_stable(
        a in 3.5f64..6.5,
        pair in 0..ROCK_SALTS.len(),
        engine in engine(),
    ) {
        let (cation, anion) = ROCK_SALTS[pair];
        let s = rock_salt(a, cation, anion);
        let config = DefectConfig::new(1e-3).with_cavity_engine(engine);
        let v = Vacancy::new(&s, config.clone()).unwrap();
        let again = Vacancy::new(&s, config).unwrap();
        prop_assert_eq!(v.enumerate_defectsites(), again.enumerate_defectsites());
        prop_assert!(v.defectsite_count() <= v.candidate_count());
        prop_assert_eq!(v.defectsite_count(), 2);
        let total: usize = (0..v.defectsite_count()).map(|i| v.multiplicity(i).unwrap()).sum();
        prop_assert_eq!(total, v.candidate_count());
        check_descriptors(&v)?;
    }

    #[test]
    fn interstitials_are_stable(
        a in 3.5f64..6.5,
        pair in 0..ROCK_SALTS.len(),
        engine in engine(),
    ) {
        let (cation, anion) = ROCK_SALTS[pair];
        let s = rock_salt(a, cation, anion);
        let config = DefectConfig::new(1e-3).with_cavity_engine(engine);
        let inter = Interstitial::new(&s, config.clone()).unwrap();
        let again = Interstitial::new(&s, config).unwrap();
        prop_assert_eq!(inter.enumerate_defectsites(), again.enumerate_defectsites());
        prop_assert!(inter.defectsite_count() <= inter.candidate_count());
        let total: usize = (0..inter.defectsite_count())
            .map(|i| inter.multiplicity(i).unwrap())
            .sum();
        prop_assert_eq!(total, inter.candidate_count());
        check_descriptors(&inter)?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn min_image_is_shortest(
        a in 3.0f64..8.0,
        b in 3.0f64..8.0,
        c in 3.0f64..8.0,
        alpha in 70.0f64..110.0,
        beta in 70.0f64..110.0,
        gamma in 60.0f64..120.0,
        f1 in prop::array::uniform3(0.0f64..1.0),
        f2 in prop::array::uniform3(-2.0f64..3.0),
    ) {
        let lat = Lattice::try_from_parameters(a, b, c, alpha, beta, gamma);
        prop_assume!(lat.is_ok());
        let lat = lat.unwrap();
        let (f1, f2) = (Vector3::from(f1), Vector3::from(f2));
        let (frac, cart) = lat.min_image(&f1, &f2);

        // the displacement really reaches an image of f2
        let shift = frac - (f2 - f1);
        prop_assert!(shift.iter().all(|x| (x - x.round()).abs() < 1e-9));
        prop_assert!((lat.to_cartesian(&frac) - cart).norm() < 1e-9);

        // and no nearby image is closer
        let base = f2 - f1;
        for i in -4..=4 {
            for j in -4..=4 {
                for k in -4..=4 {
                    let d = base + Vector3::new(i as f64, j as f64, k as f64);
                    prop_assert!(lat.to_cartesian(&d).norm() >= cart.norm() - 1e-9);
                }
            }
        }
        prop_assert!((lat.distance(&f2, &f1) - cart.norm()).abs() < 1e-9);
    }
}
