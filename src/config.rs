//! Explicit tolerances and policies for defect analysis. There is no hidden default for the
//! symmetry tolerance: it has to be chosen by the caller.

use thiserror::Error;

use crate::{cavity::CavityEngine, coordination::CoordinationPolicy, species::Species};

/// Default fractional tolerance for treating two positions as the same.
pub const DEFAULT_POSITION_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error("Invalid coordination policy: {0}")]
    InvalidPolicy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefectConfig {
    /// Cartesian tolerance handed to the symmetry service, in angstroms.
    pub symmetry_tolerance: f64,
    /// Fractional tolerance for comparing positions.
    pub position_tolerance: f64,
    pub coordination: CoordinationPolicy,
    pub cavity_engine: CavityEngine,
    /// The species placed at interstitial sites, if any. Only affects the effective charge.
    pub inserted_species: Option<Species>,
}

impl DefectConfig {
    pub fn new(symmetry_tolerance: f64) -> Self {
        Self {
            symmetry_tolerance,
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
            coordination: CoordinationPolicy::default(),
            cavity_engine: CavityEngine::default(),
            inserted_species: None,
        }
    }

    pub fn with_position_tolerance(mut self, position_tolerance: f64) -> Self {
        self.position_tolerance = position_tolerance;
        self
    }

    pub fn with_coordination(mut self, coordination: CoordinationPolicy) -> Self {
        self.coordination = coordination;
        self
    }

    pub fn with_cavity_engine(mut self, cavity_engine: CavityEngine) -> Self {
        self.cavity_engine = cavity_engine;
        self
    }

    pub fn with_inserted_species(mut self, species: Species) -> Self {
        self.inserted_species = Some(species);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidTolerance { name, value })
            }
        };
        positive("symmetry_tolerance", self.symmetry_tolerance)?;
        positive("position_tolerance", self.position_tolerance)?;
        if self.position_tolerance >= 0.5 {
            return Err(ConfigError::InvalidTolerance {
                name: "position_tolerance",
                value: self.position_tolerance,
            });
        }
        match self.coordination {
            CoordinationPolicy::Cutoff { radius } if !(radius.is_finite() && radius > 0.0) => Err(
                ConfigError::InvalidPolicy(format!("cutoff radius {radius}")),
            ),
            CoordinationPolicy::RelativeNearest { factor } if !(factor.is_finite() && factor >= 1.0) => {
                Err(ConfigError::InvalidPolicy(format!(
                    "relative factor {factor} must be at least 1"
                )))
            }
            CoordinationPolicy::VoronoiFace { min_area_fraction }
                if !(0.0..=1.0).contains(&min_area_fraction) =>
            {
                Err(ConfigError::InvalidPolicy(format!(
                    "face area fraction {min_area_fraction} outside [0, 1]"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let c = DefectConfig::new(0.01);
        assert_eq!(c.position_tolerance, DEFAULT_POSITION_TOLERANCE);
        assert_eq!(
            c.coordination,
            CoordinationPolicy::RelativeNearest { factor: 1.1 }
        );
        assert_eq!(c.cavity_engine, CavityEngine::Precise);
        assert_eq!(c.inserted_species, None);
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            DefectConfig::new(0.0).validate(),
            Err(ConfigError::InvalidTolerance {
                name: "symmetry_tolerance",
                ..
            })
        ));
        assert!(matches!(
            DefectConfig::new(0.01)
                .with_position_tolerance(f64::NAN)
                .validate(),
            Err(ConfigError::InvalidTolerance { .. })
        ));
        for policy in [
            CoordinationPolicy::Cutoff { radius: -1.0 },
            CoordinationPolicy::RelativeNearest { factor: 0.9 },
            CoordinationPolicy::VoronoiFace {
                min_area_fraction: 1.5,
            },
        ] {
            assert!(matches!(
                DefectConfig::new(0.01).with_coordination(policy).validate(),
                Err(ConfigError::InvalidPolicy(_))
            ));
        }
    }
}
