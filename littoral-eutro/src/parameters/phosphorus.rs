//! Phosphorus Parameters

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Parameters for the water-column phosphorus system.
///
/// Mineralization runs particulate -> dissolved -> phosphate; the mineral
/// form partitions between dissolved and solids-sorbed phases, and only
/// the sorbed phase settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhosphorusParameters {
    /// Refractory particulate -> refractory dissolved organic P [1/day].
    /// default: (0.01, 1.08)
    pub refractory_hydrolysis: RateConstant,

    /// Labile particulate -> labile dissolved organic P [1/day].
    /// default: (0.05, 1.08)
    pub labile_hydrolysis: RateConstant,

    /// Refractory dissolved organic P -> phosphate [1/day].
    /// default: (0.01, 1.08)
    pub refractory_mineralization: RateConstant,

    /// Labile dissolved organic P -> phosphate [1/day].
    /// default: (0.01, 1.08)
    pub labile_mineralization: RateConstant,

    /// Phosphate sorption partition coefficient [L/kg solids].
    /// default: 6.0
    pub partition: f64,
}

impl Default for PhosphorusParameters {
    fn default() -> Self {
        Self {
            refractory_hydrolysis: RateConstant::new(0.01, 1.08),
            labile_hydrolysis: RateConstant::new(0.05, 1.08),
            refractory_mineralization: RateConstant::new(0.01, 1.08),
            labile_mineralization: RateConstant::new(0.01, 1.08),
            partition: 6.0,
        }
    }
}

impl PhosphorusParameters {
    /// Dissolved fraction of the mineral pool at a given suspended solids
    /// concentration [kg/L].
    pub fn dissolved_fraction(&self, solids: f64) -> f64 {
        1.0 / (1.0 + self.partition * solids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_the_reference_constants() {
        let parameters = PhosphorusParameters::default();
        assert_eq!(parameters.labile_hydrolysis, RateConstant::new(0.05, 1.08));
        assert_eq!(parameters.partition, 6.0);
    }

    #[test]
    fn dissolved_fraction_is_one_without_solids() {
        assert_eq!(PhosphorusParameters::default().dissolved_fraction(0.0), 1.0);
    }

    #[test]
    fn dissolved_fraction_declines_with_solids() {
        let parameters = PhosphorusParameters::default();
        assert_relative_eq!(
            parameters.dissolved_fraction(0.5),
            0.25,
            max_relative = 1e-12
        );
        assert!(parameters.dissolved_fraction(2.0) < parameters.dissolved_fraction(0.5));
    }

    #[test]
    fn parameters_round_trip_through_serde() {
        let parameters = PhosphorusParameters::default();
        let json = serde_json::to_string(&parameters).unwrap();
        let restored: PhosphorusParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.partition, parameters.partition);
    }
}
