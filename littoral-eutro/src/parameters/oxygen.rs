//! Dissolved Oxygen Parameters

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Parameters for the dissolved oxygen system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OxygenParameters {
    /// Oxidation of reduced-species oxygen equivalents [1/day].
    /// default: (0.15, 1.08)
    pub equivalents_oxidation: RateConstant,

    /// Oxygen half-saturation for equivalents oxidation [mg O2/L].
    /// default: 0.1
    pub km_oxygen: f64,

    /// Dissolved oxygen threshold below which benthic aerobic processes
    /// are suppressed [mg O2/L].
    /// default: 2.0
    pub critical_threshold: f64,
}

impl Default for OxygenParameters {
    fn default() -> Self {
        Self {
            equivalents_oxidation: RateConstant::new(0.15, 1.08),
            km_oxygen: 0.1,
            critical_threshold: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_constants() {
        let parameters = OxygenParameters::default();
        assert_eq!(
            parameters.equivalents_oxidation,
            RateConstant::new(0.15, 1.08)
        );
        assert_eq!(parameters.km_oxygen, 0.1);
        assert_eq!(parameters.critical_threshold, 2.0);
    }

    #[test]
    fn parameters_round_trip_through_serde() {
        let parameters = OxygenParameters::default();
        let json = serde_json::to_string(&parameters).unwrap();
        let restored: OxygenParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.km_oxygen, parameters.km_oxygen);
        assert_eq!(
            restored.equivalents_oxidation,
            parameters.equivalents_oxidation
        );
    }
}
