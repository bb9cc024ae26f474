//! Silica Parameters

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Parameters for the water-column silica system: biogenic particulate
/// silica dissolving to silicate, with sorption like phosphate's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilicaParameters {
    /// Dissolution of biogenic silica to silicate [1/day].
    /// default: (0.08, 1.08)
    pub dissolution: RateConstant,

    /// Silicate sorption partition coefficient [L/kg solids].
    /// default: 6.0
    pub partition: f64,
}

impl Default for SilicaParameters {
    fn default() -> Self {
        Self {
            dissolution: RateConstant::new(0.08, 1.08),
            partition: 6.0,
        }
    }
}

impl SilicaParameters {
    /// Dissolved fraction of silicate at a given suspended solids
    /// concentration [kg/L].
    pub fn dissolved_fraction(&self, solids: f64) -> f64 {
        1.0 / (1.0 + self.partition * solids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_constants() {
        let parameters = SilicaParameters::default();
        assert_eq!(parameters.dissolution, RateConstant::new(0.08, 1.08));
        assert_eq!(parameters.partition, 6.0);
    }

    #[test]
    fn parameters_round_trip_through_serde() {
        let parameters = SilicaParameters::default();
        let json = serde_json::to_string(&parameters).unwrap();
        let restored: SilicaParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.dissolution, parameters.dissolution);
    }
}
