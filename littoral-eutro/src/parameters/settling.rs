//! Particulate Settling Parameters

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Velocities for the downward displacement of particulate pools.
///
/// Each velocity is a [`RateConstant`] whose base is in m/day and whose
/// theta corrects for temperature. The deposition theta corrects the
/// areal flux handed to the sediment separately from the water-column
/// displacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlingParameters {
    /// Particulate organic matter velocity [m/day].
    /// default: (1.0, 1.027)
    pub particulate_organic: RateConstant,

    /// Sorbed mineral phase velocity [m/day]. Inert by default.
    /// default: (0.0, 1.027)
    pub sorbed_mineral: RateConstant,

    /// Temperature coefficient of the deposition correction handed to the
    /// sediment (dimensionless).
    /// default: 1.027
    pub deposition_theta: f64,
}

impl Default for SettlingParameters {
    fn default() -> Self {
        Self {
            particulate_organic: RateConstant::new(1.0, 1.027),
            sorbed_mineral: RateConstant::new(0.0, 1.027),
            deposition_theta: 1.027,
        }
    }
}

impl SettlingParameters {
    /// Deposition correction factor at a temperature anomaly.
    pub fn deposition_correction(&self, anomaly: f64) -> f64 {
        self.deposition_theta.powf(anomaly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_the_reference_constants() {
        let parameters = SettlingParameters::default();
        assert_eq!(parameters.particulate_organic, RateConstant::new(1.0, 1.027));
        assert_eq!(parameters.sorbed_mineral.base, 0.0);
    }

    #[test]
    fn deposition_correction_is_unity_at_the_reference_temperature() {
        assert_relative_eq!(
            SettlingParameters::default().deposition_correction(0.0),
            1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn parameters_round_trip_through_serde() {
        let parameters = SettlingParameters::default();
        let json = serde_json::to_string(&parameters).unwrap();
        let restored: SettlingParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.particulate_organic, parameters.particulate_organic);
    }
}
