//! Organic Carbon Parameters
//!
//! Rate constants and half-saturation terms for the seven-pool organic
//! carbon system: hydrolysis of the particulate pools, oxygen-limited
//! oxidation of the dissolved pools, and the receipt fractions for
//! phytoplankton grazing losses.

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// How a phytoplankton grazing loss is divided over the carbon pools.
///
/// The fractions should sum to 1 for the full loss to leave the biomass
/// pool; anything short of 1 stays with the grazed group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrazingFractions {
    /// default: 0.35
    pub labile_particulate: f64,
    /// default: 0.10
    pub refractory_particulate: f64,
    /// default: 0.05
    pub recycled_particulate: f64,
    /// default: 0.25
    pub labile_dissolved: f64,
    /// default: 0.10
    pub refractory_dissolved: f64,
    /// default: 0.15
    pub recycled_dissolved: f64,
    /// default: 0.0
    pub excreted_dissolved: f64,
}

impl GrazingFractions {
    pub fn sum(&self) -> f64 {
        self.labile_particulate
            + self.refractory_particulate
            + self.recycled_particulate
            + self.labile_dissolved
            + self.refractory_dissolved
            + self.recycled_dissolved
            + self.excreted_dissolved
    }
}

impl Default for GrazingFractions {
    fn default() -> Self {
        Self {
            labile_particulate: 0.35,
            refractory_particulate: 0.10,
            recycled_particulate: 0.05,
            labile_dissolved: 0.25,
            refractory_dissolved: 0.10,
            recycled_dissolved: 0.15,
            excreted_dissolved: 0.0,
        }
    }
}

/// Parameters for the organic carbon system.
///
/// Hydrolysis moves each particulate pool into its dissolved counterpart;
/// oxidation removes dissolved carbon against the oxygen field. Both are
/// scaled by `1 - excretion`, the internally retained fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonParameters {
    /// Hydrolysis of labile particulate carbon [1/day].
    /// default: (0.07, 1.08)
    pub labile_hydrolysis: RateConstant,

    /// Hydrolysis of recycled particulate carbon [1/day].
    /// Temperature-independent in the reference constants.
    /// default: (0.01, 1.0)
    pub recycled_hydrolysis: RateConstant,

    /// Hydrolysis of refractory particulate carbon [1/day].
    /// default: (0.01, 1.08)
    pub refractory_hydrolysis: RateConstant,

    /// Oxidation of labile dissolved carbon [1/day].
    /// default: (0.1, 1.08)
    pub labile_oxidation: RateConstant,

    /// Oxidation of algal-excreted dissolved carbon [1/day].
    /// default: (0.3, 1.047)
    pub excreted_oxidation: RateConstant,

    /// Oxidation of recycled dissolved carbon [1/day].
    /// default: (0.15, 1.047)
    pub recycled_oxidation: RateConstant,

    /// Oxidation of refractory dissolved carbon [1/day].
    /// default: (0.008, 1.08)
    pub refractory_oxidation: RateConstant,

    /// Oxygen half-saturation for oxidation [mg O2/L].
    /// default: 0.2
    pub km_oxygen: f64,

    /// Labile-carbon half-saturation [mg C/L]. Self-limits the oxidation of
    /// every dissolved pool except the refractory one, and shapes the
    /// availability offered to denitrification.
    /// default: 0.1
    pub km_labile: f64,

    /// Half-saturation of the mineralization limiter [mg C/L].
    /// default: 0.05
    pub km_phytoplankton: f64,

    /// Fraction excreted rather than internally retained (dimensionless).
    /// default: 0.1
    pub excretion: f64,

    /// Floor of the solids settling velocity curve [m/day].
    /// default: 0.0
    pub solids_velocity_minimum: f64,

    /// Ceiling of the solids settling velocity curve [m/day].
    /// default: 0.0
    pub solids_velocity_maximum: f64,

    /// Reference concentration of the solids velocity curve [mg/L].
    /// default: 1.0
    pub solids_critical: f64,

    /// Exponent of the solids velocity curve (dimensionless).
    /// default: 1.0
    pub solids_exponent: f64,

    /// Receipt fractions for grazing losses.
    pub grazing: GrazingFractions,
}

impl Default for CarbonParameters {
    fn default() -> Self {
        Self {
            // Hydrolysis (particulate -> dissolved)
            labile_hydrolysis: RateConstant::new(0.07, 1.08),
            recycled_hydrolysis: RateConstant::new(0.01, 1.0),
            refractory_hydrolysis: RateConstant::new(0.01, 1.08),

            // Oxidation (dissolved -> carbon dioxide)
            labile_oxidation: RateConstant::new(0.1, 1.08),
            excreted_oxidation: RateConstant::new(0.3, 1.047),
            recycled_oxidation: RateConstant::new(0.15, 1.047),
            refractory_oxidation: RateConstant::new(0.008, 1.08),

            // Half-saturation terms
            km_oxygen: 0.2,
            km_labile: 0.1,
            km_phytoplankton: 0.05,

            // Excretion split
            excretion: 0.1,

            // Solids-dependent settling (inert by default)
            solids_velocity_minimum: 0.0,
            solids_velocity_maximum: 0.0,
            solids_critical: 1.0,
            solids_exponent: 1.0,

            grazing: GrazingFractions::default(),
        }
    }
}

impl CarbonParameters {
    /// Fraction of hydrolysis and oxidation retained internally.
    pub fn internal(&self) -> f64 {
        1.0 - self.excretion
    }

    /// Concentration-dependent settling velocity for the recycled
    /// particulate pool [m/day], clipped at the configured ceiling.
    pub fn solids_velocity(&self, concentration: f64) -> f64 {
        let span = self.solids_velocity_maximum - self.solids_velocity_minimum;
        let term = (concentration / self.solids_critical).powf(self.solids_exponent);
        (self.solids_velocity_minimum + span * term).min(self.solids_velocity_maximum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_the_reference_constants() {
        let parameters = CarbonParameters::default();
        assert_eq!(parameters.labile_hydrolysis, RateConstant::new(0.07, 1.08));
        assert_eq!(
            parameters.refractory_oxidation,
            RateConstant::new(0.008, 1.08)
        );
        assert_eq!(parameters.km_oxygen, 0.2);
        assert_relative_eq!(parameters.internal(), 0.9, max_relative = 1e-12);
    }

    #[test]
    fn default_grazing_fractions_account_for_the_whole_loss() {
        assert_relative_eq!(
            GrazingFractions::default().sum(),
            1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn solids_velocity_is_zero_by_default() {
        let parameters = CarbonParameters::default();
        assert_eq!(parameters.solids_velocity(0.0), 0.0);
        assert_eq!(parameters.solids_velocity(50.0), 0.0);
    }

    #[test]
    fn solids_velocity_is_clipped_at_its_ceiling() {
        let parameters = CarbonParameters {
            solids_velocity_minimum: 0.1,
            solids_velocity_maximum: 0.5,
            solids_critical: 10.0,
            solids_exponent: 1.0,
            ..CarbonParameters::default()
        };
        assert_relative_eq!(parameters.solids_velocity(5.0), 0.3, max_relative = 1e-12);
        assert_eq!(parameters.solids_velocity(1e6), 0.5);
    }

    #[test]
    fn parameters_round_trip_through_serde() {
        let parameters = CarbonParameters::default();
        let json = serde_json::to_string(&parameters).unwrap();
        let restored: CarbonParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.grazing, parameters.grazing);
        assert_eq!(restored.labile_oxidation, parameters.labile_oxidation);
    }
}
