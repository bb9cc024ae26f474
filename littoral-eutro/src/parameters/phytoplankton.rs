//! Phytoplankton Group Parameters
//!
//! One instance per taxon/group. Growth runs through a temperature
//! optimum curve, Steele light limitation and the minimum nutrient
//! Michaelis term; nutrient content is carried as cell quotas relaxing
//! toward equilibrium with the ambient limitation.

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Parameters for one phytoplankton group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhytoplanktonParameters {
    /// Maximum growth rate at the optimum temperature [1/day].
    /// default: 2.0
    pub growth: f64,

    /// Optimum temperature [Celsius].
    /// default: 20.0
    pub optimum_temperature: f64,

    /// Width of the optimum curve below the optimum [1/Celsius^2].
    /// default: 0.004
    pub beta_below: f64,

    /// Width of the optimum curve above the optimum [1/Celsius^2].
    /// default: 0.006
    pub beta_above: f64,

    /// Respiration [1/day].
    /// default: (0.1, 1.08)
    pub respiration: RateConstant,

    /// Grazing loss [1/day].
    /// default: (0.1, 1.1)
    pub grazing: RateConstant,

    /// Settling velocity [m/day].
    /// default: (0.25, 1.027)
    pub settling: RateConstant,

    /// Nitrogen half-saturation [mg N/L].
    /// default: 0.01
    pub km_nitrogen: f64,

    /// Phosphorus half-saturation [mg P/L].
    /// default: 0.001
    pub km_phosphorus: f64,

    /// Silica half-saturation [mg Si/L].
    /// default: 0.02
    pub km_silica: f64,

    /// Maximum nitrogen quota [g N/g C].
    /// default: 0.176
    pub ratio_nitrogen: f64,

    /// Maximum phosphorus quota [g P/g C].
    /// default: 0.0244
    pub ratio_phosphorus: f64,

    /// Maximum silica quota [g Si/g C].
    /// default: 0.33
    pub ratio_silica: f64,

    /// Carbon to chlorophyll ratio [g C/g chl].
    /// default: 60.0
    pub carbon_chlorophyll: f64,

    /// Minimum quota as a fraction of the maximum ratio (dimensionless).
    /// default: 0.5
    pub minimum_quota: f64,

    /// Quota relaxation rate toward equilibrium [1/day].
    /// default: 0.2
    pub relaxation: f64,
}

impl Default for PhytoplanktonParameters {
    fn default() -> Self {
        Self {
            // Growth and the temperature optimum
            growth: 2.0,
            optimum_temperature: 20.0,
            beta_below: 0.004,
            beta_above: 0.006,

            // Loss terms
            respiration: RateConstant::new(0.1, 1.08),
            grazing: RateConstant::new(0.1, 1.1),
            settling: RateConstant::new(0.25, 1.027),

            // Nutrient half-saturation
            km_nitrogen: 0.01,
            km_phosphorus: 0.001,
            km_silica: 0.02,

            // Stoichiometry
            ratio_nitrogen: 0.176,
            ratio_phosphorus: 0.0244,
            ratio_silica: 0.33,
            carbon_chlorophyll: 60.0,

            // Quota dynamics
            minimum_quota: 0.5,
            relaxation: 0.2,
        }
    }
}

impl PhytoplanktonParameters {
    /// Growth scaling at a given temperature: `exp(-beta * (T - Topt)^2)`
    /// with the below- or above-optimum width.
    pub fn optimum(&self, temperature: f64) -> f64 {
        let excursion = temperature - self.optimum_temperature;
        let beta = if temperature <= self.optimum_temperature {
            self.beta_below
        } else {
            self.beta_above
        };
        (-beta * excursion * excursion).exp()
    }

    /// Equilibrium quota for a nutrient under the given limitation,
    /// ranging from `minimum_quota * ratio` (starved) up to `ratio`.
    pub fn quota_target(&self, ratio: f64, limit: f64) -> f64 {
        ratio * (self.minimum_quota + (1.0 - self.minimum_quota) * limit)
    }
}
