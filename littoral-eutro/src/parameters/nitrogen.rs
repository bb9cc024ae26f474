//! Nitrogen Parameters
//!
//! Mineralization pathways toward ammonium, plus nitrification and
//! denitrification constants. Nitrification also carries the linear
//! low-temperature cutoff applied in the kinetics module.

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Parameters for the water-column nitrogen system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NitrogenParameters {
    /// Refractory particulate -> refractory dissolved organic N [1/day].
    /// default: (0.008, 1.08)
    pub refractory_hydrolysis: RateConstant,

    /// Labile particulate -> labile dissolved organic N [1/day].
    /// default: (0.05, 1.08)
    pub labile_hydrolysis: RateConstant,

    /// Refractory dissolved organic N -> ammonium [1/day].
    /// default: (0.008, 1.08)
    pub refractory_mineralization: RateConstant,

    /// Labile dissolved organic N -> ammonium [1/day].
    /// default: (0.05, 1.08)
    pub labile_mineralization: RateConstant,

    /// Nitrification, ammonium -> NOx [1/day].
    /// default: (0.1, 1.08)
    pub nitrification: RateConstant,

    /// Denitrification, NOx -> nitrogen gas [1/day].
    /// default: (0.05, 1.045)
    pub denitrification: RateConstant,

    /// Oxygen half-saturation of nitrification [mg O2/L].
    /// default: 1.0
    pub km_nitrification: f64,

    /// Oxygen inhibition half-saturation of denitrification [mg O2/L].
    /// default: 0.1
    pub km_denitrification: f64,
}

impl Default for NitrogenParameters {
    fn default() -> Self {
        Self {
            // Mineralization pathways
            refractory_hydrolysis: RateConstant::new(0.008, 1.08),
            labile_hydrolysis: RateConstant::new(0.05, 1.08),
            refractory_mineralization: RateConstant::new(0.008, 1.08),
            labile_mineralization: RateConstant::new(0.05, 1.08),

            // Inorganic transformations
            nitrification: RateConstant::new(0.1, 1.08),
            denitrification: RateConstant::new(0.05, 1.045),
            km_nitrification: 1.0,
            km_denitrification: 0.1,
        }
    }
}
