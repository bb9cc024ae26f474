//! Two-Layer Sediment Parameters
//!
//! Constants for the benthic model: diagenesis of deposited organic
//! matter, the oxygen-normalized surface mass transfer, squared-rate
//! nitrification/denitrification velocities with marine/fresh pairs, and
//! the sorption partitioning of phosphate and silicate.
//!
//! Reaction velocities are [`RateConstant`] values in m/day; the
//! nitrification and aerobic denitrification entries are *squared-rate*
//! constants whose square is divided by the surface transfer velocity to
//! give the effective first-order velocity.

use littoral_core::kinetics::RateConstant;
use serde::{Deserialize, Serialize};

/// Conversion from cm/yr to m/day.
pub const CENTIMETERS_PER_YEAR: f64 = 2.73791e-5;

/// Parameters for the two-layer sediment model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SedimentParameters {
    /// Total active sediment depth [m].
    /// default: 0.1
    pub depth: f64,

    /// Burial velocity [cm/yr].
    /// default: 0.25
    pub burial: f64,

    /// Dissolved-phase mixing coefficient [m^2/day].
    /// default: (0.001, 1.08)
    pub diffusion: RateConstant,

    /// Particle mixing coefficient [m^2/day].
    /// default: (1.2e-4, 1.117)
    pub particle_mixing: RateConstant,

    /// Marine benthic nitrification, squared-rate [m/day].
    /// default: (0.131, 1.12)
    pub nitrification_marine: RateConstant,

    /// Freshwater benthic nitrification, squared-rate [m/day].
    /// default: (0.2, 1.08)
    pub nitrification_fresh: RateConstant,

    /// Ammonium half-saturation of benthic nitrification [mg N/L]; the
    /// theta corrects the half-saturation itself for temperature.
    /// default: (0.728, 1.13)
    pub km_ammonium: RateConstant,

    /// Oxygen half-saturation of benthic nitrification [mg O2/L].
    /// default: 0.74
    pub km_oxygen: f64,

    /// Ammonium sorption partition coefficient [L/kg solids].
    /// default: 1.0
    pub ammonium_partition: f64,

    /// Marine aerobic-layer denitrification, squared-rate [m/day].
    /// default: (0.1, 1.08)
    pub denitrification_marine: RateConstant,

    /// Freshwater aerobic-layer denitrification, squared-rate [m/day].
    /// default: (0.1, 1.08)
    pub denitrification_fresh: RateConstant,

    /// Anaerobic-layer denitrification, first-order velocity [m/day].
    /// default: (0.25, 1.08)
    pub denitrification_deep: RateConstant,

    /// Salinity at or above which the marine constants apply [ppt].
    /// default: 1.0
    pub salinity_threshold: f64,

    /// Diagenesis of the labile reactivity class [1/day].
    /// default: (0.035, 1.10)
    pub labile_diagenesis: RateConstant,

    /// Diagenesis of the refractory reactivity class [1/day].
    /// default: (0.0018, 1.15)
    pub refractory_diagenesis: RateConstant,

    /// Sediment solids concentration [kg/L].
    /// default: 0.5
    pub solids: f64,

    /// Phosphate sorption partition coefficient [L/kg solids].
    /// default: 20.0
    pub phosphate_partition: f64,

    /// Aerobic-layer phosphate sorption enhancement (dimensionless
    /// multiplier on the partition coefficient).
    /// default: 20.0
    pub phosphate_enhancement: f64,

    /// Silicate sorption partition coefficient [L/kg solids].
    /// default: 100.0
    pub silicate_partition: f64,

    /// Dissolved silica saturation [mg Si/L].
    /// default: 40.0
    pub silicate_saturation: f64,

    /// Dissolution of deposited biogenic silica [1/day].
    /// default: (0.5, 1.10)
    pub silica_dissolution: RateConstant,

    /// Iteration limit for the surface-transfer fixed point.
    /// default: 50
    pub max_iterations: usize,

    /// Relative tolerance of the surface-transfer fixed point.
    /// default: 5e-5
    pub tolerance: f64,

    /// Floor on bottom-water oxygen in the transfer normalization [mg/L].
    /// default: 0.001
    pub oxygen_floor: f64,
}

impl Default for SedimentParameters {
    fn default() -> Self {
        Self {
            // Geometry and transport
            depth: 0.1,
            burial: 0.25,
            diffusion: RateConstant::new(0.001, 1.08),
            particle_mixing: RateConstant::new(1.2e-4, 1.117),

            // Benthic nitrogen cycling
            nitrification_marine: RateConstant::new(0.131, 1.12),
            nitrification_fresh: RateConstant::new(0.2, 1.08),
            km_ammonium: RateConstant::new(0.728, 1.13),
            km_oxygen: 0.74,
            ammonium_partition: 1.0,
            denitrification_marine: RateConstant::new(0.1, 1.08),
            denitrification_fresh: RateConstant::new(0.1, 1.08),
            denitrification_deep: RateConstant::new(0.25, 1.08),
            salinity_threshold: 1.0,

            // Diagenesis
            labile_diagenesis: RateConstant::new(0.035, 1.10),
            refractory_diagenesis: RateConstant::new(0.0018, 1.15),

            // Sorption
            solids: 0.5,
            phosphate_partition: 20.0,
            phosphate_enhancement: 20.0,
            silicate_partition: 100.0,
            silicate_saturation: 40.0,
            silica_dissolution: RateConstant::new(0.5, 1.10),

            // Surface-transfer fixed point
            max_iterations: 50,
            tolerance: 5e-5,
            oxygen_floor: 0.001,
        }
    }
}

impl SedimentParameters {
    /// Burial velocity in m/day.
    pub fn burial_velocity(&self) -> f64 {
        self.burial * CENTIMETERS_PER_YEAR
    }

    /// Benthic nitrification constant for the node's salinity.
    pub fn nitrification(&self, salinity: f64) -> &RateConstant {
        if salinity >= self.salinity_threshold {
            &self.nitrification_marine
        } else {
            &self.nitrification_fresh
        }
    }

    /// Aerobic-layer denitrification constant for the node's salinity.
    pub fn denitrification(&self, salinity: f64) -> &RateConstant {
        if salinity >= self.salinity_threshold {
            &self.denitrification_marine
        } else {
            &self.denitrification_fresh
        }
    }

    /// Dissolved-phase interlayer mixing velocity [m/day], the diffusion
    /// coefficient over the half-depth mixing length.
    pub fn dissolved_mixing(&self, anomaly: f64) -> f64 {
        self.diffusion.at(anomaly) / (0.5 * self.depth)
    }

    /// Particle interlayer mixing velocity [m/day].
    pub fn particulate_mixing(&self, anomaly: f64) -> f64 {
        self.particle_mixing.at(anomaly) / (0.5 * self.depth)
    }

    /// Dissolved fraction at a partition coefficient [L/kg].
    pub fn dissolved_fraction(&self, partition: f64) -> f64 {
        1.0 / (1.0 + self.solids * partition)
    }
}
