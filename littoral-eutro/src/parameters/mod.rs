//! Parameter structs for the eutrophication systems.
//!
//! Every system takes an immutable parameters struct at construction;
//! defaults reproduce the reference constant set, and each struct
//! (de)serializes with serde so whole configurations load from TOML.

mod carbon;
mod nitrogen;
mod oxygen;
mod phosphorus;
mod phytoplankton;
mod sediment;
mod settling;
mod silica;

pub use carbon::{CarbonParameters, GrazingFractions};
pub use nitrogen::NitrogenParameters;
pub use oxygen::OxygenParameters;
pub use phosphorus::PhosphorusParameters;
pub use phytoplankton::PhytoplanktonParameters;
pub use sediment::{SedimentParameters, CENTIMETERS_PER_YEAR};
pub use settling::SettlingParameters;
pub use silica::SilicaParameters;

use littoral_core::errors::{LittoralError, LittoralResult};
use serde::{Deserialize, Serialize};

/// Aggregated configuration for one simulation.
///
/// Every section is optional in the TOML source and falls back to the
/// reference defaults; `phytoplankton` holds one entry per group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub carbon: CarbonParameters,
    #[serde(default)]
    pub oxygen: OxygenParameters,
    #[serde(default)]
    pub nitrogen: NitrogenParameters,
    #[serde(default)]
    pub phosphorus: PhosphorusParameters,
    #[serde(default)]
    pub silica: SilicaParameters,
    #[serde(default)]
    pub phytoplankton: Vec<PhytoplanktonParameters>,
    #[serde(default)]
    pub settling: SettlingParameters,
    #[serde(default)]
    pub sediment: SedimentParameters,
}

impl SimulationConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> LittoralResult<Self> {
        toml::from_str(text)
            .map_err(|error| LittoralError::Configuration(format!("configuration: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_the_full_default_configuration() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert_eq!(config.carbon.km_oxygen, 0.2);
        assert_eq!(config.nitrogen.km_nitrification, 1.0);
        assert!(config.phytoplankton.is_empty());
    }

    #[test]
    fn a_partial_section_overrides_only_its_fields() {
        let config = SimulationConfig::from_toml(
            r#"
            [oxygen]
            critical_threshold = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(config.oxygen.critical_threshold, 3.0);
        assert_eq!(config.oxygen.km_oxygen, 0.1);
        assert_eq!(config.sediment.depth, 0.1);
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let result = SimulationConfig::from_toml("[oxygen\nbroken");
        assert!(matches!(
            result,
            Err(littoral_core::errors::LittoralError::Configuration(_))
        ));
    }

    #[test]
    fn phytoplankton_groups_parse_as_an_array_of_tables() {
        let config = SimulationConfig::from_toml(
            r#"
            [[phytoplankton]]
            growth = 1.5

            [[phytoplankton]]
            growth = 2.5
            optimum_temperature = 12.0
            "#,
        )
        .unwrap();
        assert_eq!(config.phytoplankton.len(), 2);
        assert_eq!(config.phytoplankton[0].growth, 1.5);
        assert_eq!(config.phytoplankton[1].optimum_temperature, 12.0);
        assert_eq!(config.phytoplankton[1].km_silica, 0.02);
    }
}
