//! Gravitational Settling of Particulate Pools
//!
//! Particulate material is displaced down one layer per step at a
//! temperature-corrected velocity; the bottom-layer flux leaves the
//! water column as areal deposition. Pathways:
//!
//! - organic particulates (carbon, nitrogen, phosphorus, biogenic
//!   silica) at the particulate-organic velocity,
//! - recycled carbon at the concentration-dependent solids velocity,
//! - the solids-sorbed shares of phosphate and silicate at the sorbed
//!   mineral velocity,
//! - each phytoplankton group's biomass at its own settling velocity,
//!   deposited as labile organics scaled by the bottom-layer quotas.

use crate::carbon::{self, Carbon};
use crate::nitrogen::{self, Nitrogen};
use crate::parameters::SettlingParameters;
use crate::phosphorus::{self, Phosphorus};
use crate::phytoplankton::{self, Phytoplankton};
use crate::reactor::System;
use crate::silica::{self, Silica};
use littoral_core::errors::LittoralResult;
use littoral_core::mesh::Mesh;
use ndarray::{Array1, Array2};

/// One step's deposition: the benthic temperature correction and the
/// areal mass leaving the bottom layer, keyed by source pool.
#[derive(Debug, Clone)]
pub struct Deposition {
    /// Deposition temperature correction per node.
    pub correction: Array1<f64>,
    /// Areal export per pool key [g/m2].
    pub exports: Vec<(String, Array1<f64>)>,
}

/// Layer displacement per cell: `concentration * velocity * dt` spread
/// over the node's layer thickness.
fn displacement(
    concentration: &Array2<f64>,
    velocity: &Array2<f64>,
    thickness: &Array1<f64>,
    dt: f64,
) -> Array2<f64> {
    let mut flux = concentration * velocity;
    for (node, mut row) in flux.outer_iter_mut().enumerate() {
        row *= dt / thickness[node];
    }
    flux
}

/// The settling stage of the reactor pipeline.
#[derive(Debug, Clone, Default)]
pub struct Settling {
    parameters: SettlingParameters,
}

impl Settling {
    pub fn new(parameters: SettlingParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &SettlingParameters {
        &self.parameters
    }

    /// Settle every particulate pool and collect the bottom exports.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        mesh: &Mesh,
        anomaly: &Array2<f64>,
        dt: f64,
        carbon: &mut Carbon,
        nitrogen: Option<&mut Nitrogen>,
        phosphorus: Option<&mut Phosphorus>,
        silica: Option<&mut Silica>,
        phytoplankton: &mut [Phytoplankton],
        solids: &Array2<f64>,
    ) -> LittoralResult<Deposition> {
        let shape = mesh.shape();
        let bottom = shape.bottom();
        let thickness = mesh.depth() / shape.layers as f64;
        let organic = self.parameters.particulate_organic.field(anomaly);
        let sorbed = self.parameters.sorbed_mineral.field(anomaly);
        let mut exports: Vec<(String, Array1<f64>)> = Vec::new();

        for key in [carbon::LABILE_PARTICULATE, carbon::REFRACTORY_PARTICULATE] {
            let flux = displacement(carbon.pool(key)?.concentration(), &organic, &thickness, dt);
            let export = carbon.settle(key, &flux)?;
            exports.push((key.to_string(), export * &thickness));
        }
        // Recycled carbon rides the suspended solids.
        let velocity = solids.mapv(|s| carbon.parameters().solids_velocity(s));
        let flux = displacement(
            carbon.pool(carbon::RECYCLED_PARTICULATE)?.concentration(),
            &velocity,
            &thickness,
            dt,
        );
        let export = carbon.settle(carbon::RECYCLED_PARTICULATE, &flux)?;
        exports.push((carbon::RECYCLED_PARTICULATE.to_string(), export * &thickness));

        if let Some(nitrogen) = nitrogen {
            for key in [nitrogen::LABILE_PARTICULATE, nitrogen::REFRACTORY_PARTICULATE] {
                let flux =
                    displacement(nitrogen.pool(key)?.concentration(), &organic, &thickness, dt);
                let export = nitrogen.settle(key, &flux)?;
                exports.push((key.to_string(), export * &thickness));
            }
        }

        if let Some(phosphorus) = phosphorus {
            for key in [
                phosphorus::LABILE_PARTICULATE,
                phosphorus::REFRACTORY_PARTICULATE,
            ] {
                let flux =
                    displacement(phosphorus.pool(key)?.concentration(), &organic, &thickness, dt);
                let export = phosphorus.settle(key, &flux)?;
                exports.push((key.to_string(), export * &thickness));
            }
            // Only the solids-sorbed share of phosphate settles.
            let bound = phosphorus.partition(solids).mapv(|fd| 1.0 - fd)
                * phosphorus.pool(phosphorus::PHOSPHATE)?.concentration();
            let flux = displacement(&bound, &sorbed, &thickness, dt);
            let export = phosphorus.settle(phosphorus::PHOSPHATE, &flux)?;
            exports.push((phosphorus::PHOSPHATE.to_string(), export * &thickness));
        }

        if let Some(silica) = silica {
            let flux = displacement(
                silica.pool(silica::BIOGENIC)?.concentration(),
                &organic,
                &thickness,
                dt,
            );
            let export = silica.settle(silica::BIOGENIC, &flux)?;
            exports.push((silica::BIOGENIC.to_string(), export * &thickness));

            let bound = silica.partition(solids).mapv(|fd| 1.0 - fd)
                * silica.pool(silica::SILICATE)?.concentration();
            let flux = displacement(&bound, &sorbed, &thickness, dt);
            let export = silica.settle(silica::SILICATE, &flux)?;
            exports.push((silica::SILICATE.to_string(), export * &thickness));
        }

        for group in phytoplankton {
            let velocity = group.parameters().settling.field(anomaly);
            let flux = displacement(
                group.pool(phytoplankton::BIOMASS)?.concentration(),
                &velocity,
                &thickness,
                dt,
            );
            let export = group.settle(phytoplankton::BIOMASS, &flux)?;
            let areal = export * &thickness;

            // Settled biomass arrives as fresh labile organic matter, its
            // nutrient content fixed by the bottom-layer quotas.
            let quota_n = group.quota_nitrogen().column(bottom).to_owned();
            let quota_p = group.quota_phosphorus().column(bottom).to_owned();
            let quota_si = group.quota_silica().column(bottom).to_owned();
            exports.push((nitrogen::LABILE_PARTICULATE.to_string(), &areal * &quota_n));
            exports.push((phosphorus::LABILE_PARTICULATE.to_string(), &areal * &quota_p));
            exports.push((silica::BIOGENIC.to_string(), &areal * &quota_si));
            exports.push((carbon::LABILE_PARTICULATE.to_string(), areal));
        }

        let correction = anomaly
            .column(bottom)
            .mapv(|a| self.parameters.deposition_correction(a));
        Ok(Deposition {
            correction,
            exports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use littoral_core::kinetics::RateConstant;
    use littoral_core::mesh::GridShape;
    use ndarray::arr2;

    fn exported(deposition: &Deposition, key: &str) -> f64 {
        deposition
            .exports
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v[0])
            .sum()
    }

    #[test]
    fn organic_carbon_moves_down_and_exports_from_the_bottom() {
        let shape = GridShape::new(1, 2);
        let mesh = Mesh::uniform(shape, 100.0, 100.0, 2.0);
        let mut carbon = Carbon::new(shape);
        carbon.pool_mut(carbon::LABILE_PARTICULATE).unwrap().fill(4.0);
        let anomaly = shape.zeros();

        let deposition = Settling::default()
            .apply(
                &mesh,
                &anomaly,
                0.5,
                &mut carbon,
                None,
                None,
                None,
                &mut [],
                &shape.zeros(),
            )
            .unwrap();

        // Layer thickness is 1 m, velocity 1 m/day, so half a layer's
        // content moves per half-day step.
        let pool = carbon.pool(carbon::LABILE_PARTICULATE).unwrap();
        assert_relative_eq!(pool.delta()[[0, 0]], -2.0, max_relative = 1e-12);
        assert_relative_eq!(pool.delta()[[0, 1]], 0.0, max_relative = 1e-12);
        assert_relative_eq!(
            exported(&deposition, carbon::LABILE_PARTICULATE),
            2.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(carbon.ledger(), -2.0, max_relative = 1e-12);
    }

    #[test]
    fn recycled_carbon_stays_suspended_without_a_solids_velocity() {
        let shape = GridShape::new(1, 2);
        let mesh = Mesh::uniform(shape, 100.0, 100.0, 2.0);
        let mut carbon = Carbon::new(shape);
        carbon
            .pool_mut(carbon::RECYCLED_PARTICULATE)
            .unwrap()
            .fill(3.0);

        let deposition = Settling::default()
            .apply(
                &mesh,
                &shape.zeros(),
                1.0,
                &mut carbon,
                None,
                None,
                None,
                &mut [],
                &shape.filled(0.5),
            )
            .unwrap();

        let pool = carbon.pool(carbon::RECYCLED_PARTICULATE).unwrap();
        assert_eq!(pool.delta().sum(), 0.0);
        assert_eq!(exported(&deposition, carbon::RECYCLED_PARTICULATE), 0.0);
    }

    #[test]
    fn only_the_sorbed_phosphate_share_settles() {
        let shape = GridShape::new(1, 2);
        let mesh = Mesh::uniform(shape, 100.0, 100.0, 2.0);
        let mut carbon = Carbon::new(shape);
        let mut phosphorus = Phosphorus::new(shape);
        phosphorus.pool_mut(phosphorus::PHOSPHATE).unwrap().fill(2.0);

        let settling = Settling::new(SettlingParameters {
            sorbed_mineral: RateConstant::new(0.5, 1.027),
            ..SettlingParameters::default()
        });
        let deposition = settling
            .apply(
                &mesh,
                &shape.zeros(),
                1.0,
                &mut carbon,
                None,
                Some(&mut phosphorus),
                None,
                &mut [],
                &shape.filled(0.5),
            )
            .unwrap();

        // Dissolved fraction 1/(1 + 6 * 0.5) leaves 1.5 mg/L sorbed.
        let pool = phosphorus.pool(phosphorus::PHOSPHATE).unwrap();
        assert_relative_eq!(pool.delta()[[0, 0]], -0.75, max_relative = 1e-12);
        assert_relative_eq!(pool.delta()[[0, 1]], 0.0, max_relative = 1e-12);
        assert_relative_eq!(
            exported(&deposition, phosphorus::PHOSPHATE),
            0.75,
            max_relative = 1e-12
        );
    }

    #[test]
    fn settled_biomass_deposits_as_labile_organics_by_quota() {
        let shape = GridShape::new(1, 1);
        let mesh = Mesh::uniform(shape, 100.0, 100.0, 1.0);
        let mut carbon = Carbon::new(shape);
        let mut group = Phytoplankton::new(shape);
        group.pool_mut(phytoplankton::BIOMASS).unwrap().fill(2.0);
        let mut groups = [group];

        let deposition = Settling::default()
            .apply(
                &mesh,
                &shape.zeros(),
                1.0,
                &mut carbon,
                None,
                None,
                None,
                &mut groups,
                &shape.zeros(),
            )
            .unwrap();

        assert_relative_eq!(
            exported(&deposition, carbon::LABILE_PARTICULATE),
            0.5,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            exported(&deposition, nitrogen::LABILE_PARTICULATE),
            0.5 * 0.176,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            exported(&deposition, silica::BIOGENIC),
            0.5 * 0.33,
            max_relative = 1e-12
        );
        assert_relative_eq!(groups[0].ledger(), -0.5, max_relative = 1e-12);
    }

    #[test]
    fn benthic_correction_samples_the_bottom_layer() {
        let shape = GridShape::new(1, 2);
        let mesh = Mesh::uniform(shape, 100.0, 100.0, 2.0);
        let mut carbon = Carbon::new(shape);

        let deposition = Settling::default()
            .apply(
                &mesh,
                &arr2(&[[0.0, 10.0]]),
                1.0,
                &mut carbon,
                None,
                None,
                None,
                &mut [],
                &shape.zeros(),
            )
            .unwrap();

        assert_relative_eq!(
            deposition.correction[0],
            1.027f64.powi(10),
            max_relative = 1e-12
        );
    }
}
