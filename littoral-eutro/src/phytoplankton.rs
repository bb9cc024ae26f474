//! Phytoplankton Group
//!
//! One instance per taxon or functional group, each carrying a single
//! biomass pool in carbon units plus cell quotas for nitrogen,
//! phosphorus and silica. A step runs in two phases around the nutrient
//! kinetics:
//!
//! - [`prepare`](Phytoplankton::prepare) recomputes state (chlorophyll),
//!   limitation terms (Steele light curve, nutrient Michaelis terms,
//!   ammonium preference) and the temperature-adjusted rates. The
//!   NOx-sourced share of nitrogen uptake is published through
//!   [`excrete`](Phytoplankton::excrete) for the nitrogen system.
//! - [`metabolize`](Phytoplankton::metabolize) applies production,
//!   respiration and grazing against the carbon and oxygen systems, then
//!   relaxes the quotas toward the ambient limitation.
//!
//! If any stage fails, the later stages for the group do not run.

use crate::carbon::{Carbon, OXYGEN_PER_CARBON};
use crate::coupling::MassConsumer;
use crate::nitrogen::{Nitrogen, AMMONIUM, NOX};
use crate::oxygen::Oxygen;
use crate::parameters::PhytoplanktonParameters;
use crate::phosphorus::{Phosphorus, PHOSPHATE};
use crate::reactor::System;
use crate::silica::{Silica, SILICATE};
use littoral_core::errors::LittoralResult;
use littoral_core::kinetics::REFERENCE_TEMPERATURE;
use littoral_core::mesh::GridShape;
use littoral_core::pool::{exchange, Pool};
use ndarray::Array2;

/// Extra oxygen evolved per unit nitrate-sourced nitrogen, from the
/// reduction of NOx to cell nitrogen [g O2/g N].
pub const OXYGEN_PER_NITRATE: f64 = 48.0 / 14.0;

/// Micrograms of chlorophyll per milligram (the concentration fields are
/// mg/L, chlorophyll is conventionally ug/L).
const CHLOROPHYLL_UNITS: f64 = 1000.0;

pub const BIOMASS: &str = "phytoplankton-carbon";

const NAME: &str = "phytoplankton";

/// Quota relaxation toward its target: implicit first-order decay with
/// rate `k`, so a zero-production winter cannot overshoot.
fn relax(
    quota: &mut Array2<f64>,
    limit: &Array2<f64>,
    parameters: &PhytoplanktonParameters,
    ratio: f64,
    dt: f64,
) {
    let k = parameters.relaxation;
    for ((node, layer), quota) in quota.indexed_iter_mut() {
        let target = parameters.quota_target(ratio, limit[[node, layer]]);
        *quota = (*quota + dt * k * target) / (1.0 + dt * k);
    }
}

/// One phytoplankton group.
#[derive(Debug, Clone)]
pub struct Phytoplankton {
    biomass: Pool,
    quota_nitrogen: Array2<f64>,
    quota_phosphorus: Array2<f64>,
    quota_silica: Array2<f64>,
    chlorophyll: Array2<f64>,
    preference: Array2<f64>,
    light_limit: Array2<f64>,
    nitrogen_limit: Array2<f64>,
    phosphorus_limit: Array2<f64>,
    silica_limit: Array2<f64>,
    nutrient_limit: Array2<f64>,
    production_rate: Array2<f64>,
    respiration_rate: Array2<f64>,
    grazing_rate: Array2<f64>,
    parameters: PhytoplanktonParameters,
    ledger: f64,
}

impl Phytoplankton {
    pub fn new(shape: GridShape) -> Self {
        Self::from_parameters(shape, PhytoplanktonParameters::default())
    }

    /// New group with replete quotas and idle rates.
    pub fn from_parameters(shape: GridShape, parameters: PhytoplanktonParameters) -> Self {
        Self {
            biomass: Pool::new(BIOMASS, shape),
            quota_nitrogen: shape.filled(parameters.ratio_nitrogen),
            quota_phosphorus: shape.filled(parameters.ratio_phosphorus),
            quota_silica: shape.filled(parameters.ratio_silica),
            chlorophyll: shape.zeros(),
            preference: shape.zeros(),
            light_limit: shape.filled(1.0),
            nitrogen_limit: shape.filled(1.0),
            phosphorus_limit: shape.filled(1.0),
            silica_limit: shape.filled(1.0),
            nutrient_limit: shape.filled(1.0),
            production_rate: shape.zeros(),
            respiration_rate: shape.zeros(),
            grazing_rate: shape.zeros(),
            parameters,
            ledger: 0.0,
        }
    }

    pub fn parameters(&self) -> &PhytoplanktonParameters {
        &self.parameters
    }

    pub fn biomass(&self) -> &Pool {
        &self.biomass
    }

    /// Chlorophyll diagnostic [ug/L], from the last `prepare`.
    pub fn chlorophyll(&self) -> &Array2<f64> {
        &self.chlorophyll
    }

    /// Ammonium preference of nitrogen uptake, from the last `prepare`.
    pub fn preference(&self) -> &Array2<f64> {
        &self.preference
    }

    pub fn light_limit(&self) -> &Array2<f64> {
        &self.light_limit
    }

    pub fn nutrient_limit(&self) -> &Array2<f64> {
        &self.nutrient_limit
    }

    /// Specific production rate [1/day], from the last `prepare`.
    pub fn production_rate(&self) -> &Array2<f64> {
        &self.production_rate
    }

    pub fn quota_nitrogen(&self) -> &Array2<f64> {
        &self.quota_nitrogen
    }

    pub fn quota_phosphorus(&self) -> &Array2<f64> {
        &self.quota_phosphorus
    }

    pub fn quota_silica(&self) -> &Array2<f64> {
        &self.quota_silica
    }

    /// Nitrogen bound in biomass [mg N/L].
    pub fn nitrogen_content(&self) -> Array2<f64> {
        &self.quota_nitrogen * self.biomass.concentration()
    }

    /// Phosphorus bound in biomass [mg P/L].
    pub fn phosphorus_content(&self) -> Array2<f64> {
        &self.quota_phosphorus * self.biomass.concentration()
    }

    /// Silica bound in biomass [mg Si/L].
    pub fn silica_content(&self) -> Array2<f64> {
        &self.quota_silica * self.biomass.concentration()
    }

    /// Growth phase: state, limitation terms and rates for this step.
    ///
    /// `light` is the ambient-over-optimal saturation ratio supplied by
    /// the light driver. Absent nutrient systems leave their limitation
    /// term at one.
    pub fn prepare(
        &mut self,
        nitrogen: &Nitrogen,
        phosphorus: Option<&Phosphorus>,
        silica: Option<&Silica>,
        light: &Array2<f64>,
        anomaly: &Array2<f64>,
    ) -> LittoralResult<()> {
        // State: chlorophyll follows biomass through the fixed ratio.
        self.chlorophyll = self.biomass.concentration() * (CHLOROPHYLL_UNITS / self.parameters.carbon_chlorophyll);

        // Limits.
        self.light_limit = light.mapv(|x| x * (1.0 - x).exp());

        let ammonium = nitrogen.pool(AMMONIUM)?.concentration();
        let nox = nitrogen.pool(NOX)?.concentration();
        let km = self.parameters.km_nitrogen;
        for ((node, layer), preference) in self.preference.indexed_iter_mut() {
            let ammonium = ammonium[[node, layer]];
            let nox = nox[[node, layer]];
            *preference = if ammonium + nox > 0.0 {
                ammonium * nox / ((km + ammonium) * (km + nox))
                    + ammonium * km / ((ammonium + nox) * (km + nox))
            } else {
                0.0
            };
        }
        for ((node, layer), limit) in self.nitrogen_limit.indexed_iter_mut() {
            let din = ammonium[[node, layer]] + nox[[node, layer]];
            *limit = din / (km + din);
        }

        match phosphorus {
            Some(phosphorus) => {
                let km = self.parameters.km_phosphorus;
                let phosphate = phosphorus.pool(PHOSPHATE)?.concentration();
                self.phosphorus_limit = phosphate.mapv(|c| c / (km + c));
            }
            None => self.phosphorus_limit.fill(1.0),
        }
        match silica {
            Some(silica) => {
                let km = self.parameters.km_silica;
                let silicate = silica.pool(SILICATE)?.concentration();
                self.silica_limit = silicate.mapv(|c| c / (km + c));
            }
            None => self.silica_limit.fill(1.0),
        }
        for ((node, layer), limit) in self.nutrient_limit.indexed_iter_mut() {
            *limit = self.nitrogen_limit[[node, layer]]
                .min(self.phosphorus_limit[[node, layer]])
                .min(self.silica_limit[[node, layer]]);
        }

        // Rates.
        let growth = self.parameters.growth;
        for ((node, layer), rate) in self.production_rate.indexed_iter_mut() {
            let temperature = REFERENCE_TEMPERATURE + anomaly[[node, layer]];
            *rate = growth
                * self.parameters.optimum(temperature)
                * self.light_limit[[node, layer]]
                * self.nutrient_limit[[node, layer]];
        }
        self.respiration_rate = self.parameters.respiration.field(anomaly);
        self.grazing_rate = self.parameters.grazing.field(anomaly);
        Ok(())
    }

    /// NOx-sourced nitrogen uptake of this step's production [mg N/L],
    /// rerouted by `Nitrogen::integrate`.
    pub fn excrete(&self, dt: f64) -> Array2<f64> {
        let bypass = self.preference.mapv(|p| 1.0 - p);
        bypass * &self.quota_nitrogen * &self.production_rate * self.biomass.concentration() * dt
    }

    /// Metabolic phase: apply production, respiration and grazing, then
    /// relax the quotas.
    pub fn metabolize(
        &mut self,
        carbon: &mut Carbon,
        oxygen: &mut Oxygen,
        silica: Option<&mut Silica>,
        dt: f64,
    ) -> LittoralResult<()> {
        let production = &self.production_rate * self.biomass.concentration() * dt;

        // Production: the excreted share stays with the carbon system,
        // the rest becomes biomass.
        let retained = carbon.exude(&production)?;
        exchange(&retained, None, Some(&mut self.biomass), &mut self.ledger)?;

        // Respiration burns biomass and oxygen.
        let respiration = &self.respiration_rate * self.biomass.concentration() * dt;
        exchange(&respiration, Some(&mut self.biomass), None, &mut self.ledger)?;
        oxygen.consume(&(&respiration * OXYGEN_PER_CARBON))?;

        // Photosynthetic oxygen: fixation itself plus the surplus from
        // reducing the NOx-sourced share of nitrogen uptake.
        let mut evolved = production.clone();
        for ((node, layer), value) in evolved.indexed_iter_mut() {
            let bypass = 1.0 - self.preference[[node, layer]];
            *value *= OXYGEN_PER_CARBON
                + OXYGEN_PER_NITRATE * self.quota_nitrogen[[node, layer]] * bypass;
        }
        oxygen.produce(&evolved)?;

        // Grazing losses land in the carbon pools by the configured
        // fractions; diatom frustules return to the silica debris pool.
        let grazed = &self.grazing_rate * self.biomass.concentration() * dt;
        carbon.graze(&grazed, &mut self.biomass, &mut self.ledger)?;
        if let Some(silica) = silica {
            silica.graze(&(&grazed * &self.quota_silica))?;
        }

        // Quotas drift toward equilibrium with the ambient limitation.
        relax(
            &mut self.quota_nitrogen,
            &self.nitrogen_limit,
            &self.parameters,
            self.parameters.ratio_nitrogen,
            dt,
        );
        relax(
            &mut self.quota_phosphorus,
            &self.phosphorus_limit,
            &self.parameters,
            self.parameters.ratio_phosphorus,
            dt,
        );
        relax(
            &mut self.quota_silica,
            &self.silica_limit,
            &self.parameters,
            self.parameters.ratio_silica,
            dt,
        );
        Ok(())
    }
}

impl System for Phytoplankton {
    fn name(&self) -> &'static str {
        NAME
    }

    fn shape(&self) -> (usize, usize) {
        self.biomass.shape()
    }

    fn pools(&self) -> Vec<&Pool> {
        vec![&self.biomass]
    }

    fn pools_mut(&mut self) -> Vec<&mut Pool> {
        vec![&mut self.biomass]
    }

    fn ledger(&self) -> f64 {
        self.ledger
    }

    fn ledger_mut(&mut self) -> &mut f64 {
        &mut self.ledger
    }
}
