//! Dissolved Oxygen System
//!
//! Two pools: dissolved oxygen and the reduced-species oxygen
//! equivalents carried as chemical oxygen demand. Oxidation of the
//! equivalents draws both pools down together, limited by the carbon
//! mineralization term and an oxygen Michaelis factor.
//!
//! The system exposes the saturation deficit (for an external reaeration
//! driver) and the hypoxic positions with their decay exponents (for the
//! sediment model's aerobic suppression). Coupled systems draw their
//! oxidation demand through the [`MassConsumer`] capability.

use crate::coupling::MassConsumer;
use crate::parameters::OxygenParameters;
use crate::reactor::System;
use littoral_core::errors::LittoralResult;
use littoral_core::mesh::GridShape;
use littoral_core::pool::{exchange, Pool};
use ndarray::{Array1, Array2, ArrayView2};

pub const OXYGEN: &str = "oxygen";
pub const EQUIVALENTS: &str = "oxygen-equivalents";

const NAME: &str = "oxygen";

/// Dissolved oxygen saturation [mg/L] from temperature [Celsius] and
/// salinity [ppt].
pub fn saturation_value(temperature: f64, salinity: f64) -> f64 {
    14.6244 - 0.36713 * temperature + 0.0044972 * temperature * temperature - 0.0966 * salinity
        + 0.00205 * salinity * temperature
        + 0.0002739 * salinity * salinity
}

/// The dissolved oxygen system.
#[derive(Debug, Clone)]
pub struct Oxygen {
    oxygen: Pool,
    equivalents: Pool,
    sulfide: Array2<f64>,
    parameters: OxygenParameters,
    ledger: f64,
}

impl Oxygen {
    pub fn new(shape: GridShape) -> Self {
        Self::from_parameters(shape, OxygenParameters::default())
    }

    pub fn from_parameters(shape: GridShape, parameters: OxygenParameters) -> Self {
        Self {
            oxygen: Pool::new(OXYGEN, shape),
            equivalents: Pool::new(EQUIVALENTS, shape),
            sulfide: shape.zeros(),
            parameters,
            ledger: 0.0,
        }
    }

    pub fn parameters(&self) -> &OxygenParameters {
        &self.parameters
    }

    /// Oxidize the equivalents pool against dissolved oxygen.
    ///
    /// `limit` is the carbon mineralization limiter; the oxidized amount
    /// leaves both pools. Also refreshes the sulfide diagnostic, the
    /// equivalents fraction expected to persist as hydrogen sulfide.
    pub fn integrate(
        &mut self,
        limit: &Array2<f64>,
        anomaly: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<()> {
        let km = self.parameters.km_oxygen;
        let rate = self.parameters.equivalents_oxidation.field(anomaly);
        let monod = self.oxygen.concentration().mapv(|o| o / (km + o));

        let amount = &rate * self.equivalents.concentration() * limit * &monod * dt;
        exchange(&amount, Some(&mut self.equivalents), None, &mut self.ledger)?;
        exchange(&amount, Some(&mut self.oxygen), None, &mut self.ledger)?;

        let persistence = rate.mapv(|r| 1.0 - (-5.0 * r).exp());
        self.sulfide = self.equivalents.concentration() * &persistence;
        Ok(())
    }

    /// Hydrogen sulfide fraction of the equivalents pool, refreshed by
    /// [`Oxygen::integrate`].
    pub fn sulfide(&self) -> &Array2<f64> {
        &self.sulfide
    }

    /// Saturation deficit per unit volume, for an external reaeration
    /// driver. Positive values mean the water is undersaturated.
    pub fn saturation(
        &self,
        temperature: &Array2<f64>,
        salinity: &Array1<f64>,
        volume: &Array2<f64>,
    ) -> Array2<f64> {
        let mut deficit = self.oxygen.concentration().clone();
        for ((node, layer), value) in deficit.indexed_iter_mut() {
            let equilibrium = saturation_value(temperature[[node, layer]], salinity[node]);
            *value = (equilibrium - *value) / volume[[node, layer]];
        }
        deficit
    }

    /// Positions below the hypoxia threshold, with the exponent
    /// `oxygen/threshold - 1` used to decay aerobic sediment processes.
    pub fn critical(&self) -> Vec<(usize, usize, f64)> {
        let threshold = self.parameters.critical_threshold;
        self.oxygen
            .concentration()
            .indexed_iter()
            .filter(|&(_, &value)| value < threshold)
            .map(|((node, layer), &value)| (node, layer, value / threshold - 1.0))
            .collect()
    }

    /// One-sided injection of photosynthetic or reaeration oxygen.
    pub fn produce(&mut self, amount: &Array2<f64>) -> LittoralResult<()> {
        exchange(amount, None, Some(&mut self.oxygen), &mut self.ledger)
    }
}

impl MassConsumer for Oxygen {
    fn field(&self) -> ArrayView2<'_, f64> {
        self.oxygen.concentration().view()
    }

    fn consume(&mut self, demand: &Array2<f64>) -> LittoralResult<()> {
        exchange(demand, Some(&mut self.oxygen), None, &mut self.ledger)
    }
}

impl System for Oxygen {
    fn name(&self) -> &'static str {
        NAME
    }

    fn shape(&self) -> (usize, usize) {
        self.oxygen.shape()
    }

    fn pools(&self) -> Vec<&Pool> {
        vec![&self.oxygen, &self.equivalents]
    }

    fn pools_mut(&mut self) -> Vec<&mut Pool> {
        vec![&mut self.oxygen, &mut self.equivalents]
    }

    fn ledger(&self) -> f64 {
        self.ledger
    }

    fn ledger_mut(&mut self) -> &mut f64 {
        &mut self.ledger
    }
}
