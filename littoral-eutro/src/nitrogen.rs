//! Water-Column Nitrogen System
//!
//! Organic nitrogen in four pools (particulate and dissolved, labile and
//! refractory) mineralizes stepwise toward ammonium, gated by the carbon
//! limiter. The inorganic pools then cycle through two temperature- and
//! oxygen-sensitive transformations:
//!
//! - Nitrification, ammonium -> NOx, oxygen-limited and suppressed
//!   linearly below the 20 degree reference down to nothing at -20.
//! - Denitrification, NOx -> nitrogen gas, inhibited by oxygen and
//!   limited by the labile carbon offered through the mass-consumer
//!   coupling.
//!
//! The benthic counterpart of these exchanges lives in the sediment
//! module; this system handles the water column only.

use crate::coupling::MassConsumer;
use crate::parameters::NitrogenParameters;
use crate::reactor::System;
use littoral_core::errors::LittoralResult;
use littoral_core::kinetics::{low_temperature_ramp, RateConstant};
use littoral_core::mesh::GridShape;
use littoral_core::pool::{exchange, Pool};
use ndarray::Array2;

/// Oxygen consumed per unit ammonium nitrogen nitrified [g O2/g N].
pub const OXYGEN_PER_NITROGEN: f64 = 64.0 / 14.0;

/// Organic carbon consumed per unit NOx nitrogen denitrified [g C/g N].
pub const CARBON_PER_NITROGEN: f64 = 5.0 / 4.0 * 12.0 / 14.0;

pub const LABILE_PARTICULATE: &str = "labile-particulate-organic-nitrogen";
pub const REFRACTORY_PARTICULATE: &str = "refractory-particulate-organic-nitrogen";
pub const LABILE_DISSOLVED: &str = "labile-dissolved-organic-nitrogen";
pub const REFRACTORY_DISSOLVED: &str = "refractory-dissolved-organic-nitrogen";
pub const AMMONIUM: &str = "ammonium";
pub const NOX: &str = "nox";

const NAME: &str = "nitrogen";

/// One carbon-limited mineralization move.
fn pathway(
    constant: RateConstant,
    limit: &Array2<f64>,
    anomaly: &Array2<f64>,
    dt: f64,
    source: &mut Pool,
    sink: &mut Pool,
    ledger: &mut f64,
) -> LittoralResult<()> {
    let amount = constant.field(anomaly) * source.concentration() * limit * dt;
    exchange(&amount, Some(source), Some(sink), ledger)
}

/// The water-column nitrogen system.
#[derive(Debug, Clone)]
pub struct Nitrogen {
    labile_particulate: Pool,
    refractory_particulate: Pool,
    labile_dissolved: Pool,
    refractory_dissolved: Pool,
    ammonium: Pool,
    nox: Pool,
    parameters: NitrogenParameters,
    ledger: f64,
}

impl Nitrogen {
    pub fn new(shape: GridShape) -> Self {
        Self::from_parameters(shape, NitrogenParameters::default())
    }

    pub fn from_parameters(shape: GridShape, parameters: NitrogenParameters) -> Self {
        Self {
            labile_particulate: Pool::new(LABILE_PARTICULATE, shape),
            refractory_particulate: Pool::new(REFRACTORY_PARTICULATE, shape),
            labile_dissolved: Pool::new(LABILE_DISSOLVED, shape),
            refractory_dissolved: Pool::new(REFRACTORY_DISSOLVED, shape),
            ammonium: Pool::new(AMMONIUM, shape),
            nox: Pool::new(NOX, shape),
            parameters,
            ledger: 0.0,
        }
    }

    pub fn parameters(&self) -> &NitrogenParameters {
        &self.parameters
    }

    /// Carbon-limited mineralization of the organic pools toward ammonium.
    pub fn mineralize(
        &mut self,
        limit: &Array2<f64>,
        anomaly: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<()> {
        pathway(
            self.parameters.refractory_hydrolysis,
            limit,
            anomaly,
            dt,
            &mut self.refractory_particulate,
            &mut self.refractory_dissolved,
            &mut self.ledger,
        )?;
        pathway(
            self.parameters.labile_hydrolysis,
            limit,
            anomaly,
            dt,
            &mut self.labile_particulate,
            &mut self.labile_dissolved,
            &mut self.ledger,
        )?;
        pathway(
            self.parameters.refractory_mineralization,
            limit,
            anomaly,
            dt,
            &mut self.refractory_dissolved,
            &mut self.ammonium,
            &mut self.ledger,
        )?;
        pathway(
            self.parameters.labile_mineralization,
            limit,
            anomaly,
            dt,
            &mut self.labile_dissolved,
            &mut self.ammonium,
            &mut self.ledger,
        )
    }

    /// Oxidize ammonium to NOx, drawing oxygen at 64/14 per unit nitrogen.
    pub fn nitrify(
        &mut self,
        oxygen: &mut dyn MassConsumer,
        anomaly: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<()> {
        let km = self.parameters.km_nitrification;
        let monod = oxygen.field().mapv(|o| o / (km + o));
        let ramp = anomaly.mapv(low_temperature_ramp);

        let amount = self.parameters.nitrification.field(anomaly)
            * self.ammonium.concentration()
            * &monod
            * &ramp
            * dt;
        exchange(&amount, Some(&mut self.ammonium), Some(&mut self.nox), &mut self.ledger)?;
        oxygen.consume(&(amount * OXYGEN_PER_NITROGEN))
    }

    /// Reduce NOx to nitrogen gas, burning labile carbon.
    ///
    /// The gas loss is one-sided; the carbon draw goes through the
    /// mass-consumer coupling at 5/4 * 12/14 per unit nitrogen.
    pub fn denitrify(
        &mut self,
        oxygen: &dyn MassConsumer,
        carbon: &mut dyn MassConsumer,
        anomaly: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<()> {
        let km = self.parameters.km_denitrification;
        let inhibition = oxygen.field().mapv(|o| km / (km + o));
        let available = carbon.availability();

        let amount = self.parameters.denitrification.field(anomaly)
            * self.nox.concentration()
            * &inhibition
            * &available
            * dt;
        exchange(&amount, Some(&mut self.nox), None, &mut self.ledger)?;
        carbon.consume(&(amount * CARBON_PER_NITROGEN))
    }

    /// The inorganic transformations for one step, optionally receiving
    /// the phytoplankton excretion flux first.
    ///
    /// Excreted nitrogen bypasses the ammonium preference split, so the
    /// NOx-side uptake share is returned to the ammonium pool.
    pub fn integrate(
        &mut self,
        oxygen: &mut dyn MassConsumer,
        carbon: &mut dyn MassConsumer,
        anomaly: &Array2<f64>,
        excretion: Option<&Array2<f64>>,
        dt: f64,
    ) -> LittoralResult<()> {
        if let Some(flux) = excretion {
            exchange(flux, Some(&mut self.nox), Some(&mut self.ammonium), &mut self.ledger)?;
        }
        self.nitrify(oxygen, anomaly, dt)?;
        self.denitrify(oxygen, carbon, anomaly, dt)
    }
}

impl System for Nitrogen {
    fn name(&self) -> &'static str {
        NAME
    }

    fn shape(&self) -> (usize, usize) {
        self.ammonium.shape()
    }

    fn pools(&self) -> Vec<&Pool> {
        vec![
            &self.labile_particulate,
            &self.refractory_particulate,
            &self.labile_dissolved,
            &self.refractory_dissolved,
            &self.ammonium,
            &self.nox,
        ]
    }

    fn pools_mut(&mut self) -> Vec<&mut Pool> {
        vec![
            &mut self.labile_particulate,
            &mut self.refractory_particulate,
            &mut self.labile_dissolved,
            &mut self.refractory_dissolved,
            &mut self.ammonium,
            &mut self.nox,
        ]
    }

    fn ledger(&self) -> f64 {
        self.ledger
    }

    fn ledger_mut(&mut self) -> &mut f64 {
        &mut self.ledger
    }
}
