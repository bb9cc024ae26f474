//! Water-Column Phosphorus System
//!
//! Mirrors the nitrogen mineralization chain: four organic pools release
//! phosphate under the carbon limiter. Phosphate itself partitions
//! between a dissolved phase and a solids-sorbed phase; only the sorbed
//! share takes part in particulate settling.

use crate::parameters::PhosphorusParameters;
use crate::reactor::System;
use littoral_core::errors::LittoralResult;
use littoral_core::kinetics::RateConstant;
use littoral_core::mesh::GridShape;
use littoral_core::pool::{exchange, Pool};
use ndarray::Array2;

pub const LABILE_PARTICULATE: &str = "labile-particulate-organic-phosphorus";
pub const REFRACTORY_PARTICULATE: &str = "refractory-particulate-organic-phosphorus";
pub const LABILE_DISSOLVED: &str = "labile-dissolved-organic-phosphorus";
pub const REFRACTORY_DISSOLVED: &str = "refractory-dissolved-organic-phosphorus";
pub const PHOSPHATE: &str = "phosphate";

const NAME: &str = "phosphorus";

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

/// The water-column phosphorus system.
#[derive(Debug, Clone)]
pub struct Phosphorus {
    labile_particulate: Pool,
    refractory_particulate: Pool,
    labile_dissolved: Pool,
    refractory_dissolved: Pool,
    phosphate: Pool,
    parameters: PhosphorusParameters,
    ledger: f64,
}

impl Phosphorus {
    pub fn new(shape: GridShape) -> Self {
        Self::from_parameters(shape, PhosphorusParameters::default())
    }

    pub fn from_parameters(shape: GridShape, parameters: PhosphorusParameters) -> Self {
        Self {
            labile_particulate: Pool::new(LABILE_PARTICULATE, shape),
            refractory_particulate: Pool::new(REFRACTORY_PARTICULATE, shape),
            labile_dissolved: Pool::new(LABILE_DISSOLVED, shape),
            refractory_dissolved: Pool::new(REFRACTORY_DISSOLVED, shape),
            phosphate: Pool::new(PHOSPHATE, shape),
            parameters,
            ledger: 0.0,
        }
    }

    pub fn parameters(&self) -> &PhosphorusParameters {
        &self.parameters
    }

    /// Carbon-limited mineralization of the organic pools toward phosphate.
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
            &mut self.phosphate,
            &mut self.ledger,
        )?;
        pathway(
            self.parameters.labile_mineralization,
            limit,
            anomaly,
            dt,
            &mut self.labile_dissolved,
            &mut self.phosphate,
            &mut self.ledger,
        )
    }

    /// Dissolved fraction of the phosphate pool against the suspended
    /// solids field [kg/L].
    pub fn partition(&self, solids: &Array2<f64>) -> Array2<f64> {
        solids.mapv(|s| self.parameters.dissolved_fraction(s))
    }
}

impl System for Phosphorus {
    fn name(&self) -> &'static str {
        NAME
    }

    fn shape(&self) -> (usize, usize) {
        self.phosphate.shape()
    }

    fn pools(&self) -> Vec<&Pool> {
        vec![
            &self.labile_particulate,
            &self.refractory_particulate,
            &self.labile_dissolved,
            &self.refractory_dissolved,
            &self.phosphate,
        ]
    }

    fn pools_mut(&mut self) -> Vec<&mut Pool> {
        vec![
            &mut self.labile_particulate,
            &mut self.refractory_particulate,
            &mut self.labile_dissolved,
            &mut self.refractory_dissolved,
            &mut self.phosphate,
        ]
    }

    fn ledger(&self) -> f64 {
        self.ledger
    }

    fn ledger_mut(&mut self) -> &mut f64 {
        &mut self.ledger
    }
}
