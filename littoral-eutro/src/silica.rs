//! Water-Column Silica System
//!
//! Two pools only: particulate biogenic silica, which dissolves toward
//! silicate under the carbon limiter, and dissolved silicate. Diatom
//! grazing short-circuits the loop by moving silicate into frustule
//! debris. Like phosphate, silicate sorbs to suspended solids and the
//! sorbed share settles.

use crate::parameters::SilicaParameters;
use crate::reactor::System;
use littoral_core::errors::LittoralResult;
use littoral_core::mesh::GridShape;
use littoral_core::pool::{exchange, Pool};
use ndarray::Array2;

pub const BIOGENIC: &str = "biogenic-silica";
pub const SILICATE: &str = "silicate";

const NAME: &str = "silica";

/// The water-column silica system.
#[derive(Debug, Clone)]
pub struct Silica {
    biogenic: Pool,
    silicate: Pool,
    parameters: SilicaParameters,
    ledger: f64,
}

impl Silica {
    pub fn new(shape: GridShape) -> Self {
        Self::from_parameters(shape, SilicaParameters::default())
    }

    pub fn from_parameters(shape: GridShape, parameters: SilicaParameters) -> Self {
        Self {
            biogenic: Pool::new(BIOGENIC, shape),
            silicate: Pool::new(SILICATE, shape),
            parameters,
            ledger: 0.0,
        }
    }

    pub fn parameters(&self) -> &SilicaParameters {
        &self.parameters
    }

    /// Carbon-limited dissolution of biogenic silica toward silicate.
    pub fn mineralize(
        &mut self,
        limit: &Array2<f64>,
        anomaly: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<()> {
        let amount = self.parameters.dissolution.field(anomaly)
            * self.biogenic.concentration()
            * limit
            * dt;
        exchange(
            &amount,
            Some(&mut self.biogenic),
            Some(&mut self.silicate),
            &mut self.ledger,
        )
    }

    /// Diatom grazing: silicate bound in frustules returns as debris.
    pub fn graze(&mut self, amount: &Array2<f64>) -> LittoralResult<()> {
        exchange(
            amount,
            Some(&mut self.silicate),
            Some(&mut self.biogenic),
            &mut self.ledger,
        )
    }

    /// Dissolved fraction of the silicate pool against the suspended
    /// solids field [kg/L].
    pub fn partition(&self, solids: &Array2<f64>) -> Array2<f64> {
        solids.mapv(|s| self.parameters.dissolved_fraction(s))
    }
}

impl System for Silica {
    fn name(&self) -> &'static str {
        NAME
    }

    fn shape(&self) -> (usize, usize) {
        self.silicate.shape()
    }

    fn pools(&self) -> Vec<&Pool> {
        vec![&self.biogenic, &self.silicate]
    }

    fn pools_mut(&mut self) -> Vec<&mut Pool> {
        vec![&mut self.biogenic, &mut self.silicate]
    }

    fn ledger(&self) -> f64 {
        self.ledger
    }

    fn ledger_mut(&mut self) -> &mut f64 {
        &mut self.ledger
    }
}
