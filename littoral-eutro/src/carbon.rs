//! Organic Carbon System
//!
//! Seven pools: particulate organic carbon in labile, recycled and
//! refractory classes, and dissolved organic carbon in labile, excreted,
//! recycled and refractory classes.
//!
//! Each step runs two transformations:
//!
//! 1. Hydrolysis — every particulate pool releases a temperature-scaled
//!    fraction into its dissolved counterpart.
//! 2. Oxidation — every dissolved pool is oxidized away against the
//!    ambient oxygen field, drawing dissolved oxygen at the fixed
//!    [`OXYGEN_PER_CARBON`] mass ratio. The refractory pool is the only
//!    one exempt from substrate self-limitation.
//!
//! The system also derives the two saturation terms consumed elsewhere:
//! the mineralization limiter handed to the nutrient systems, and the
//! labile-carbon availability drawn down by denitrification.

use crate::coupling::MassConsumer;
use crate::parameters::CarbonParameters;
use crate::reactor::System;
use littoral_core::errors::LittoralResult;
use littoral_core::mesh::GridShape;
use littoral_core::pool::{exchange, Pool};
use ndarray::{Array2, ArrayView2};

/// Oxygen consumed per unit organic carbon oxidized [g O2/g C].
pub const OXYGEN_PER_CARBON: f64 = 2.0 * 16.0 / 12.0;

pub const LABILE_PARTICULATE: &str = "labile-particulate-organic-carbon";
pub const RECYCLED_PARTICULATE: &str = "recycled-particulate-organic-carbon";
pub const REFRACTORY_PARTICULATE: &str = "refractory-particulate-organic-carbon";
pub const LABILE_DISSOLVED: &str = "labile-dissolved-organic-carbon";
pub const EXCRETED_DISSOLVED: &str = "excreted-dissolved-organic-carbon";
pub const RECYCLED_DISSOLVED: &str = "recycled-dissolved-organic-carbon";
pub const REFRACTORY_DISSOLVED: &str = "refractory-dissolved-organic-carbon";

const NAME: &str = "carbon";

/// The organic carbon system.
#[derive(Debug, Clone)]
pub struct Carbon {
    labile_particulate: Pool,
    recycled_particulate: Pool,
    refractory_particulate: Pool,
    labile_dissolved: Pool,
    excreted_dissolved: Pool,
    recycled_dissolved: Pool,
    refractory_dissolved: Pool,
    parameters: CarbonParameters,
    ledger: f64,
}

impl Carbon {
    pub fn new(shape: GridShape) -> Self {
        Self::from_parameters(shape, CarbonParameters::default())
    }

    pub fn from_parameters(shape: GridShape, parameters: CarbonParameters) -> Self {
        Self {
            labile_particulate: Pool::new(LABILE_PARTICULATE, shape),
            recycled_particulate: Pool::new(RECYCLED_PARTICULATE, shape),
            refractory_particulate: Pool::new(REFRACTORY_PARTICULATE, shape),
            labile_dissolved: Pool::new(LABILE_DISSOLVED, shape),
            excreted_dissolved: Pool::new(EXCRETED_DISSOLVED, shape),
            recycled_dissolved: Pool::new(RECYCLED_DISSOLVED, shape),
            refractory_dissolved: Pool::new(REFRACTORY_DISSOLVED, shape),
            parameters,
            ledger: 0.0,
        }
    }

    pub fn parameters(&self) -> &CarbonParameters {
        &self.parameters
    }

    /// Hydrolysis, oxidation and the mineralization limiter for one step.
    ///
    /// `phytoplankton` is the summed biomass carbon concentration when
    /// plankton groups are active; it enters the limiter substrate only.
    pub fn integrate(
        &mut self,
        oxygen: &mut dyn MassConsumer,
        anomaly: &Array2<f64>,
        phytoplankton: Option<&Array2<f64>>,
        dt: f64,
    ) -> LittoralResult<Array2<f64>> {
        self.hydrolyze(anomaly, dt)?;
        self.oxidize(oxygen, anomaly, dt)?;
        Ok(self.limiter(phytoplankton))
    }

    /// Move each particulate pool toward its dissolved counterpart.
    pub fn hydrolyze(&mut self, anomaly: &Array2<f64>, dt: f64) -> LittoralResult<()> {
        let scale = self.parameters.internal() * dt;
        let pathways = [
            (
                &mut self.labile_particulate,
                &mut self.labile_dissolved,
                self.parameters.labile_hydrolysis,
            ),
            (
                &mut self.recycled_particulate,
                &mut self.recycled_dissolved,
                self.parameters.recycled_hydrolysis,
            ),
            (
                &mut self.refractory_particulate,
                &mut self.refractory_dissolved,
                self.parameters.refractory_hydrolysis,
            ),
        ];
        for (source, sink, constant) in pathways {
            let amount = constant.field(anomaly) * source.concentration() * scale;
            exchange(&amount, Some(source), Some(sink), &mut self.ledger)?;
        }
        Ok(())
    }

    /// Oxidize the dissolved pools against the ambient oxygen field.
    ///
    /// Returns the oxygen demand of the step; the demand has already been
    /// drawn through `oxygen`, so a detached consumer sees the raw value.
    pub fn oxidize(
        &mut self,
        oxygen: &mut dyn MassConsumer,
        anomaly: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<Array2<f64>> {
        let km_oxygen = self.parameters.km_oxygen;
        let km_labile = self.parameters.km_labile;
        let scale = self.parameters.internal() * dt;
        let monod = oxygen.field().mapv(|o| o / (km_oxygen + o));

        let mut oxidized = Array2::zeros(self.labile_dissolved.shape());
        let pathways = [
            (
                &mut self.labile_dissolved,
                self.parameters.labile_oxidation,
                true,
            ),
            (
                &mut self.excreted_dissolved,
                self.parameters.excreted_oxidation,
                true,
            ),
            (
                &mut self.recycled_dissolved,
                self.parameters.recycled_oxidation,
                true,
            ),
            (
                &mut self.refractory_dissolved,
                self.parameters.refractory_oxidation,
                false,
            ),
        ];
        for (pool, constant, self_limited) in pathways {
            let mut amount = constant.field(anomaly) * pool.concentration() * &monod * scale;
            if self_limited {
                let limit = pool.concentration().mapv(|c| c / (km_labile + c));
                amount *= &limit;
            }
            exchange(&amount, Some(pool), None, &mut self.ledger)?;
            oxidized += &amount;
        }

        let demand = oxidized * OXYGEN_PER_CARBON;
        oxygen.consume(&demand)?;
        Ok(demand)
    }

    /// Mineralization limiter handed to the nutrient systems: the
    /// Michaelis fraction of readily degradable substrate, zero where no
    /// substrate is present at all.
    pub fn limiter(&self, phytoplankton: Option<&Array2<f64>>) -> Array2<f64> {
        let km = self.parameters.km_phytoplankton;
        let mut substrate =
            self.excreted_dissolved.concentration() + self.recycled_dissolved.concentration();
        if let Some(biomass) = phytoplankton {
            substrate += biomass;
        }
        substrate.mapv(|s| if s > 0.0 { s / (km + s) } else { 0.0 })
    }

    /// Labile-carbon Michaelis fraction feeding denitrification.
    pub fn available(&self) -> Array2<f64> {
        let km = self.parameters.km_labile;
        self.labile_dissolved.concentration().mapv(|c| c / (km + c))
    }

    /// Receive gross production, keep the excreted share in the excreted
    /// dissolved pool and return the internally retained remainder.
    pub fn exude(&mut self, production: &Array2<f64>) -> LittoralResult<Array2<f64>> {
        let excreted = production * self.parameters.excretion;
        exchange(
            &excreted,
            None,
            Some(&mut self.excreted_dissolved),
            &mut self.ledger,
        )?;
        Ok(production * self.parameters.internal())
    }

    /// Distribute a grazing loss out of `biomass` over the carbon pools
    /// by the configured receipt fractions.
    pub fn graze(
        &mut self,
        loss: &Array2<f64>,
        biomass: &mut Pool,
        ledger: &mut f64,
    ) -> LittoralResult<()> {
        let fractions = self.parameters.grazing;
        let receipts = [
            (&mut self.labile_particulate, fractions.labile_particulate),
            (
                &mut self.refractory_particulate,
                fractions.refractory_particulate,
            ),
            (
                &mut self.recycled_particulate,
                fractions.recycled_particulate,
            ),
            (&mut self.labile_dissolved, fractions.labile_dissolved),
            (
                &mut self.refractory_dissolved,
                fractions.refractory_dissolved,
            ),
            (&mut self.recycled_dissolved, fractions.recycled_dissolved),
            (&mut self.excreted_dissolved, fractions.excreted_dissolved),
        ];
        for (pool, fraction) in receipts {
            if fraction == 0.0 {
                continue;
            }
            let share = loss * fraction;
            exchange(&share, Some(biomass), Some(pool), ledger)?;
        }
        Ok(())
    }
}

impl MassConsumer for Carbon {
    fn field(&self) -> ArrayView2<'_, f64> {
        self.labile_dissolved.concentration().view()
    }

    fn availability(&self) -> Array2<f64> {
        self.available()
    }

    fn consume(&mut self, demand: &Array2<f64>) -> LittoralResult<()> {
        exchange(demand, Some(&mut self.labile_dissolved), None, &mut self.ledger)
    }
}

impl System for Carbon {
    fn name(&self) -> &'static str {
        NAME
    }

    fn shape(&self) -> (usize, usize) {
        self.labile_particulate.shape()
    }

    fn pools(&self) -> Vec<&Pool> {
        vec![
            &self.labile_particulate,
            &self.recycled_particulate,
            &self.refractory_particulate,
            &self.labile_dissolved,
            &self.excreted_dissolved,
            &self.recycled_dissolved,
            &self.refractory_dissolved,
        ]
    }

    fn pools_mut(&mut self) -> Vec<&mut Pool> {
        vec![
            &mut self.labile_particulate,
            &mut self.recycled_particulate,
            &mut self.refractory_particulate,
            &mut self.labile_dissolved,
            &mut self.excreted_dissolved,
            &mut self.recycled_dissolved,
            &mut self.refractory_dissolved,
        ]
    }

    fn ledger(&self) -> f64 {
        self.ledger
    }

    fn ledger_mut(&mut self) -> &mut f64 {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::ExternalDemand;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn single_cell() -> GridShape {
        GridShape::new(1, 1)
    }

    // ===== Hydrolysis =====

    #[test]
    fn hydrolysis_conserves_mass_between_counterpart_pools() {
        let mut carbon = Carbon::new(single_cell());
        carbon
            .pool_mut(LABILE_PARTICULATE)
            .unwrap()
            .fill(4.0);
        carbon.hydrolyze(&arr2(&[[0.0]]), 1.0).unwrap();

        // 0.07 * 4.0 * 0.9
        let moved = 0.252;
        assert_relative_eq!(
            carbon.pool(LABILE_PARTICULATE).unwrap().delta()[[0, 0]],
            -moved,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            carbon.pool(LABILE_DISSOLVED).unwrap().delta()[[0, 0]],
            moved,
            max_relative = 1e-12
        );
        assert_eq!(carbon.ledger(), 0.0);
    }

    #[test]
    fn recycled_hydrolysis_ignores_temperature() {
        let mut carbon = Carbon::new(single_cell());
        carbon.pool_mut(RECYCLED_PARTICULATE).unwrap().fill(2.0);
        carbon.hydrolyze(&arr2(&[[15.0]]), 1.0).unwrap();
        assert_relative_eq!(
            carbon.pool(RECYCLED_DISSOLVED).unwrap().delta()[[0, 0]],
            0.01 * 2.0 * 0.9,
            max_relative = 1e-12
        );
    }

    // ===== Oxidation =====

    #[test]
    fn refractory_oxidation_matches_the_reference_arithmetic() {
        let mut carbon = Carbon::new(single_cell());
        carbon.pool_mut(REFRACTORY_DISSOLVED).unwrap().fill(10.0);
        let mut oxygen = ExternalDemand::new(arr2(&[[8.0]]));

        let demand = carbon.oxidize(&mut oxygen, &arr2(&[[0.0]]), 1.0).unwrap();

        // 0.008 * 10 * 0.9 * 8 / 8.2, no self-limitation for refractory
        let oxidized = 0.008 * 10.0 * 0.9 * (8.0 / 8.2);
        assert_relative_eq!(
            carbon.pool(REFRACTORY_DISSOLVED).unwrap().delta()[[0, 0]],
            -oxidized,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            demand[[0, 0]],
            oxidized * OXYGEN_PER_CARBON,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            oxygen.consumed()[[0, 0]],
            demand[[0, 0]],
            max_relative = 1e-12
        );
        // Oxidized carbon leaves the system.
        assert_relative_eq!(carbon.ledger(), -oxidized, max_relative = 1e-12);
    }

    #[test]
    fn labile_oxidation_is_self_limited() {
        let mut carbon = Carbon::new(single_cell());
        carbon.pool_mut(LABILE_DISSOLVED).unwrap().fill(0.1);
        let mut oxygen = ExternalDemand::new(arr2(&[[8.0]]));

        carbon.oxidize(&mut oxygen, &arr2(&[[0.0]]), 1.0).unwrap();

        let expected = 0.1 * 0.1 * 0.9 * (8.0 / 8.2) * (0.1 / 0.2);
        assert_relative_eq!(
            carbon.pool(LABILE_DISSOLVED).unwrap().delta()[[0, 0]],
            -expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn oxidation_stops_without_oxygen() {
        let mut carbon = Carbon::new(single_cell());
        carbon.pool_mut(REFRACTORY_DISSOLVED).unwrap().fill(10.0);
        let mut oxygen = ExternalDemand::new(arr2(&[[0.0]]));
        carbon.oxidize(&mut oxygen, &arr2(&[[0.0]]), 1.0).unwrap();
        assert_eq!(carbon.pool(REFRACTORY_DISSOLVED).unwrap().delta()[[0, 0]], 0.0);
    }

    // ===== Saturation Terms =====

    #[test]
    fn limiter_saturates_with_substrate_and_vanishes_without() {
        let mut carbon = Carbon::new(single_cell());
        assert_eq!(carbon.limiter(None)[[0, 0]], 0.0);

        carbon.pool_mut(EXCRETED_DISSOLVED).unwrap().fill(0.05);
        carbon.pool_mut(RECYCLED_DISSOLVED).unwrap().fill(0.05);
        assert_relative_eq!(
            carbon.limiter(None)[[0, 0]],
            0.1 / 0.15,
            max_relative = 1e-12
        );

        let biomass = arr2(&[[0.9]]);
        assert_relative_eq!(
            carbon.limiter(Some(&biomass))[[0, 0]],
            1.0 / 1.05,
            max_relative = 1e-12
        );
    }

    #[test]
    fn availability_is_the_labile_michaelis_fraction() {
        let mut carbon = Carbon::new(single_cell());
        carbon.pool_mut(LABILE_DISSOLVED).unwrap().fill(0.1);
        assert_relative_eq!(carbon.available()[[0, 0]], 0.5, max_relative = 1e-12);
        assert_relative_eq!(
            carbon.availability()[[0, 0]],
            0.5,
            max_relative = 1e-12
        );
    }

    // ===== Phytoplankton Receipts =====

    #[test]
    fn exudation_splits_production_and_returns_the_remainder() {
        let mut carbon = Carbon::new(single_cell());
        let retained = carbon.exude(&arr2(&[[1.0]])).unwrap();
        assert_relative_eq!(retained[[0, 0]], 0.9, max_relative = 1e-12);
        assert_relative_eq!(
            carbon.pool(EXCRETED_DISSOLVED).unwrap().delta()[[0, 0]],
            0.1,
            max_relative = 1e-12
        );
        assert_relative_eq!(carbon.ledger(), 0.1, max_relative = 1e-12);
    }

    #[test]
    fn grazing_loss_is_distributed_by_the_receipt_fractions() {
        let mut carbon = Carbon::new(single_cell());
        let mut biomass = Pool::new("phytoplankton-carbon", single_cell());
        let mut ledger = 0.0;

        carbon
            .graze(&arr2(&[[1.0]]), &mut biomass, &mut ledger)
            .unwrap();

        assert_relative_eq!(biomass.delta()[[0, 0]], -1.0, max_relative = 1e-12);
        assert_relative_eq!(
            carbon.pool(LABILE_PARTICULATE).unwrap().delta()[[0, 0]],
            0.35,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            carbon.pool(RECYCLED_DISSOLVED).unwrap().delta()[[0, 0]],
            0.15,
            max_relative = 1e-12
        );
        // Conserving moves leave both ledgers untouched.
        assert_eq!(ledger, 0.0);
        assert_eq!(carbon.ledger(), 0.0);
    }

    // ===== System Surface =====

    #[test]
    fn unknown_pool_lookup_names_the_system() {
        let carbon = Carbon::new(single_cell());
        let error = carbon.pool("chlorophyll").unwrap_err();
        assert_eq!(
            error.to_string(),
            "system 'carbon' has no pool named 'chlorophyll'"
        );
    }

    #[test]
    fn transfer_commits_every_pool() {
        let mut carbon = Carbon::new(single_cell());
        carbon.pool_mut(LABILE_PARTICULATE).unwrap().fill(4.0);
        carbon.hydrolyze(&arr2(&[[0.0]]), 1.0).unwrap();
        carbon.transfer(&arr2(&[[2.0]])).unwrap();

        let particulate = carbon.pool(LABILE_PARTICULATE).unwrap();
        assert_relative_eq!(
            particulate.concentration()[[0, 0]],
            4.0 - 0.252,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            particulate.mass()[[0, 0]],
            -0.504,
            max_relative = 1e-12
        );
        assert_eq!(particulate.delta()[[0, 0]], 0.0);
    }
}
