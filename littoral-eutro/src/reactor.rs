//! Reaction Pipeline
//!
//! The [`Reactor`] owns every active chemistry system on one grid and
//! runs them in a fixed order each step: phytoplankton growth state and
//! excretion, carbon hydrolysis and oxidation, oxygen-equivalents
//! oxidation, nutrient mineralization, the inorganic nitrogen
//! transformations, phytoplankton metabolism, settling, and finally the
//! benthic exchange. Every stage reads the concentrations committed by
//! the previous step and accumulates deltas, so ordering within the pass
//! carries no bias; [`Reactor::set`] commits the pass against the cell
//! volumes and [`Reactor::discard`] drops it.
//!
//! Systems plug into the pipeline through the [`System`] trait, which
//! carries the uniform bookkeeping: pool lookup by key, commit and
//! discard, settling with ledger export, and benthic injection.

use littoral_core::errors::{LittoralError, LittoralResult};
use littoral_core::mesh::{GridShape, Mesh};
use littoral_core::pool::Pool;
use ndarray::{Array1, Array2};

use crate::carbon::Carbon;
use crate::nitrogen::{Nitrogen, AMMONIUM, NOX};
use crate::oxygen::{Oxygen, OXYGEN};
use crate::parameters::SimulationConfig;
use crate::phosphorus::{Phosphorus, PHOSPHATE};
use crate::phytoplankton::Phytoplankton;
use crate::sediment::{BenthicFlux, BottomWater, Sediment};
use crate::settling::Settling;
use crate::silica::{Silica, SILICATE};

/// Common surface every chemistry system exposes to the reactor.
///
/// A system owns a set of pools on the shared grid plus a scalar mass
/// ledger recording its one-sided exchanges. The provided methods cover
/// the bookkeeping the reactor applies uniformly across systems.
pub trait System: std::fmt::Debug {
    /// Stable system name used for lookup and error reporting.
    fn name(&self) -> &'static str;

    /// Grid shape the system's pools share.
    fn shape(&self) -> (usize, usize);

    fn pools(&self) -> Vec<&Pool>;

    fn pools_mut(&mut self) -> Vec<&mut Pool>;

    /// Net one-sided exchange total, in concentration units summed over
    /// cells; times the cell volume this is mass for a uniform grid.
    fn ledger(&self) -> f64;

    fn ledger_mut(&mut self) -> &mut f64;

    /// Find a pool by key.
    fn pool(&self, key: &str) -> LittoralResult<&Pool> {
        let name = self.name();
        self.pools()
            .into_iter()
            .find(|pool| pool.key() == key)
            .ok_or_else(|| LittoralError::UnknownPool {
                system: name.to_string(),
                pool: key.to_string(),
            })
    }

    fn pool_mut(&mut self, key: &str) -> LittoralResult<&mut Pool> {
        let name = self.name();
        self.pools_mut()
            .into_iter()
            .find(|pool| pool.key() == key)
            .ok_or_else(|| LittoralError::UnknownPool {
                system: name.to_string(),
                pool: key.to_string(),
            })
    }

    /// Commit every pool's pending delta against the step volumes.
    fn transfer(&mut self, volume: &Array2<f64>) -> LittoralResult<()> {
        let name = self.name();
        for pool in self.pools_mut() {
            pool.transfer(volume, name)?;
        }
        Ok(())
    }

    /// Drop every pool's pending delta.
    fn discard(&mut self) {
        for pool in self.pools_mut() {
            pool.discard();
        }
    }

    /// Settle one pool, booking the bottom export out of the ledger.
    ///
    /// Returns the export in concentration units per node.
    fn settle(&mut self, key: &str, flux: &Array2<f64>) -> LittoralResult<Array1<f64>> {
        let export = self.pool_mut(key)?.settle(flux)?;
        *self.ledger_mut() -= export.sum();
        Ok(export)
    }

    /// Add mass into one layer of a pool, booked as an external source.
    fn inject_layer(
        &mut self,
        key: &str,
        layer: usize,
        amount: &Array1<f64>,
    ) -> LittoralResult<()> {
        let pool = self.pool_mut(key)?;
        let nodes = pool.shape().0;
        if amount.len() != nodes {
            return Err(LittoralError::ShapeMismatch {
                field: format!("injection into '{key}'"),
                expected: (nodes, 1),
                found: (amount.len(), 1),
            });
        }
        for (node, &value) in amount.iter().enumerate() {
            pool.add_delta_at(node, layer, value)?;
        }
        *self.ledger_mut() += amount.sum();
        Ok(())
    }
}

/// Ambient fields driving one step, shaped like the water grid.
#[derive(Debug, Clone)]
pub struct Drivers {
    /// Temperature anomaly from the 20 °C reference, per cell.
    pub anomaly: Array2<f64>,
    /// Light saturation ratio (ambient over optimal), per cell.
    pub light: Array2<f64>,
    /// Salinity per node [ppt].
    pub salinity: Array1<f64>,
    /// Suspended solids per cell [kg/L].
    pub solids: Array2<f64>,
}

impl Drivers {
    /// Uniform drivers over a grid, handy for tests and spin-up.
    pub fn uniform(shape: GridShape, anomaly: f64, light: f64, salinity: f64, solids: f64) -> Self {
        Self {
            anomaly: shape.filled(anomaly),
            light: shape.filled(light),
            salinity: Array1::from_elem(shape.nodes, salinity),
            solids: shape.filled(solids),
        }
    }
}

/// Proof of a completed kinetic pass.
///
/// Carries the carbon mineralization limiter to [`Reactor::set`], which
/// returns it for couplings that run after the commit.
#[derive(Debug, Clone)]
pub struct Integrated {
    limiter: Array2<f64>,
}

impl Integrated {
    /// Carbon mineralization limiter from the completed pass.
    pub fn limiter(&self) -> &Array2<f64> {
        &self.limiter
    }
}

/// Every active system on one grid, stepped as a unit.
#[derive(Debug, Clone)]
pub struct Reactor {
    mesh: Mesh,
    carbon: Carbon,
    oxygen: Oxygen,
    nitrogen: Option<Nitrogen>,
    phosphorus: Option<Phosphorus>,
    silica: Option<Silica>,
    phytoplankton: Vec<Phytoplankton>,
    settling: Settling,
    sediment: Option<Sediment>,
}

impl Reactor {
    pub fn builder(mesh: Mesh) -> ReactorBuilder {
        ReactorBuilder::new(mesh)
    }

    /// Builder preloaded with every system a configuration describes.
    pub fn from_config(mesh: Mesh, config: &SimulationConfig) -> ReactorBuilder {
        ReactorBuilder::from_config(mesh, config)
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn carbon(&self) -> &Carbon {
        &self.carbon
    }

    pub fn oxygen(&self) -> &Oxygen {
        &self.oxygen
    }

    pub fn nitrogen(&self) -> Option<&Nitrogen> {
        self.nitrogen.as_ref()
    }

    pub fn phosphorus(&self) -> Option<&Phosphorus> {
        self.phosphorus.as_ref()
    }

    pub fn silica(&self) -> Option<&Silica> {
        self.silica.as_ref()
    }

    pub fn phytoplankton(&self) -> &[Phytoplankton] {
        &self.phytoplankton
    }

    pub fn sediment(&self) -> Option<&Sediment> {
        self.sediment.as_ref()
    }

    pub fn sediment_mut(&mut self) -> Option<&mut Sediment> {
        self.sediment.as_mut()
    }

    /// Every active system behind the common trait, in pipeline order.
    pub fn systems(&self) -> Vec<&dyn System> {
        let mut systems: Vec<&dyn System> = vec![&self.carbon, &self.oxygen];
        if let Some(nitrogen) = &self.nitrogen {
            systems.push(nitrogen);
        }
        if let Some(phosphorus) = &self.phosphorus {
            systems.push(phosphorus);
        }
        if let Some(silica) = &self.silica {
            systems.push(silica);
        }
        for group in &self.phytoplankton {
            systems.push(group);
        }
        systems
    }

    pub fn systems_mut(&mut self) -> Vec<&mut dyn System> {
        let mut systems: Vec<&mut dyn System> = vec![&mut self.carbon, &mut self.oxygen];
        if let Some(nitrogen) = &mut self.nitrogen {
            systems.push(nitrogen);
        }
        if let Some(phosphorus) = &mut self.phosphorus {
            systems.push(phosphorus);
        }
        if let Some(silica) = &mut self.silica {
            systems.push(silica);
        }
        for group in &mut self.phytoplankton {
            systems.push(group);
        }
        systems
    }

    /// Find a system by name.
    ///
    /// Phytoplankton groups all answer to `"phytoplankton"`; the first
    /// group wins.
    pub fn system(&self, name: &str) -> LittoralResult<&dyn System> {
        self.systems()
            .into_iter()
            .find(|system| system.name() == name)
            .ok_or_else(|| LittoralError::MissingSystem {
                system: name.to_string(),
            })
    }

    pub fn system_mut(&mut self, name: &str) -> LittoralResult<&mut dyn System> {
        self.systems_mut()
            .into_iter()
            .find(|system| system.name() == name)
            .ok_or_else(|| LittoralError::MissingSystem {
                system: name.to_string(),
            })
    }

    /// Summed exchange ledgers across the active systems.
    pub fn ledger(&self) -> f64 {
        self.systems().iter().map(|system| system.ledger()).sum()
    }

    /// One kinetic pass over every active process.
    ///
    /// Deltas accumulate on the pools; nothing is committed until
    /// [`Reactor::set`] consumes the returned token. On an error the
    /// caller discards the pass; [`Reactor::step`] wraps the pair.
    pub fn integrate(&mut self, drivers: &Drivers, dt: f64) -> LittoralResult<Integrated> {
        let shape = self.mesh.shape();
        self.check_drivers(drivers)?;

        // Growth phase first: its excretion flux feeds the nitrogen
        // split, and the limits snapshot this step's committed state.
        let mut excretion: Option<Array2<f64>> = None;
        if !self.phytoplankton.is_empty() {
            let nitrogen =
                self.nitrogen
                    .as_ref()
                    .ok_or_else(|| LittoralError::MissingSystem {
                        system: "nitrogen".to_string(),
                    })?;
            let mut total = shape.zeros();
            for group in &mut self.phytoplankton {
                group.prepare(
                    nitrogen,
                    self.phosphorus.as_ref(),
                    self.silica.as_ref(),
                    &drivers.light,
                    &drivers.anomaly,
                )?;
                total += &group.excrete(dt);
            }
            excretion = Some(total);
        }

        let mut biomass: Option<Array2<f64>> = None;
        if !self.phytoplankton.is_empty() {
            let mut total = shape.zeros();
            for group in &self.phytoplankton {
                total += group.biomass().concentration();
            }
            biomass = Some(total);
        }

        let limiter =
            self.carbon
                .integrate(&mut self.oxygen, &drivers.anomaly, biomass.as_ref(), dt)?;
        self.oxygen.integrate(&limiter, &drivers.anomaly, dt)?;

        if let Some(phosphorus) = &mut self.phosphorus {
            phosphorus.mineralize(&limiter, &drivers.anomaly, dt)?;
        }
        if let Some(silica) = &mut self.silica {
            silica.mineralize(&limiter, &drivers.anomaly, dt)?;
        }
        if let Some(nitrogen) = &mut self.nitrogen {
            nitrogen.mineralize(&limiter, &drivers.anomaly, dt)?;
            nitrogen.integrate(
                &mut self.oxygen,
                &mut self.carbon,
                &drivers.anomaly,
                excretion.as_ref(),
                dt,
            )?;
        }

        for group in &mut self.phytoplankton {
            group.metabolize(&mut self.carbon, &mut self.oxygen, self.silica.as_mut(), dt)?;
        }

        let deposition = self.settling.apply(
            &self.mesh,
            &drivers.anomaly,
            dt,
            &mut self.carbon,
            self.nitrogen.as_mut(),
            self.phosphorus.as_mut(),
            self.silica.as_mut(),
            &mut self.phytoplankton,
            &drivers.solids,
        )?;

        let benthic = match &mut self.sediment {
            Some(sediment) => {
                for (key, export) in &deposition.exports {
                    sediment.conversion(key, export, &deposition.correction)?;
                }
                let nitrogen =
                    self.nitrogen
                        .as_ref()
                        .ok_or_else(|| LittoralError::MissingSystem {
                            system: "nitrogen".to_string(),
                        })?;
                let bottom = shape.bottom();
                let column = |pool: &Pool| pool.concentration().column(bottom).to_owned();
                let water = BottomWater {
                    anomaly: drivers.anomaly.column(bottom).to_owned(),
                    salinity: drivers.salinity.clone(),
                    oxygen: column(self.oxygen.pool(OXYGEN)?),
                    ammonium: column(nitrogen.pool(AMMONIUM)?),
                    nox: column(nitrogen.pool(NOX)?),
                    phosphate: match &self.phosphorus {
                        Some(system) => column(system.pool(PHOSPHATE)?),
                        None => Array1::zeros(shape.nodes),
                    },
                    silicate: match &self.silica {
                        Some(system) => column(system.pool(SILICATE)?),
                        None => Array1::zeros(shape.nodes),
                    },
                    hypoxic: self
                        .oxygen
                        .critical()
                        .into_iter()
                        .filter(|&(_, layer, _)| layer == bottom)
                        .map(|(node, _, exponent)| (node, exponent))
                        .collect(),
                };
                Some(sediment.step(&water, dt)?)
            }
            None => None,
        };
        if let Some(flux) = &benthic {
            self.receive_benthic(flux, dt)?;
        }

        Ok(Integrated { limiter })
    }

    /// Commit the pass against the step's cell volumes, consuming the
    /// token and returning its limiter.
    pub fn set(&mut self, volume: &Array2<f64>, token: Integrated) -> LittoralResult<Array2<f64>> {
        let expected = self.mesh.shape().dim();
        if volume.dim() != expected {
            return Err(LittoralError::ShapeMismatch {
                field: "volume".to_string(),
                expected,
                found: volume.dim(),
            });
        }
        for system in self.systems_mut() {
            system.transfer(volume)?;
        }
        if let Some(sediment) = &mut self.sediment {
            sediment.commit(self.mesh.area())?;
        }
        Ok(token.limiter)
    }

    /// Drop every pending delta.
    pub fn discard(&mut self) {
        for system in self.systems_mut() {
            system.discard();
        }
        if let Some(sediment) = &mut self.sediment {
            sediment.discard();
        }
    }

    /// Integrate and commit in one call, discarding on any failure.
    pub fn step(
        &mut self,
        drivers: &Drivers,
        volume: &Array2<f64>,
        dt: f64,
    ) -> LittoralResult<Array2<f64>> {
        let result = self
            .integrate(drivers, dt)
            .and_then(|token| self.set(volume, token));
        if result.is_err() {
            self.discard();
        }
        result
    }

    /// Turn areal benthic fluxes into bottom-layer deltas.
    fn receive_benthic(&mut self, flux: &BenthicFlux, dt: f64) -> LittoralResult<()> {
        let shape = self.mesh.shape();
        let bottom = shape.bottom();
        let thickness = self.mesh.depth() / shape.layers as f64;
        let scale = thickness.mapv(|h| dt / h);

        if let Some(nitrogen) = &mut self.nitrogen {
            nitrogen.inject_layer(AMMONIUM, bottom, &(&flux.ammonium * &scale))?;
            nitrogen.inject_layer(NOX, bottom, &(&flux.nox * &scale))?;
        }
        if let Some(phosphorus) = &mut self.phosphorus {
            phosphorus.inject_layer(PHOSPHATE, bottom, &(&flux.phosphate * &scale))?;
        }
        if let Some(silica) = &mut self.silica {
            silica.inject_layer(SILICATE, bottom, &(&flux.silicate * &scale))?;
        }
        let demand = -(&flux.oxygen_demand * &scale);
        self.oxygen.inject_layer(OXYGEN, bottom, &demand)
    }

    fn check_drivers(&self, drivers: &Drivers) -> LittoralResult<()> {
        let expected = self.mesh.shape().dim();
        for (field, found) in [
            ("anomaly", drivers.anomaly.dim()),
            ("light", drivers.light.dim()),
            ("solids", drivers.solids.dim()),
        ] {
            if found != expected {
                return Err(LittoralError::ShapeMismatch {
                    field: format!("driver {field}"),
                    expected,
                    found,
                });
            }
        }
        if drivers.salinity.len() != expected.0 {
            return Err(LittoralError::ShapeMismatch {
                field: "driver salinity".to_string(),
                expected: (expected.0, 1),
                found: (drivers.salinity.len(), 1),
            });
        }
        Ok(())
    }
}

/// Staged construction of a [`Reactor`].
///
/// Carbon and oxygen are mandatory; nutrients, plankton groups and the
/// benthos are opt-in. [`ReactorBuilder::build`] checks shape agreement
/// and the couplings the pipeline relies on.
pub struct ReactorBuilder {
    mesh: Mesh,
    carbon: Option<Carbon>,
    oxygen: Option<Oxygen>,
    nitrogen: Option<Nitrogen>,
    phosphorus: Option<Phosphorus>,
    silica: Option<Silica>,
    phytoplankton: Vec<Phytoplankton>,
    settling: Settling,
    sediment: Option<Sediment>,
}

impl ReactorBuilder {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            carbon: None,
            oxygen: None,
            nitrogen: None,
            phosphorus: None,
            silica: None,
            phytoplankton: Vec::new(),
            settling: Settling::default(),
            sediment: None,
        }
    }

    /// Assemble the full pipeline from a parsed configuration.
    pub fn from_config(mesh: Mesh, config: &SimulationConfig) -> Self {
        let shape = mesh.shape();
        let mut builder = Self::new(mesh)
            .with_carbon(Carbon::from_parameters(shape, config.carbon.clone()))
            .with_oxygen(Oxygen::from_parameters(shape, config.oxygen.clone()))
            .with_nitrogen(Nitrogen::from_parameters(shape, config.nitrogen.clone()))
            .with_phosphorus(Phosphorus::from_parameters(shape, config.phosphorus.clone()))
            .with_silica(Silica::from_parameters(shape, config.silica.clone()))
            .with_settling(Settling::new(config.settling.clone()))
            .with_sediment(Sediment::from_parameters(shape.nodes, config.sediment.clone()));
        for parameters in &config.phytoplankton {
            builder = builder
                .with_phytoplankton(Phytoplankton::from_parameters(shape, parameters.clone()));
        }
        builder
    }

    pub fn with_carbon(mut self, carbon: Carbon) -> Self {
        self.carbon = Some(carbon);
        self
    }

    pub fn with_oxygen(mut self, oxygen: Oxygen) -> Self {
        self.oxygen = Some(oxygen);
        self
    }

    pub fn with_nitrogen(mut self, nitrogen: Nitrogen) -> Self {
        self.nitrogen = Some(nitrogen);
        self
    }

    pub fn with_phosphorus(mut self, phosphorus: Phosphorus) -> Self {
        self.phosphorus = Some(phosphorus);
        self
    }

    pub fn with_silica(mut self, silica: Silica) -> Self {
        self.silica = Some(silica);
        self
    }

    /// Add one phytoplankton group; call repeatedly for several.
    pub fn with_phytoplankton(mut self, group: Phytoplankton) -> Self {
        self.phytoplankton.push(group);
        self
    }

    pub fn with_settling(mut self, settling: Settling) -> Self {
        self.settling = settling;
        self
    }

    pub fn with_sediment(mut self, sediment: Sediment) -> Self {
        self.sediment = Some(sediment);
        self
    }

    pub fn build(self) -> LittoralResult<Reactor> {
        let carbon = self.carbon.ok_or_else(|| LittoralError::MissingSystem {
            system: "carbon".to_string(),
        })?;
        let oxygen = self.oxygen.ok_or_else(|| LittoralError::MissingSystem {
            system: "oxygen".to_string(),
        })?;
        let reactor = Reactor {
            mesh: self.mesh,
            carbon,
            oxygen,
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            silica: self.silica,
            phytoplankton: self.phytoplankton,
            settling: self.settling,
            sediment: self.sediment,
        };

        let expected = reactor.mesh.shape().dim();
        for system in reactor.systems() {
            if system.shape() != expected {
                return Err(LittoralError::ShapeMismatch {
                    field: format!("system '{}'", system.name()),
                    expected,
                    found: system.shape(),
                });
            }
        }
        // Plankton quotas and the benthic nitrogen balance both need the
        // nitrogen system.
        if (!reactor.phytoplankton.is_empty() || reactor.sediment.is_some())
            && reactor.nitrogen.is_none()
        {
            return Err(LittoralError::MissingSystem {
                system: "nitrogen".to_string(),
            });
        }
        if let Some(sediment) = &reactor.sediment {
            if sediment.nodes() != expected.0 {
                return Err(LittoralError::ShapeMismatch {
                    field: "sediment".to_string(),
                    expected: (expected.0, 2),
                    found: (sediment.nodes(), 2),
                });
            }
        }
        Ok(reactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    use crate::carbon::LABILE_DISSOLVED;
    use crate::nitrogen;
    use crate::{carbon, oxygen};

    fn mesh() -> Mesh {
        Mesh::uniform(GridShape::new(1, 2), 50.0, 100.0, 4.0)
    }

    #[test]
    fn the_builder_requires_carbon_and_oxygen() {
        let error = Reactor::builder(mesh()).build().unwrap_err();
        assert!(matches!(
            error,
            LittoralError::MissingSystem { ref system } if system == "carbon"
        ));

        let shape = GridShape::new(1, 2);
        let error = Reactor::builder(mesh())
            .with_carbon(Carbon::new(shape))
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            LittoralError::MissingSystem { ref system } if system == "oxygen"
        ));
    }

    #[test]
    fn plankton_without_nitrogen_is_rejected() {
        let shape = GridShape::new(1, 2);
        let error = Reactor::builder(mesh())
            .with_carbon(Carbon::new(shape))
            .with_oxygen(Oxygen::new(shape))
            .with_phytoplankton(Phytoplankton::new(shape))
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            LittoralError::MissingSystem { ref system } if system == "nitrogen"
        ));
    }

    #[test]
    fn a_system_on_the_wrong_grid_is_rejected() {
        let error = Reactor::builder(mesh())
            .with_carbon(Carbon::new(GridShape::new(3, 5)))
            .with_oxygen(Oxygen::new(GridShape::new(1, 2)))
            .build()
            .unwrap_err();
        assert!(matches!(error, LittoralError::ShapeMismatch { .. }));
    }

    #[test]
    fn unknown_system_lookup_names_the_system() {
        let shape = GridShape::new(1, 2);
        let reactor = Reactor::builder(mesh())
            .with_carbon(Carbon::new(shape))
            .with_oxygen(Oxygen::new(shape))
            .build()
            .unwrap();
        let error = reactor.system("silica").unwrap_err();
        assert!(matches!(
            error,
            LittoralError::MissingSystem { ref system } if system == "silica"
        ));
    }

    #[test]
    fn a_configured_reactor_runs_a_full_step() {
        let shape = GridShape::new(1, 2);
        let mut reactor = ReactorBuilder::from_config(mesh(), &SimulationConfig::default())
            .build()
            .unwrap();
        reactor
            .system_mut("carbon")
            .unwrap()
            .pool_mut(LABILE_DISSOLVED)
            .unwrap()
            .fill(10.0);
        reactor
            .system_mut("oxygen")
            .unwrap()
            .pool_mut(oxygen::OXYGEN)
            .unwrap()
            .fill(8.0);
        reactor
            .system_mut("nitrogen")
            .unwrap()
            .pool_mut(nitrogen::AMMONIUM)
            .unwrap()
            .fill(0.5);

        let drivers = Drivers::uniform(shape, 0.0, 1.0, 20.0, 0.1);
        let volume = reactor.mesh().volume().clone();
        let limiter = reactor.step(&drivers, &volume, 0.1).unwrap();

        assert_eq!(limiter.dim(), (1, 2));
        let oxygen = reactor.system("oxygen").unwrap().pool(oxygen::OXYGEN).unwrap();
        assert!(oxygen.concentration()[[0, 0]] < 8.0);
        let nox = reactor.system("nitrogen").unwrap().pool(nitrogen::NOX).unwrap();
        assert!(nox.concentration().sum() > 0.0);
    }

    #[test]
    fn a_zero_length_step_leaves_concentrations_untouched() {
        let mut reactor = ReactorBuilder::from_config(mesh(), &SimulationConfig::default())
            .build()
            .unwrap();
        reactor
            .system_mut("carbon")
            .unwrap()
            .pool_mut(LABILE_DISSOLVED)
            .unwrap()
            .fill(10.0);
        reactor
            .system_mut("oxygen")
            .unwrap()
            .pool_mut(oxygen::OXYGEN)
            .unwrap()
            .fill(8.0);

        let drivers = Drivers::uniform(GridShape::new(1, 2), 0.0, 1.0, 20.0, 0.1);
        let volume = reactor.mesh().volume().clone();
        reactor.step(&drivers, &volume, 0.0).unwrap();

        let carbon = reactor.system("carbon").unwrap().pool(LABILE_DISSOLVED).unwrap();
        assert_eq!(carbon.concentration()[[0, 0]], 10.0);
        let oxygen = reactor.system("oxygen").unwrap().pool(oxygen::OXYGEN).unwrap();
        assert_eq!(oxygen.concentration()[[0, 1]], 8.0);
    }

    #[test]
    fn benthic_mineralization_feeds_the_bottom_layer() {
        let shape = GridShape::new(1, 2);
        let mut reactor = ReactorBuilder::from_config(mesh(), &SimulationConfig::default())
            .build()
            .unwrap();
        reactor
            .system_mut("oxygen")
            .unwrap()
            .pool_mut(oxygen::OXYGEN)
            .unwrap()
            .fill(8.0);
        let sediment = reactor.sediment_mut().unwrap();
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[20.0]), &arr1(&[1.0]))
            .unwrap();
        sediment
            .conversion(nitrogen::LABILE_PARTICULATE, &arr1(&[4.0]), &arr1(&[1.0]))
            .unwrap();

        let drivers = Drivers::uniform(shape, 0.0, 1.0, 20.0, 0.0);
        let volume = reactor.mesh().volume().clone();
        reactor.step(&drivers, &volume, 1.0).unwrap();

        let ammonium = reactor
            .system("nitrogen")
            .unwrap()
            .pool(nitrogen::AMMONIUM)
            .unwrap();
        assert!(ammonium.concentration()[[0, 1]] > 0.0);
        assert_eq!(ammonium.concentration()[[0, 0]], 0.0);
        let oxygen = reactor.system("oxygen").unwrap().pool(oxygen::OXYGEN).unwrap();
        assert!(oxygen.concentration()[[0, 1]] < oxygen.concentration()[[0, 0]]);
    }

    #[test]
    fn a_failed_step_discards_the_pass() {
        let mut reactor = ReactorBuilder::from_config(mesh(), &SimulationConfig::default())
            .build()
            .unwrap();
        reactor
            .system_mut("carbon")
            .unwrap()
            .pool_mut(LABILE_DISSOLVED)
            .unwrap()
            .fill(10.0);
        reactor
            .system_mut("oxygen")
            .unwrap()
            .pool_mut(oxygen::OXYGEN)
            .unwrap()
            .fill(8.0);

        let wrong = Drivers::uniform(GridShape::new(3, 3), 0.0, 1.0, 20.0, 0.1);
        let volume = reactor.mesh().volume().clone();
        let error = reactor.step(&wrong, &volume, 0.1).unwrap_err();
        assert!(matches!(error, LittoralError::ShapeMismatch { .. }));

        let carbon = reactor.system("carbon").unwrap().pool(LABILE_DISSOLVED).unwrap();
        assert_eq!(carbon.concentration()[[0, 0]], 10.0);
        assert_eq!(carbon.delta().sum(), 0.0);
    }

    #[test]
    fn the_reactor_ledger_totals_one_sided_exchanges() {
        let shape = GridShape::new(1, 2);
        let mut reactor = Reactor::builder(mesh())
            .with_carbon(Carbon::new(shape))
            .with_oxygen(Oxygen::new(shape))
            .build()
            .unwrap();
        reactor
            .system_mut("carbon")
            .unwrap()
            .pool_mut(LABILE_DISSOLVED)
            .unwrap()
            .fill(10.0);
        reactor
            .system_mut("oxygen")
            .unwrap()
            .pool_mut(oxygen::OXYGEN)
            .unwrap()
            .fill(8.0);
        assert_eq!(reactor.ledger(), 0.0);

        let drivers = Drivers::uniform(shape, 0.0, 1.0, 0.0, 0.0);
        let volume = reactor.mesh().volume().clone();
        reactor.step(&drivers, &volume, 0.5).unwrap();
        // Mineralization burns carbon and oxygen one-sidedly.
        assert!(reactor.ledger() < 0.0);
    }
}
