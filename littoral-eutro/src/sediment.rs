//! Two-Layer Benthic Sediment
//!
//! Settled material collects in a thin active sediment column split into
//! an aerobic surface layer and an anaerobic layer beneath it. Organic
//! stocks mineralize with first-order temperature-corrected kinetics, the
//! liberated nutrients partition between dissolved and sorbed phases, and
//! a fixed point on the sediment oxygen demand sets both the aerobic
//! thickness and the velocity at which dissolved tracers exchange with
//! the bottom water.
//!
//! Each step is implicit per tracer: every nutrient solves a 2x2 balance
//! over the two layers covering surface exchange, interlayer mixing,
//! burial and reaction, so stiff nitrification velocities cannot
//! destabilize the step. All per-node results are computed before any
//! state is written; a failed step leaves the sediment exactly as it was.

use littoral_core::errors::{LittoralError, LittoralResult};
use littoral_core::mesh::GridShape;
use littoral_core::pool::Pool;
use littoral_core::utils::linear_algebra::solve2;
use ndarray::{Array1, Array2};

use crate::carbon::{self, OXYGEN_PER_CARBON};
use crate::nitrogen::{self, CARBON_PER_NITROGEN, OXYGEN_PER_NITROGEN};
use crate::parameters::SedimentParameters;
use crate::phosphorus;
use crate::silica;

/// System name in ledgers and errors.
pub const NAME: &str = "sediment";

/// Aerobic (surface) layer index in the sediment pools.
pub const AEROBIC: usize = 0;
/// Anaerobic (deep) layer index.
pub const ANAEROBIC: usize = 1;

/// Floor on the anaerobic thickness where it appears as a divisor [m].
const MINIMUM_LAYER: f64 = 1e-6;
/// Floor on the surface transfer velocity [m/day].
const MINIMUM_TRANSFER: f64 = 1e-8;
/// Determinant cutoff for the per-tracer solves.
const SOLVER_TOLERANCE: f64 = 1e-12;

/// Bottom-water state sampled from the deepest water layer.
///
/// `hypoxic` carries the `(node, exponent)` pairs reported by
/// [`Oxygen::critical`](crate::oxygen::Oxygen::critical) for nodes whose
/// bottom oxygen sits under the critical threshold; the exponent relaxes
/// the aerobic-layer phosphate partition toward full release.
#[derive(Debug, Clone)]
pub struct BottomWater {
    /// Temperature anomaly from the 20 °C reference.
    pub anomaly: Array1<f64>,
    /// Salinity [ppt], selecting marine or freshwater nitrogen kinetics.
    pub salinity: Array1<f64>,
    /// Dissolved oxygen [mg/L].
    pub oxygen: Array1<f64>,
    /// Ammonium nitrogen [mg N/L].
    pub ammonium: Array1<f64>,
    /// Nitrate plus nitrite nitrogen [mg N/L].
    pub nox: Array1<f64>,
    /// Dissolved inorganic phosphate [mg P/L].
    pub phosphate: Array1<f64>,
    /// Dissolved silicate [mg Si/L].
    pub silicate: Array1<f64>,
    /// Hypoxia exponents for the affected nodes.
    pub hypoxic: Vec<(usize, f64)>,
}

impl BottomWater {
    /// Fresh, well-oxygenated water with nothing dissolved.
    pub fn quiescent(nodes: usize) -> Self {
        Self {
            anomaly: Array1::zeros(nodes),
            salinity: Array1::zeros(nodes),
            oxygen: Array1::from_elem(nodes, 8.0),
            ammonium: Array1::zeros(nodes),
            nox: Array1::zeros(nodes),
            phosphate: Array1::zeros(nodes),
            silicate: Array1::zeros(nodes),
            hypoxic: Vec::new(),
        }
    }
}

/// Areal return fluxes from one benthic step [g/m²/day].
///
/// Nutrient fluxes are positive toward the water column; `oxygen_demand`
/// is the oxygen the sediment consumes and is never negative.
#[derive(Debug, Clone)]
pub struct BenthicFlux {
    pub ammonium: Array1<f64>,
    pub nox: Array1<f64>,
    pub phosphate: Array1<f64>,
    pub silicate: Array1<f64>,
    pub oxygen_demand: Array1<f64>,
}

impl BenthicFlux {
    fn zeros(nodes: usize) -> Self {
        Self {
            ammonium: Array1::zeros(nodes),
            nox: Array1::zeros(nodes),
            phosphate: Array1::zeros(nodes),
            silicate: Array1::zeros(nodes),
            oxygen_demand: Array1::zeros(nodes),
        }
    }
}

/// Particulate inventories in the anaerobic layer [g/m³ of sediment].
#[derive(Debug, Clone)]
struct Stocks {
    labile_carbon: Array1<f64>,
    refractory_carbon: Array1<f64>,
    labile_nitrogen: Array1<f64>,
    refractory_nitrogen: Array1<f64>,
    labile_phosphorus: Array1<f64>,
    refractory_phosphorus: Array1<f64>,
    biogenic_silica: Array1<f64>,
}

impl Stocks {
    fn new(nodes: usize) -> Self {
        Self {
            labile_carbon: Array1::zeros(nodes),
            refractory_carbon: Array1::zeros(nodes),
            labile_nitrogen: Array1::zeros(nodes),
            refractory_nitrogen: Array1::zeros(nodes),
            labile_phosphorus: Array1::zeros(nodes),
            refractory_phosphorus: Array1::zeros(nodes),
            biogenic_silica: Array1::zeros(nodes),
        }
    }
}

/// Settled mass waiting to join the stocks [g/m²], binned by element and
/// reactivity class.
///
/// `phosphate` and `silicate` hold sorbed inorganic deposition that
/// dissolves straight into the anaerobic pore water instead of passing
/// through diagenesis.
#[derive(Debug, Clone)]
struct Deposits {
    labile_carbon: Array1<f64>,
    refractory_carbon: Array1<f64>,
    labile_nitrogen: Array1<f64>,
    refractory_nitrogen: Array1<f64>,
    labile_phosphorus: Array1<f64>,
    refractory_phosphorus: Array1<f64>,
    biogenic_silica: Array1<f64>,
    phosphate: Array1<f64>,
    silicate: Array1<f64>,
}

impl Deposits {
    fn new(nodes: usize) -> Self {
        Self {
            labile_carbon: Array1::zeros(nodes),
            refractory_carbon: Array1::zeros(nodes),
            labile_nitrogen: Array1::zeros(nodes),
            refractory_nitrogen: Array1::zeros(nodes),
            labile_phosphorus: Array1::zeros(nodes),
            refractory_phosphorus: Array1::zeros(nodes),
            biogenic_silica: Array1::zeros(nodes),
            phosphate: Array1::zeros(nodes),
            silicate: Array1::zeros(nodes),
        }
    }

    fn clear(&mut self) {
        for bin in [
            &mut self.labile_carbon,
            &mut self.refractory_carbon,
            &mut self.labile_nitrogen,
            &mut self.refractory_nitrogen,
            &mut self.labile_phosphorus,
            &mut self.refractory_phosphorus,
            &mut self.biogenic_silica,
            &mut self.phosphate,
            &mut self.silicate,
        ] {
            bin.fill(0.0);
        }
    }
}

/// One implicit two-layer balance: surface exchange against the bottom
/// water, interlayer mixing, burial from the aerobic layer through the
/// anaerobic layer and out, and a first-order reaction in each layer.
struct Balance {
    /// Layer thicknesses [m].
    aerobic: f64,
    anaerobic: f64,
    dt: f64,
    /// Surface transfer times the aerobic dissolved fraction [m/day].
    surface: f64,
    /// Interlayer mixing velocity [m/day].
    mixing: f64,
    /// Burial velocity [m/day].
    burial: f64,
    /// Reaction velocities per layer [m/day].
    reaction: [f64; 2],
    /// Start-of-step concentrations per layer [mg/L].
    current: [f64; 2],
    /// Overlying-water concentration [mg/L].
    water: f64,
    /// Areal sources per layer [g/m²/day].
    source: [f64; 2],
}

impl Balance {
    /// End-of-step concentrations, implicit in both layers.
    fn solve(&self, tracer: &str, node: usize) -> LittoralResult<[f64; 2]> {
        let exchange = self.mixing + self.burial;
        let a = [
            [
                self.aerobic / self.dt + self.surface + exchange + self.reaction[0],
                -self.mixing,
            ],
            [
                -exchange,
                self.anaerobic / self.dt + exchange + self.reaction[1],
            ],
        ];
        let b = [
            self.aerobic / self.dt * self.current[0] + self.surface * self.water + self.source[0],
            self.anaerobic / self.dt * self.current[1] + self.source[1],
        ];
        solve2(a, b, SOLVER_TOLERANCE).ok_or_else(|| LittoralError::SingularSystem {
            tracer: tracer.to_string(),
            node,
        })
    }
}

/// Two-layer benthos coupled under the deepest water layer.
///
/// The sediment keeps its own per-node geometry rather than the water
/// grid's fixed layers, so it sits outside the
/// [`System`](crate::reactor::System) trait and the reactor drives it
/// directly: [`Sediment::conversion`] books settled mass, then
/// [`Sediment::step`] runs diagenesis and the nutrient balances, and
/// [`Sediment::commit`] or [`Sediment::discard`] resolves the step.
#[derive(Debug, Clone)]
pub struct Sediment {
    parameters: SedimentParameters,
    nodes: usize,
    /// Aerobic thickness from the last step [m].
    aerobic: Array1<f64>,
    /// Anaerobic thickness [m]; the pair always sums to the active depth.
    anaerobic: Array1<f64>,
    /// Converged surface transfer velocity [m/day].
    transfer: Array1<f64>,
    /// Sediment oxygen demand from the last step [g/m²/day].
    demand: Array1<f64>,
    ammonium: Pool,
    nox: Pool,
    phosphate: Pool,
    silicate: Pool,
    stocks: Stocks,
    deposits: Deposits,
}

impl Sediment {
    pub fn new(nodes: usize) -> Self {
        Self::from_parameters(nodes, SedimentParameters::default())
    }

    pub fn from_parameters(nodes: usize, parameters: SedimentParameters) -> Self {
        let shape = GridShape::new(nodes, 2);
        Self {
            aerobic: Array1::zeros(nodes),
            anaerobic: Array1::from_elem(nodes, parameters.depth),
            transfer: Array1::zeros(nodes),
            demand: Array1::zeros(nodes),
            ammonium: Pool::new(nitrogen::AMMONIUM, shape),
            nox: Pool::new(nitrogen::NOX, shape),
            phosphate: Pool::new(phosphorus::PHOSPHATE, shape),
            silicate: Pool::new(silica::SILICATE, shape),
            stocks: Stocks::new(nodes),
            deposits: Deposits::new(nodes),
            nodes,
            parameters,
        }
    }

    pub fn parameters(&self) -> &SedimentParameters {
        &self.parameters
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Aerobic-layer thickness per node [m].
    pub fn aerobic(&self) -> &Array1<f64> {
        &self.aerobic
    }

    /// Anaerobic-layer thickness per node [m].
    pub fn anaerobic(&self) -> &Array1<f64> {
        &self.anaerobic
    }

    /// Converged surface transfer velocity per node [m/day].
    pub fn transfer_velocity(&self) -> &Array1<f64> {
        &self.transfer
    }

    /// Sediment oxygen demand per node [g/m²/day].
    pub fn demand(&self) -> &Array1<f64> {
        &self.demand
    }

    pub fn pool(&self, key: &str) -> LittoralResult<&Pool> {
        [&self.ammonium, &self.nox, &self.phosphate, &self.silicate]
            .into_iter()
            .find(|pool| pool.key() == key)
            .ok_or_else(|| LittoralError::UnknownPool {
                system: NAME.to_string(),
                pool: key.to_string(),
            })
    }

    pub fn pool_mut(&mut self, key: &str) -> LittoralResult<&mut Pool> {
        [
            &mut self.ammonium,
            &mut self.nox,
            &mut self.phosphate,
            &mut self.silicate,
        ]
        .into_iter()
        .find(|pool| pool.key() == key)
        .ok_or_else(|| LittoralError::UnknownPool {
            system: NAME.to_string(),
            pool: key.to_string(),
        })
    }

    /// Book areal deposition from a settled water-column pool [g/m²].
    ///
    /// This is the single doorway from the water column into the benthos:
    /// every settleable pool key has a destination bin here, scaled by the
    /// per-node benthic temperature correction, and an unknown key is a
    /// configuration error rather than silently lost mass.
    pub fn conversion(
        &mut self,
        key: &str,
        export: &Array1<f64>,
        correction: &Array1<f64>,
    ) -> LittoralResult<()> {
        for (field, values) in [("deposition", export), ("deposition correction", correction)] {
            if values.len() != self.nodes {
                return Err(LittoralError::ShapeMismatch {
                    field: format!("{field} of '{key}'"),
                    expected: (self.nodes, 1),
                    found: (values.len(), 1),
                });
            }
        }
        let bin = match key {
            carbon::LABILE_PARTICULATE | carbon::RECYCLED_PARTICULATE => {
                &mut self.deposits.labile_carbon
            }
            carbon::REFRACTORY_PARTICULATE => &mut self.deposits.refractory_carbon,
            nitrogen::LABILE_PARTICULATE => &mut self.deposits.labile_nitrogen,
            nitrogen::REFRACTORY_PARTICULATE => &mut self.deposits.refractory_nitrogen,
            phosphorus::LABILE_PARTICULATE => &mut self.deposits.labile_phosphorus,
            phosphorus::REFRACTORY_PARTICULATE => &mut self.deposits.refractory_phosphorus,
            silica::BIOGENIC => &mut self.deposits.biogenic_silica,
            phosphorus::PHOSPHATE => &mut self.deposits.phosphate,
            silica::SILICATE => &mut self.deposits.silicate,
            _ => {
                return Err(LittoralError::Configuration(format!(
                    "no sediment destination for pool '{key}'"
                )))
            }
        };
        *bin += &(export * correction);
        Ok(())
    }

    /// Advance the benthos one step against the given bottom water.
    ///
    /// Booked deposits join the stocks, the stocks mineralize, and the
    /// four nutrient balances solve implicitly around the fixed point on
    /// the surface transfer velocity. Deltas land on the sediment pools
    /// for [`Sediment::commit`]; the returned fluxes are what the water
    /// column receives.
    pub fn step(&mut self, water: &BottomWater, dt: f64) -> LittoralResult<BenthicFlux> {
        let nodes = self.nodes;
        for (field, values) in [
            ("bottom anomaly", &water.anomaly),
            ("bottom salinity", &water.salinity),
            ("bottom oxygen", &water.oxygen),
            ("bottom ammonium", &water.ammonium),
            ("bottom nox", &water.nox),
            ("bottom phosphate", &water.phosphate),
            ("bottom silicate", &water.silicate),
        ] {
            if values.len() != nodes {
                return Err(LittoralError::ShapeMismatch {
                    field: field.to_string(),
                    expected: (nodes, 1),
                    found: (values.len(), 1),
                });
            }
        }
        if dt <= 0.0 {
            return Ok(BenthicFlux::zeros(nodes));
        }

        let p = self.parameters.clone();
        let burial = p.burial_velocity();
        let depth = p.depth;

        // The aerobic partition coefficient collapses toward one as the
        // overlying water turns hypoxic, letting trapped phosphate out.
        let mut enhancement = Array1::from_elem(nodes, p.phosphate_enhancement);
        for &(node, exponent) in &water.hypoxic {
            if node < nodes {
                enhancement[node] = p.phosphate_enhancement.powf(1.0 + exponent);
            }
        }

        let mut next_stocks = self.stocks.clone();
        let mut next_aerobic = Array1::zeros(nodes);
        let mut next_anaerobic = Array1::zeros(nodes);
        let mut next_transfer = Array1::zeros(nodes);
        let mut next_demand = Array1::zeros(nodes);
        let mut ammonium_delta = Array2::zeros((nodes, 2));
        let mut nox_delta = Array2::zeros((nodes, 2));
        let mut phosphate_delta = Array2::zeros((nodes, 2));
        let mut silicate_delta = Array2::zeros((nodes, 2));
        let mut flux = BenthicFlux::zeros(nodes);

        for node in 0..nodes {
            let anomaly = water.anomaly[node];
            let salinity = water.salinity[node];
            let oxygen = water.oxygen[node].max(p.oxygen_floor);
            let depth_old = self.anaerobic[node].max(MINIMUM_LAYER);

            let ammonium_1 = self.ammonium.concentration()[[node, AEROBIC]];
            let ammonium_2 = self.ammonium.concentration()[[node, ANAEROBIC]];
            let nox_1 = self.nox.concentration()[[node, AEROBIC]];
            let nox_2 = self.nox.concentration()[[node, ANAEROBIC]];
            let phosphate_1 = self.phosphate.concentration()[[node, AEROBIC]];
            let phosphate_2 = self.phosphate.concentration()[[node, ANAEROBIC]];
            let silicate_1 = self.silicate.concentration()[[node, AEROBIC]];
            let silicate_2 = self.silicate.concentration()[[node, ANAEROBIC]];

            // Diagenesis: deposition tops a stock up, mineralization and
            // burial draw it down, and the mineralized mass becomes an
            // areal nutrient source for the balances below.
            let advance = |stock: f64, deposit: f64, kappa: f64| -> (f64, f64) {
                let updated =
                    (stock + deposit / depth_old) / (1.0 + (kappa + burial / depth_old) * dt);
                (updated, kappa * updated * depth_old)
            };
            let labile = p.labile_diagenesis.at(anomaly);
            let refractory = p.refractory_diagenesis.at(anomaly);
            let (labile_carbon, labile_carbon_source) = advance(
                self.stocks.labile_carbon[node],
                self.deposits.labile_carbon[node],
                labile,
            );
            let (refractory_carbon, refractory_carbon_source) = advance(
                self.stocks.refractory_carbon[node],
                self.deposits.refractory_carbon[node],
                refractory,
            );
            let (labile_nitrogen, labile_nitrogen_source) = advance(
                self.stocks.labile_nitrogen[node],
                self.deposits.labile_nitrogen[node],
                labile,
            );
            let (refractory_nitrogen, refractory_nitrogen_source) = advance(
                self.stocks.refractory_nitrogen[node],
                self.deposits.refractory_nitrogen[node],
                refractory,
            );
            let (labile_phosphorus, labile_phosphorus_source) = advance(
                self.stocks.labile_phosphorus[node],
                self.deposits.labile_phosphorus[node],
                labile,
            );
            let (refractory_phosphorus, refractory_phosphorus_source) = advance(
                self.stocks.refractory_phosphorus[node],
                self.deposits.refractory_phosphorus[node],
                refractory,
            );
            // Biogenic silica dissolves toward pore-water saturation and
            // stalls once the deep layer reaches it.
            let undersaturation = (1.0 - silicate_2 / p.silicate_saturation).max(0.0);
            let (biogenic_silica, silica_source) = advance(
                self.stocks.biogenic_silica[node],
                self.deposits.biogenic_silica[node],
                p.silica_dissolution.at(anomaly) * undersaturation,
            );

            next_stocks.labile_carbon[node] = labile_carbon;
            next_stocks.refractory_carbon[node] = refractory_carbon;
            next_stocks.labile_nitrogen[node] = labile_nitrogen;
            next_stocks.refractory_nitrogen[node] = refractory_nitrogen;
            next_stocks.labile_phosphorus[node] = labile_phosphorus;
            next_stocks.refractory_phosphorus[node] = refractory_phosphorus;
            next_stocks.biogenic_silica[node] = biogenic_silica;

            let carbon_source = labile_carbon_source + refractory_carbon_source;
            let nitrogen_source = labile_nitrogen_source + refractory_nitrogen_source;
            let phosphorus_source = labile_phosphorus_source + refractory_phosphorus_source;

            let diffusion = p.diffusion.at(anomaly);
            let dissolved = p.dissolved_mixing(anomaly);
            let particulate = p.particulate_mixing(anomaly);
            let mixing = |fraction: f64| dissolved * fraction + particulate * (1.0 - fraction);
            let ammonium_dissolved = p.dissolved_fraction(p.ammonium_partition);
            let km_ammonium = p.km_ammonium.at(anomaly);
            let oxygen_monod = oxygen / (2.0 * p.km_oxygen + oxygen);
            // Squared-rate constants: the aerobic reaction velocity is
            // base² theta^anomaly / s.
            let nitrify = p.nitrification(salinity);
            let squared_nitrification = nitrify.base * nitrify.at(anomaly);
            let denitrify = p.denitrification(salinity);
            let squared_denitrification = denitrify.base * denitrify.at(anomaly);
            let deep_denitrification = p.denitrification_deep.at(anomaly);

            // Fixed point on the surface transfer velocity: the oxygen
            // demand normalized by the overlying concentration sets s,
            // and s feeds back into the nitrogen kinetics that shape the
            // demand. Seeded from the previous step where one exists.
            let carbonaceous = carbon_source * OXYGEN_PER_CARBON;
            let mut s = if self.transfer[node] > MINIMUM_TRANSFER {
                self.transfer[node]
            } else {
                (carbonaceous / oxygen).max(MINIMUM_TRANSFER)
            };
            let mut aerobic = (diffusion / s).min(depth);
            let mut anaerobic = depth - aerobic;
            let mut ammonium_next = [ammonium_1, ammonium_2];
            let mut nox_next = [nox_1, nox_2];
            let mut demand = carbonaceous;
            let mut converged = false;
            for _ in 0..p.max_iterations {
                aerobic = (diffusion / s).min(depth);
                anaerobic = depth - aerobic;

                let monod = oxygen_monod * km_ammonium / (km_ammonium + ammonium_1);
                let nitrification = squared_nitrification / s * monod;
                ammonium_next = Balance {
                    aerobic,
                    anaerobic,
                    dt,
                    surface: s * ammonium_dissolved,
                    mixing: mixing(ammonium_dissolved),
                    burial,
                    reaction: [nitrification, 0.0],
                    current: [ammonium_1, ammonium_2],
                    water: water.ammonium[node],
                    source: [0.0, nitrogen_source],
                }
                .solve(nitrogen::AMMONIUM, node)?;
                let nitrified = nitrification * ammonium_next[0];

                let denitrification = squared_denitrification / s;
                nox_next = Balance {
                    aerobic,
                    anaerobic,
                    dt,
                    surface: s,
                    mixing: mixing(1.0),
                    burial,
                    reaction: [denitrification, deep_denitrification],
                    current: [nox_1, nox_2],
                    water: water.nox[node],
                    source: [nitrified, 0.0],
                }
                .solve(nitrogen::NOX, node)?;
                let denitrified =
                    denitrification * nox_next[0] + deep_denitrification * nox_next[1];

                demand = (carbonaceous + OXYGEN_PER_NITROGEN * nitrified
                    - OXYGEN_PER_CARBON * CARBON_PER_NITROGEN * denitrified)
                    .max(0.0);
                let updated = (demand / oxygen).max(MINIMUM_TRANSFER);
                if (updated - s).abs() <= p.tolerance * updated {
                    converged = true;
                    break;
                }
                s = updated;
            }
            if !converged {
                log::warn!(
                    "sediment transfer velocity did not converge at node {node}; \
                     keeping the last iterate"
                );
            }

            // Phosphate and silicate ride on the converged geometry; their
            // sorbed deposition dissolves straight into the deep layer.
            let phosphate_deep = p.dissolved_fraction(p.phosphate_partition);
            let phosphate_surface =
                p.dissolved_fraction(p.phosphate_partition * enhancement[node]);
            let phosphate_next = Balance {
                aerobic,
                anaerobic,
                dt,
                surface: s * phosphate_surface,
                mixing: mixing(phosphate_deep),
                burial,
                reaction: [0.0, 0.0],
                current: [phosphate_1, phosphate_2],
                water: water.phosphate[node],
                source: [
                    0.0,
                    phosphorus_source + self.deposits.phosphate[node] / dt,
                ],
            }
            .solve(phosphorus::PHOSPHATE, node)?;

            let silicate_dissolved = p.dissolved_fraction(p.silicate_partition);
            let silicate_next = Balance {
                aerobic,
                anaerobic,
                dt,
                surface: s * silicate_dissolved,
                mixing: mixing(silicate_dissolved),
                burial,
                reaction: [0.0, 0.0],
                current: [silicate_1, silicate_2],
                water: water.silicate[node],
                source: [0.0, silica_source + self.deposits.silicate[node] / dt],
            }
            .solve(silica::SILICATE, node)?;

            flux.ammonium[node] = s * ammonium_dissolved * (ammonium_next[0] - water.ammonium[node]);
            flux.nox[node] = s * (nox_next[0] - water.nox[node]);
            flux.phosphate[node] =
                s * phosphate_surface * (phosphate_next[0] - water.phosphate[node]);
            flux.silicate[node] =
                s * silicate_dissolved * (silicate_next[0] - water.silicate[node]);
            flux.oxygen_demand[node] = demand;

            next_aerobic[node] = aerobic;
            next_anaerobic[node] = anaerobic;
            next_transfer[node] = s;
            next_demand[node] = demand;
            ammonium_delta[[node, AEROBIC]] = ammonium_next[0] - ammonium_1;
            ammonium_delta[[node, ANAEROBIC]] = ammonium_next[1] - ammonium_2;
            nox_delta[[node, AEROBIC]] = nox_next[0] - nox_1;
            nox_delta[[node, ANAEROBIC]] = nox_next[1] - nox_2;
            phosphate_delta[[node, AEROBIC]] = phosphate_next[0] - phosphate_1;
            phosphate_delta[[node, ANAEROBIC]] = phosphate_next[1] - phosphate_2;
            silicate_delta[[node, AEROBIC]] = silicate_next[0] - silicate_1;
            silicate_delta[[node, ANAEROBIC]] = silicate_next[1] - silicate_2;
        }

        // Write phase: nothing above touched self, so an early return on
        // a singular balance leaves the sediment untouched.
        self.stocks = next_stocks;
        self.aerobic = next_aerobic;
        self.anaerobic = next_anaerobic;
        self.transfer = next_transfer;
        self.demand = next_demand;
        self.ammonium.accept(&ammonium_delta)?;
        self.nox.accept(&nox_delta)?;
        self.phosphate.accept(&phosphate_delta)?;
        self.silicate.accept(&silicate_delta)?;
        self.deposits.clear();
        Ok(flux)
    }

    /// Commit the step's deltas, with per-layer volumes built from the
    /// node areas and the current layer thicknesses.
    pub fn commit(&mut self, area: &Array1<f64>) -> LittoralResult<()> {
        if area.len() != self.nodes {
            return Err(LittoralError::ShapeMismatch {
                field: "sediment area".to_string(),
                expected: (self.nodes, 1),
                found: (area.len(), 1),
            });
        }
        let mut volume = Array2::zeros((self.nodes, 2));
        for node in 0..self.nodes {
            volume[[node, AEROBIC]] = area[node] * self.aerobic[node];
            volume[[node, ANAEROBIC]] = area[node] * self.anaerobic[node];
        }
        for pool in [
            &mut self.ammonium,
            &mut self.nox,
            &mut self.phosphate,
            &mut self.silicate,
        ] {
            pool.transfer(&volume, NAME)?;
        }
        Ok(())
    }

    /// Drop pending deltas and booked deposits after a failed step.
    ///
    /// Deposits go too: discarding the water-column step restores the
    /// settled mass to its pools, so keeping the bins would double it on
    /// the retry.
    pub fn discard(&mut self) {
        for pool in [
            &mut self.ammonium,
            &mut self.nox,
            &mut self.phosphate,
            &mut self.silicate,
        ] {
            pool.discard();
        }
        self.deposits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use littoral_core::kinetics::RateConstant;
    use ndarray::arr1;

    use crate::parameters::CENTIMETERS_PER_YEAR;

    #[test]
    fn deposition_and_burial_preserve_the_active_depth() {
        let mut sediment = Sediment::new(2);
        let water = BottomWater::quiescent(2);
        sediment
            .conversion(
                carbon::LABILE_PARTICULATE,
                &arr1(&[5.0, 0.0]),
                &arr1(&[1.0, 1.0]),
            )
            .unwrap();
        for _ in 0..3 {
            sediment.step(&water, 0.5).unwrap();
            sediment.commit(&arr1(&[100.0, 100.0])).unwrap();
            for node in 0..2 {
                let total = sediment.aerobic()[node] + sediment.anaerobic()[node];
                assert_relative_eq!(total, 0.1, max_relative = 1e-12);
                assert!(sediment.aerobic()[node] >= 0.0);
                assert!(sediment.anaerobic()[node] >= 0.0);
            }
        }
    }

    #[test]
    fn a_zero_length_step_changes_nothing() {
        let mut sediment = Sediment::new(1);
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[2.0]), &arr1(&[1.0]))
            .unwrap();
        let flux = sediment.step(&BottomWater::quiescent(1), 0.0).unwrap();
        assert_eq!(flux.oxygen_demand[0], 0.0);
        assert_eq!(sediment.stocks.labile_carbon[0], 0.0);
        // The booked deposit survives for the next real step.
        assert_eq!(sediment.deposits.labile_carbon[0], 2.0);
    }

    #[test]
    fn deposition_with_no_destination_is_a_configuration_error() {
        let mut sediment = Sediment::new(1);
        let result = sediment.conversion("chlorophyll", &arr1(&[1.0]), &arr1(&[1.0]));
        assert!(matches!(result, Err(LittoralError::Configuration(_))));
    }

    #[test]
    fn recycled_and_labile_carbon_share_a_deposition_bin() {
        let mut sediment = Sediment::new(1);
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[2.0]), &arr1(&[1.5]))
            .unwrap();
        sediment
            .conversion(carbon::RECYCLED_PARTICULATE, &arr1(&[1.0]), &arr1(&[1.0]))
            .unwrap();
        assert_relative_eq!(sediment.deposits.labile_carbon[0], 4.0, max_relative = 1e-12);
    }

    #[test]
    fn mineralizing_nitrogen_returns_ammonium_to_the_water() {
        let mut sediment = Sediment::new(1);
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[10.0]), &arr1(&[1.0]))
            .unwrap();
        sediment
            .conversion(nitrogen::LABILE_PARTICULATE, &arr1(&[2.0]), &arr1(&[1.0]))
            .unwrap();
        let flux = sediment.step(&BottomWater::quiescent(1), 1.0).unwrap();
        assert!(flux.oxygen_demand[0] > 0.0);
        assert!(flux.ammonium[0] > 0.0);
        // Part of what diffuses up nitrifies, so nitrate leaves as well.
        assert!(flux.nox[0] > 0.0);
        assert!(sediment.stocks.labile_nitrogen[0] > 0.0);
    }

    #[test]
    fn nitrate_rich_water_drives_denitrification() {
        let deposit = arr1(&[10.0]);
        let ones = arr1(&[1.0]);

        let mut plain = Sediment::new(1);
        plain
            .conversion(carbon::LABILE_PARTICULATE, &deposit, &ones)
            .unwrap();
        let reference = plain.step(&BottomWater::quiescent(1), 1.0).unwrap();

        let mut fed = Sediment::new(1);
        fed.conversion(carbon::LABILE_PARTICULATE, &deposit, &ones)
            .unwrap();
        let mut water = BottomWater::quiescent(1);
        water.nox[0] = 2.0;
        let flux = fed.step(&water, 1.0).unwrap();

        // Nitrate is drawn down into the sediment and the denitrification
        // credit trims the oxygen demand.
        assert!(flux.nox[0] < 0.0);
        assert!(flux.oxygen_demand[0] < reference.oxygen_demand[0]);
    }

    #[test]
    fn hypoxia_releases_sorbed_phosphate() {
        let deposit = arr1(&[10.0]);
        let ones = arr1(&[1.0]);

        let mut trapped = Sediment::new(1);
        trapped
            .conversion(carbon::LABILE_PARTICULATE, &deposit, &ones)
            .unwrap();
        trapped
            .conversion(phosphorus::LABILE_PARTICULATE, &arr1(&[1.0]), &ones)
            .unwrap();
        let oxic = trapped.step(&BottomWater::quiescent(1), 1.0).unwrap();

        let mut released = Sediment::new(1);
        released
            .conversion(carbon::LABILE_PARTICULATE, &deposit, &ones)
            .unwrap();
        released
            .conversion(phosphorus::LABILE_PARTICULATE, &arr1(&[1.0]), &ones)
            .unwrap();
        let mut water = BottomWater::quiescent(1);
        water.oxygen[0] = 0.5;
        water.hypoxic = vec![(0, -0.75)];
        let hypoxic = released.step(&water, 1.0).unwrap();

        assert!(oxic.phosphate[0] > 0.0);
        assert!(hypoxic.phosphate[0] > oxic.phosphate[0]);
    }

    #[test]
    fn silica_dissolution_stalls_at_saturation() {
        let mut sediment = Sediment::new(1);
        sediment
            .conversion(silica::BIOGENIC, &arr1(&[5.0]), &arr1(&[1.0]))
            .unwrap();
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[5.0]), &arr1(&[1.0]))
            .unwrap();
        sediment
            .silicate
            .set_concentration_at(0, ANAEROBIC, 45.0)
            .unwrap();
        sediment.step(&BottomWater::quiescent(1), 1.0).unwrap();
        // Pore water above 40 mg Si/L: the debris only buries.
        let buried = (5.0 / 0.1) / (1.0 + 0.25 * CENTIMETERS_PER_YEAR / 0.1);
        assert_relative_eq!(
            sediment.stocks.biogenic_silica[0],
            buried,
            max_relative = 1e-12
        );
    }

    #[test]
    fn a_degenerate_balance_names_the_tracer_and_leaves_state_alone() {
        let parameters = SedimentParameters {
            diffusion: RateConstant::new(0.0, 1.08),
            particle_mixing: RateConstant::new(0.0, 1.117),
            burial: 0.0,
            nitrification_marine: RateConstant::new(0.0, 1.12),
            nitrification_fresh: RateConstant::new(0.0, 1.08),
            ..SedimentParameters::default()
        };
        let mut sediment = Sediment::from_parameters(1, parameters);
        sediment.stocks.labile_carbon[0] = 10.0;
        let error = sediment
            .step(&BottomWater::quiescent(1), 1e9)
            .unwrap_err();
        match error {
            LittoralError::SingularSystem { tracer, node } => {
                assert_eq!(tracer, nitrogen::AMMONIUM);
                assert_eq!(node, 0);
            }
            other => panic!("expected a singular system, got {other:?}"),
        }
        assert_eq!(sediment.stocks.labile_carbon[0], 10.0);
        assert_eq!(sediment.ammonium.delta().sum(), 0.0);
    }

    #[test]
    fn an_exhausted_fixed_point_still_returns_the_last_iterate() {
        let parameters = SedimentParameters {
            max_iterations: 1,
            tolerance: 1e-16,
            ..SedimentParameters::default()
        };
        let mut sediment = Sediment::from_parameters(1, parameters);
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[10.0]), &arr1(&[1.0]))
            .unwrap();
        let mut water = BottomWater::quiescent(1);
        water.ammonium[0] = 5.0;
        let flux = sediment.step(&water, 1.0).unwrap();
        assert!(flux.oxygen_demand[0].is_finite());
        assert!(flux.oxygen_demand[0] > 0.0);
    }

    #[test]
    fn committing_applies_the_benthic_deltas() {
        let mut sediment = Sediment::new(1);
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[10.0]), &arr1(&[1.0]))
            .unwrap();
        sediment
            .conversion(nitrogen::LABILE_PARTICULATE, &arr1(&[2.0]), &arr1(&[1.0]))
            .unwrap();
        sediment.step(&BottomWater::quiescent(1), 1.0).unwrap();
        let pending = sediment.ammonium.delta()[[0, ANAEROBIC]];
        assert!(pending > 0.0);
        sediment.commit(&arr1(&[50.0])).unwrap();
        assert_relative_eq!(
            sediment.ammonium.concentration()[[0, ANAEROBIC]],
            pending,
            max_relative = 1e-12
        );
        assert_eq!(sediment.ammonium.delta().sum(), 0.0);
    }

    #[test]
    fn discarding_drops_pending_deltas_and_deposits() {
        let mut sediment = Sediment::new(1);
        sediment
            .conversion(carbon::LABILE_PARTICULATE, &arr1(&[5.0]), &arr1(&[1.0]))
            .unwrap();
        sediment
            .conversion(nitrogen::LABILE_PARTICULATE, &arr1(&[2.0]), &arr1(&[1.0]))
            .unwrap();
        sediment.step(&BottomWater::quiescent(1), 1.0).unwrap();
        assert!(sediment.ammonium.delta().sum() > 0.0);
        sediment
            .conversion(nitrogen::LABILE_PARTICULATE, &arr1(&[2.0]), &arr1(&[1.0]))
            .unwrap();
        sediment.discard();
        assert_eq!(sediment.ammonium.delta().sum(), 0.0);
        assert_eq!(sediment.deposits.labile_nitrogen[0], 0.0);
    }
}
