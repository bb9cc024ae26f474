//! Pool grids and the exchange primitive.
//!
//! A [`Pool`] tracks one chemical or biological quantity at every node/layer
//! position: its committed concentration, the pending per-step delta, and
//! two diagnostic ledgers (mass moved through commits, mass injected by
//! clamp corrections). Kinetics only ever touch deltas; [`Pool::transfer`]
//! commits them once per step.
//!
//! Mass moves between pools through [`exchange`] and its layer/scale
//! variants. An exchange naming both a source and a sink conserves mass; a
//! one-sided exchange is an injection or removal recorded in the caller's
//! ledger so created/destroyed mass stays auditable.

use crate::errors::{LittoralError, LittoralResult};
use crate::mesh::GridShape;
use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

/// Range policy applied to a pool's concentration at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangePolicy {
    /// Concentration must stay non-negative; a commit driving it below
    /// zero is a numerical error naming the offending node.
    NonNegative,
    /// Clamp to `[min, max]`, recording the injected or removed mass in
    /// the `added` ledger. `min` must not exceed `max`.
    Clamp { min: f64, max: f64 },
    /// No constraint; deltas may drive the pool negative.
    Unbounded,
}

/// One tracked quantity over a node/layer grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    key: String,
    concentration: Array2<f64>,
    delta: Array2<f64>,
    mass: Array2<f64>,
    added: Array2<f64>,
    policy: RangePolicy,
}

impl Pool {
    /// New pool with zeroed fields and the non-negative policy.
    pub fn new(key: &str, shape: GridShape) -> Self {
        Self {
            key: key.to_string(),
            concentration: shape.zeros(),
            delta: shape.zeros(),
            mass: shape.zeros(),
            added: shape.zeros(),
            policy: RangePolicy::NonNegative,
        }
    }

    pub fn with_policy(mut self, policy: RangePolicy) -> Self {
        if let RangePolicy::Clamp { min, max } = policy {
            assert!(min <= max, "clamp bounds are inverted: {} > {}", min, max);
        }
        self.policy = policy;
        self
    }

    /// Seed the concentration uniformly (initial conditions, tests).
    pub fn with_concentration(mut self, value: f64) -> Self {
        self.concentration.fill(value);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> (usize, usize) {
        self.concentration.dim()
    }

    pub fn concentration(&self) -> &Array2<f64> {
        &self.concentration
    }

    pub fn delta(&self) -> &Array2<f64> {
        &self.delta
    }

    pub fn mass(&self) -> &Array2<f64> {
        &self.mass
    }

    pub fn added(&self) -> &Array2<f64> {
        &self.added
    }

    fn check_shape(&self, amount: &Array2<f64>) -> LittoralResult<()> {
        if amount.dim() != self.delta.dim() {
            return Err(LittoralError::ShapeMismatch {
                field: self.key.clone(),
                expected: self.delta.dim(),
                found: amount.dim(),
            });
        }
        Ok(())
    }

    fn check_position(&self, node: usize, layer: usize) -> LittoralResult<()> {
        let (nodes, layers) = self.delta.dim();
        if node >= nodes || layer >= layers {
            return Err(LittoralError::Configuration(format!(
                "position ({}, {}) outside the {}x{} grid of '{}'",
                node, layer, nodes, layers, self.key
            )));
        }
        Ok(())
    }

    /// Add `amount` into the pending delta.
    ///
    /// This is the unledgered in-system primitive; cross-pool moves go
    /// through [`exchange`].
    pub fn accept(&mut self, amount: &Array2<f64>) -> LittoralResult<()> {
        self.check_shape(amount)?;
        self.delta += amount;
        Ok(())
    }

    /// Remove `amount` from the pending delta.
    pub fn draw(&mut self, amount: &Array2<f64>) -> LittoralResult<()> {
        self.check_shape(amount)?;
        self.delta -= amount;
        Ok(())
    }

    /// Add to the pending delta at one position (forcing sources).
    pub fn add_delta_at(&mut self, node: usize, layer: usize, amount: f64) -> LittoralResult<()> {
        self.check_position(node, layer)?;
        self.delta[[node, layer]] += amount;
        Ok(())
    }

    /// Overwrite the concentration at one position.
    ///
    /// Bypasses delta accounting entirely; boundary conditions only.
    pub fn set_concentration_at(
        &mut self,
        node: usize,
        layer: usize,
        value: f64,
    ) -> LittoralResult<()> {
        self.check_position(node, layer)?;
        self.concentration[[node, layer]] = value;
        Ok(())
    }

    /// Overwrite the whole concentration field; initialization only.
    pub fn fill(&mut self, value: f64) {
        self.concentration.fill(value);
    }

    /// Displace `flux` downward by one layer and return the bottom-layer
    /// export.
    ///
    /// Every layer loses its flux; each layer below the surface gains the
    /// flux of the layer above. The bottom layer's flux leaves the water
    /// column and feeds the sediment deposition contract.
    pub fn settle(&mut self, flux: &Array2<f64>) -> LittoralResult<Array1<f64>> {
        self.check_shape(flux)?;
        let layers = self.delta.dim().1;
        self.delta -= flux;
        for layer in 1..layers {
            let mut column = self.delta.column_mut(layer);
            column += &flux.column(layer - 1);
        }
        Ok(flux.column(layers - 1).to_owned())
    }

    /// Commit the pending delta: concentration takes the delta, the mass
    /// ledger takes `delta * volume`, the delta is zeroed, and the range
    /// policy is enforced.
    pub fn transfer(&mut self, volume: &Array2<f64>, system: &str) -> LittoralResult<()> {
        self.check_shape(volume)?;
        self.concentration += &self.delta;
        Zip::from(&mut self.mass)
            .and(&self.delta)
            .and(volume)
            .for_each(|mass, &delta, &volume| *mass += delta * volume);
        self.delta.fill(0.0);

        match self.policy {
            RangePolicy::Unbounded => {}
            RangePolicy::NonNegative => {
                for ((node, layer), &value) in self.concentration.indexed_iter() {
                    if value < 0.0 {
                        return Err(LittoralError::RangeViolation {
                            system: system.to_string(),
                            pool: self.key.clone(),
                            node,
                            layer,
                            value,
                        });
                    }
                }
            }
            RangePolicy::Clamp { min, max } => {
                Zip::from(&mut self.concentration)
                    .and(&mut self.added)
                    .and(volume)
                    .for_each(|concentration, added, &volume| {
                        let clamped = concentration.clamp(min, max);
                        *added += (clamped - *concentration) * volume;
                        *concentration = clamped;
                    });
            }
        }
        Ok(())
    }

    /// Drop the pending delta without committing it.
    ///
    /// Concentrations and ledgers keep their last committed values, so a
    /// failed step can be retried against unchanged state.
    pub fn discard(&mut self) {
        self.delta.fill(0.0);
    }
}

/// Move `amount` between two pools' pending deltas.
///
/// With both sides given the operation conserves mass exactly; with one
/// side missing the other end is the outside world and the moved mass is
/// recorded in `ledger` (positive for injection, negative for removal).
pub fn exchange(
    amount: &Array2<f64>,
    source: Option<&mut Pool>,
    sink: Option<&mut Pool>,
    ledger: &mut f64,
) -> LittoralResult<()> {
    exchange_scaled(amount, source, sink, 1.0, ledger)
}

/// [`exchange`] with a unit-conversion factor applied to the sink side.
///
/// With neither side given the ledger records the net created mass,
/// `amount * (scale - 1)`.
pub fn exchange_scaled(
    amount: &Array2<f64>,
    mut source: Option<&mut Pool>,
    mut sink: Option<&mut Pool>,
    scale: f64,
    ledger: &mut f64,
) -> LittoralResult<()> {
    if let Some(pool) = source.as_deref() {
        pool.check_shape(amount)?;
    }
    if let Some(pool) = sink.as_deref() {
        pool.check_shape(amount)?;
    }
    if let Some(pool) = source.as_deref_mut() {
        pool.delta -= amount;
    }
    if let Some(pool) = sink.as_deref_mut() {
        if scale == 1.0 {
            pool.delta += amount;
        } else {
            pool.delta.scaled_add(scale, amount);
        }
    }
    match (source.is_some(), sink.is_some()) {
        (true, true) => {}
        (true, false) => *ledger -= amount.sum(),
        (false, true) => *ledger += amount.sum() * scale,
        (false, false) => *ledger += amount.sum() * (scale - 1.0),
    }
    Ok(())
}

/// [`exchange`] restricted to one layer, with a per-node amount.
pub fn exchange_layer(
    amount: &Array1<f64>,
    mut source: Option<&mut Pool>,
    mut sink: Option<&mut Pool>,
    layer: usize,
    ledger: &mut f64,
) -> LittoralResult<()> {
    for pool in [source.as_deref(), sink.as_deref()].into_iter().flatten() {
        let (nodes, layers) = pool.delta.dim();
        if layer >= layers {
            return Err(LittoralError::Configuration(format!(
                "layer {} outside the {} layers of '{}'",
                layer, layers, pool.key
            )));
        }
        if amount.len() != nodes {
            return Err(LittoralError::ShapeMismatch {
                field: pool.key.clone(),
                expected: (nodes, 1),
                found: (amount.len(), 1),
            });
        }
    }
    if let Some(pool) = source.as_deref_mut() {
        let mut column = pool.delta.column_mut(layer);
        column -= amount;
    }
    if let Some(pool) = sink.as_deref_mut() {
        let mut column = pool.delta.column_mut(layer);
        column += amount;
    }
    match (source.is_some(), sink.is_some()) {
        (true, true) | (false, false) => {}
        (true, false) => *ledger -= amount.sum(),
        (false, true) => *ledger += amount.sum(),
    }
    Ok(())
}
