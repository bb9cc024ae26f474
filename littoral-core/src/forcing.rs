//! External forcing applied to pools between kinetics steps.
//!
//! A [`Condition`] carries one forcing field for one target pool. Sources
//! add `value * scale` into the pool's pending delta (loads, atmospheric
//! deposition); boundaries overwrite the concentration at their mapped
//! positions outright. Time-varying conditions interpolate linearly
//! between successive forcing records fed to [`Condition::read`].

use crate::errors::{LittoralError, LittoralResult};
use crate::mesh::GridShape;
use crate::pool::Pool;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Node/layer subsets a condition acts on. An empty subset means every
/// node (or layer), with a single broadcast value along that axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionMap {
    nodes: Vec<usize>,
    layers: Vec<usize>,
}

impl ConditionMap {
    /// Uniform over the whole grid (one broadcast value).
    pub fn all() -> Self {
        Self::default()
    }

    /// Specific nodes, every layer.
    pub fn nodes(nodes: Vec<usize>) -> Self {
        Self {
            nodes,
            layers: Vec::new(),
        }
    }

    /// Every node, top layer only (atmospheric loads).
    pub fn surface() -> Self {
        Self {
            nodes: Vec::new(),
            layers: vec![0],
        }
    }

    pub fn at(nodes: Vec<usize>, layers: Vec<usize>) -> Self {
        Self { nodes, layers }
    }

    /// Effective dimensions of the value grid this map carries.
    fn value_dim(&self) -> (usize, usize) {
        (self.nodes.len().max(1), self.layers.len().max(1))
    }

    fn validate(&self, shape: GridShape) -> LittoralResult<()> {
        if let Some(&node) = self.nodes.iter().find(|&&n| n >= shape.nodes) {
            return Err(LittoralError::Configuration(format!(
                "condition maps node {} but the grid has {} nodes",
                node, shape.nodes
            )));
        }
        if let Some(&layer) = self.layers.iter().find(|&&l| l >= shape.layers) {
            return Err(LittoralError::Configuration(format!(
                "condition maps layer {} but the grid has {} layers",
                layer, shape.layers
            )));
        }
        Ok(())
    }

    fn node_targets(&self, nodes: usize) -> Vec<usize> {
        if self.nodes.is_empty() {
            (0..nodes).collect()
        } else {
            self.nodes.clone()
        }
    }

    fn layer_targets(&self, layers: usize) -> Vec<usize> {
        if self.layers.is_empty() {
            (0..layers).collect()
        } else {
            self.layers.clone()
        }
    }
}

/// How a condition touches its target pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Added into the pool's pending delta; participates in the commit
    /// and mass bookkeeping like any kinetic flux.
    Source,
    /// Overwrites the pool's concentration at the mapped positions,
    /// intentionally outside mass-balance bookkeeping.
    Boundary,
}

/// One forcing field bound to a grid shape.
#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    map: ConditionMap,
    shape: GridShape,
    /// Unit conversion folded into the value at read time.
    scale: f64,
    value: Array2<f64>,
    slope: Array2<f64>,
    next: Option<f64>,
    constant: bool,
    mass: f64,
}

/// Persisted form of a condition: the ordered tuple `(scale, value, map)`.
/// Tuple position is the compatibility contract with existing dumps, so
/// the field order here must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSnapshot(pub f64, pub Array2<f64>, pub ConditionMap);

impl Condition {
    fn new(kind: ConditionKind, map: ConditionMap, shape: GridShape) -> LittoralResult<Self> {
        map.validate(shape)?;
        let dim = map.value_dim();
        Ok(Self {
            kind,
            map,
            shape,
            scale: 1.0,
            value: Array2::zeros(dim),
            slope: Array2::zeros(dim),
            next: None,
            constant: true,
            mass: 0.0,
        })
    }

    /// Load condition added to the target pool's delta.
    pub fn source(map: ConditionMap, shape: GridShape) -> LittoralResult<Self> {
        Self::new(ConditionKind::Source, map, shape)
    }

    /// Override condition imposed on the target pool's concentration.
    pub fn boundary(map: ConditionMap, shape: GridShape) -> LittoralResult<Self> {
        Self::new(ConditionKind::Boundary, map, shape)
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Mark the condition as time-varying so [`read`](Self::read) refreshes
    /// it from forcing records.
    pub fn varying(mut self) -> Self {
        self.constant = false;
        self
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Cumulative mass this condition has injected.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn value(&self) -> &Array2<f64> {
        &self.value
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Set the value field directly (constant conditions, restarts).
    pub fn set_value(&mut self, value: Array2<f64>) -> LittoralResult<()> {
        if value.dim() != self.value.dim() {
            return Err(LittoralError::ShapeMismatch {
                field: "condition value".to_string(),
                expected: self.value.dim(),
                found: value.dim(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Consume one `timestamp,value0,value1,…` forcing record.
    ///
    /// The parsed values are scaled by `conversion` and by this condition's
    /// own `scale`. The first record sets the value outright; later records
    /// set the slope so that [`update`](Self::update) reaches the new
    /// target at the record's timestamp. Returns `Ok(false)` without
    /// touching anything if the condition was declared constant.
    pub fn read(&mut self, record: &str, conversion: f64) -> LittoralResult<bool> {
        if self.is_constant() {
            return Ok(false);
        }
        let numbers = record
            .trim()
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| {
                LittoralError::Forcing(format!("unreadable record '{}'", record.trim()))
            })?;
        let (&timestamp, values) = numbers
            .split_first()
            .ok_or_else(|| LittoralError::Forcing("empty record".to_string()))?;
        if values.len() != self.value.len() {
            return Err(LittoralError::Forcing(format!(
                "record carries {} values, condition expects {}",
                values.len(),
                self.value.len()
            )));
        }
        let factor = conversion * self.scale;
        let target = Array2::from_shape_vec(self.value.dim(), values.to_vec())
            .map_err(|err| LittoralError::Forcing(err.to_string()))?
            * factor;

        match self.next {
            None => {
                self.value.assign(&target);
                self.slope.fill(0.0);
            }
            Some(previous) if timestamp <= previous => {
                return Err(LittoralError::Forcing(format!(
                    "timestamps must increase, got {} after {}",
                    timestamp, previous
                )));
            }
            Some(previous) => {
                let span = timestamp - previous;
                Zip::from(&mut self.slope)
                    .and(&target)
                    .and(&self.value)
                    .for_each(|slope, &target, &value| *slope = (target - value) / span);
            }
        }
        self.next = Some(timestamp);
        Ok(true)
    }

    /// Advance the value along the interpolation slope.
    pub fn update(&mut self, dt: f64) {
        if !self.constant {
            self.value.scaled_add(dt, &self.slope);
        }
    }

    fn check_target(&self, pool: &Pool) -> LittoralResult<()> {
        if pool.shape() != self.shape.dim() {
            return Err(LittoralError::ShapeMismatch {
                field: pool.key().to_string(),
                expected: self.shape.dim(),
                found: pool.shape(),
            });
        }
        Ok(())
    }

    fn sample(&self, row: usize, column: usize) -> f64 {
        let row = if self.map.nodes.is_empty() { 0 } else { row };
        let column = if self.map.layers.is_empty() { 0 } else { column };
        self.value[[row, column]]
    }

    /// Apply the condition to its target pool.
    ///
    /// Sources add `value * scale` into the pool's delta (callers commonly
    /// pass the timestep so the value acts as a daily rate) and record the
    /// total in this condition's mass ledger. Boundaries overwrite the
    /// concentration and ignore `scale`.
    pub fn apply(&mut self, pool: &mut Pool, scale: f64) -> LittoralResult<()> {
        self.check_target(pool)?;
        let nodes = self.map.node_targets(self.shape.nodes);
        let layers = self.map.layer_targets(self.shape.layers);
        match self.kind {
            ConditionKind::Source => {
                let mut total = 0.0;
                for (row, &node) in nodes.iter().enumerate() {
                    for (column, &layer) in layers.iter().enumerate() {
                        let amount = self.sample(row, column) * scale;
                        pool.add_delta_at(node, layer, amount)?;
                        total += amount;
                    }
                }
                self.mass += total;
            }
            ConditionKind::Boundary => {
                for (row, &node) in nodes.iter().enumerate() {
                    for (column, &layer) in layers.iter().enumerate() {
                        pool.set_concentration_at(node, layer, self.sample(row, column))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Persistable `(scale, value, map)` tuple.
    pub fn dump(&self) -> ConditionSnapshot {
        ConditionSnapshot(self.scale, self.value.clone(), self.map.clone())
    }

    /// Restore `(scale, value, map)` from a snapshot. Interpolation state
    /// is reset; the next record read starts a fresh window.
    pub fn load(&mut self, snapshot: ConditionSnapshot) -> LittoralResult<()> {
        let ConditionSnapshot(scale, value, map) = snapshot;
        map.validate(self.shape)?;
        if value.dim() != map.value_dim() {
            return Err(LittoralError::ShapeMismatch {
                field: "condition snapshot".to_string(),
                expected: map.value_dim(),
                found: value.dim(),
            });
        }
        self.scale = scale;
        self.slope = Array2::zeros(value.dim());
        self.value = value;
        self.map = map;
        self.next = None;
        Ok(())
    }
}
