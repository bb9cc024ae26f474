//! Read-only mesh geometry.
//!
//! Mesh generation, discretization and transport belong to an external
//! provider. The simulation consumes node/layer counts, areas, volumes and
//! depths as supplied and never mutates them within a step.

use crate::errors::{LittoralError, LittoralResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Node and layer counts for one simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub nodes: usize,
    pub layers: usize,
}

impl GridShape {
    pub fn new(nodes: usize, layers: usize) -> Self {
        Self { nodes, layers }
    }

    /// Dimensions in array order (nodes, layers).
    pub fn dim(&self) -> (usize, usize) {
        (self.nodes, self.layers)
    }

    /// Grid of zeros with this shape.
    pub fn zeros(&self) -> Array2<f64> {
        Array2::zeros(self.dim())
    }

    /// Grid filled with a uniform value.
    pub fn filled(&self, value: f64) -> Array2<f64> {
        Array2::from_elem(self.dim(), value)
    }

    /// Index of the bottom layer.
    pub fn bottom(&self) -> usize {
        self.layers - 1
    }
}

/// Geometry for one simulation domain, validated once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    shape: GridShape,
    /// Surface area per node [m^2].
    area: Array1<f64>,
    /// Cell volume per node/layer position [m^3].
    volume: Array2<f64>,
    /// Water depth per node [m].
    depth: Array1<f64>,
}

impl Mesh {
    /// Build a mesh from provider data, checking that every field agrees
    /// with `shape`.
    pub fn new(
        shape: GridShape,
        area: Array1<f64>,
        volume: Array2<f64>,
        depth: Array1<f64>,
    ) -> LittoralResult<Self> {
        if area.len() != shape.nodes {
            return Err(LittoralError::ShapeMismatch {
                field: "mesh area".to_string(),
                expected: (shape.nodes, 1),
                found: (area.len(), 1),
            });
        }
        if volume.dim() != shape.dim() {
            return Err(LittoralError::ShapeMismatch {
                field: "mesh volume".to_string(),
                expected: shape.dim(),
                found: volume.dim(),
            });
        }
        if depth.len() != shape.nodes {
            return Err(LittoralError::ShapeMismatch {
                field: "mesh depth".to_string(),
                expected: (shape.nodes, 1),
                found: (depth.len(), 1),
            });
        }
        Ok(Self {
            shape,
            area,
            volume,
            depth,
        })
    }

    /// Uniform mesh, used by tests and single-box runs.
    pub fn uniform(shape: GridShape, area: f64, volume: f64, depth: f64) -> Self {
        Self {
            shape,
            area: Array1::from_elem(shape.nodes, area),
            volume: Array2::from_elem(shape.dim(), volume),
            depth: Array1::from_elem(shape.nodes, depth),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn area(&self) -> &Array1<f64> {
        &self.area
    }

    pub fn volume(&self) -> &Array2<f64> {
        &self.volume
    }

    pub fn depth(&self) -> &Array1<f64> {
        &self.depth
    }
}
