//! Cross-system mass coupling.
//!
//! Reactions that consume mass held by another chemistry system see that
//! system only through the [`MassConsumer`] capability. Oxidation draws
//! oxygen this way, denitrification draws labile dissolved carbon, and the
//! benthic oxygen demand draws bottom-water oxygen. Keeping the coupling
//! behind a trait lets a system run against the real field in the reactor
//! and against a prescribed [`ExternalDemand`] in tests.

use littoral_core::errors::{LittoralError, LittoralResult};
use ndarray::{Array2, ArrayView2};

/// A system that offers a consumable mass field to other systems.
pub trait MassConsumer {
    /// The concentration field the coupling reads.
    fn field(&self) -> ArrayView2<'_, f64>;

    /// The portion of the field actually offered to consumers.
    ///
    /// Defaults to the whole field. Systems with saturating availability
    /// override this; labile carbon offers its Michaelis-Menten fraction
    /// rather than the raw concentration.
    fn availability(&self) -> Array2<f64> {
        self.field().to_owned()
    }

    /// Withdraw `demand` from the backing pool's pending delta.
    ///
    /// The withdrawal is one-sided: the consumed mass leaves the owning
    /// system and its ledger records the loss.
    fn consume(&mut self, demand: &Array2<f64>) -> LittoralResult<()>;
}

/// Prescribed consumer for boundary demands and tests.
///
/// Carries a fixed field and accumulates whatever is consumed against it
/// without feeding back into any pool.
#[derive(Debug, Clone)]
pub struct ExternalDemand {
    field: Array2<f64>,
    consumed: Array2<f64>,
}

impl ExternalDemand {
    pub fn new(field: Array2<f64>) -> Self {
        let consumed = Array2::zeros(field.dim());
        Self { field, consumed }
    }

    /// Mass drawn so far, per position.
    pub fn consumed(&self) -> &Array2<f64> {
        &self.consumed
    }
}

impl MassConsumer for ExternalDemand {
    fn field(&self) -> ArrayView2<'_, f64> {
        self.field.view()
    }

    fn consume(&mut self, demand: &Array2<f64>) -> LittoralResult<()> {
        if demand.dim() != self.field.dim() {
            return Err(LittoralError::ShapeMismatch {
                field: "external demand".to_string(),
                expected: self.field.dim(),
                found: demand.dim(),
            });
        }
        self.consumed += demand;
        Ok(())
    }
}
