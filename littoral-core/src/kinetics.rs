//! Temperature-dependent reaction kinetics.
//!
//! Every chemistry system shares one rate law: a base rate at the 20 °C
//! reference temperature, scaled exponentially by the temperature anomaly.
//! Rate constants are carried as [`RateConstant`] values inside immutable
//! per-system parameter structs.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Reference temperature for all rate laws [°C].
///
/// Anomalies are water or sediment temperature minus this reference.
pub const REFERENCE_TEMPERATURE: f64 = 20.0;

/// Instantaneous first-order rate `base * theta^anomaly`.
pub fn rate(base: f64, theta: f64, anomaly: f64) -> f64 {
    base * theta.powf(anomaly)
}

/// Anomaly for a given water temperature [°C].
pub fn anomaly(temperature: f64) -> f64 {
    temperature - REFERENCE_TEMPERATURE
}

/// One entry of a rate-constant table: the base rate at the reference
/// temperature and the dimensionless temperature coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateConstant {
    /// Rate at the 20 °C reference [1/day].
    pub base: f64,
    /// Temperature coefficient theta.
    pub theta: f64,
}

impl RateConstant {
    pub const fn new(base: f64, theta: f64) -> Self {
        Self { base, theta }
    }

    /// Rate at the given temperature anomaly.
    pub fn at(&self, anomaly: f64) -> f64 {
        rate(self.base, self.theta, anomaly)
    }

    /// Element-wise rate over an anomaly grid.
    pub fn field(&self, anomaly: &Array2<f64>) -> Array2<f64> {
        anomaly.mapv(|a| rate(self.base, self.theta, a))
    }
}

/// Low-temperature ramp suppressing nitrification in cold water.
///
/// Exactly 0 at anomaly <= -20, exactly 1 at anomaly >= 0, linear between.
pub fn low_temperature_ramp(anomaly: f64) -> f64 {
    ((anomaly + 20.0) / 20.0).clamp(0.0, 1.0)
}
