//! Fuel Error Types

use thiserror::Error;

/// Errors from fuel integrator configuration and commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuelError {
    /// Conversion factor must be finite and non-negative
    #[error("Invalid conversion factor: {0} ml/count")]
    InvalidFactor(f64),

    /// Remaining volume must be finite and non-negative
    #[error("Invalid remaining volume: {0} ml")]
    InvalidRemaining(f64),
}
