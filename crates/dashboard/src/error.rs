//! Dashboard error types

use thiserror::Error;

/// Errors from starting or running the dashboard process
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Fuel integrator error: {0}")]
    Fuel(#[from] fuel_integrator::FuelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
