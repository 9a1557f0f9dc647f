//! Fuel Integration
//!
//! Converts successive readings of the controller's fuel-used counter into
//! consumed volume and exposes the remaining volume and percentage. Also
//! carries a pulse-width flow estimate for display.

mod error;
mod injector;
mod integrator;

pub use error::FuelError;
pub use injector::InjectorModel;
pub use integrator::{FuelConfig, FuelIntegrator, FuelReading};
