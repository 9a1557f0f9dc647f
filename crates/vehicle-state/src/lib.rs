//! Vehicle State
//!
//! The read-mostly record produced by the decoder, fuel integrator and lap
//! timer, published as whole immutable copies to the display tick and
//! outbound telemetry sinks.

mod publisher;
mod sink;
mod snapshot;

pub use publisher::SnapshotPublisher;
pub use sink::{LogSink, SinkError, SinkSet, TelemetrySink};
pub use snapshot::VehicleSnapshot;
