//! Outbound telemetry sinks

use crate::snapshot::VehicleSnapshot;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Sink delivery errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// A relay that forwards snapshots somewhere outside the process
pub trait TelemetrySink: Send {
    fn name(&self) -> &str;

    fn publish(&mut self, snapshot: &VehicleSnapshot) -> Result<(), SinkError>;
}

/// Writes a one-line summary to the log every `every` snapshots
pub struct LogSink {
    every: u32,
    seen: u32,
}

impl LogSink {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            seen: 0,
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(20)
    }
}

impl TelemetrySink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn publish(&mut self, s: &VehicleSnapshot) -> Result<(), SinkError> {
        self.seen = self.seen.wrapping_add(1);
        if self.seen % self.every != 0 {
            return Ok(());
        }

        info!(
            rpm = s.rpm,
            gear = %s.gear.label(),
            fuel_percent = format_args!("{:.1}", s.fuel_percent),
            lap = s.lap_count,
            lap_time = format_args!("{:.2}", s.current_lap_time),
            "telemetry"
        );
        Ok(())
    }
}

/// Registered sinks, fed from the consumer tick
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Box<dyn TelemetrySink>) {
        debug!("Registered telemetry sink '{}'", sink.name());
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Hand the snapshot to every sink; a failing sink never stops the others.
    /// Returns the number of sinks that failed.
    pub fn publish_all(&mut self, snapshot: &VehicleSnapshot) -> usize {
        let mut failed = 0;
        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(snapshot) {
                warn!("Telemetry sink '{}' failed: {}", sink.name(), e);
                failed += 1;
            }
        }
        failed
    }
}
