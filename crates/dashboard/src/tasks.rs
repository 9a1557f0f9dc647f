//! Producer and consumer tasks
//!
//! The bus task owns the packet assembler, the session task owns the course
//! and lap timer. Both publish into the shared snapshot; the tick task reads
//! it for the sinks, and the persistence task saves fuel and distance
//! state. Saves run on the blocking pool.

use course_registry::GeoOffset;
use dash_protocol::{PacketAssembler, RawFrame, SimulatedBus};
use fuel_integrator::{FuelIntegrator, InjectorModel};
use chrono::{Local, NaiveDate};
use lap_timer::{GpsFix, LapEvent, Odometer, RaceSession, SessionError, TimerPhase};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage::{DistanceStore, FuelStore, StorageError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use vehicle_state::{SinkSet, SnapshotPublisher};

/// Milliseconds since process start, shared by every task
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Operator commands executed on the session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    SetStartLine,
    SetSector(u32),
    Calibrate,
    ResetSession,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::SetStartLine => "set_start_line",
            SessionCommand::SetSector(_) => "set_sector",
            SessionCommand::Calibrate => "calibrate",
            SessionCommand::ResetSession => "reset_session",
        }
    }
}

/// Result of a successful command
#[derive(Debug, Clone, Serialize)]
pub struct CommandReply {
    pub command: &'static str,
    pub phase: TimerPhase,
    pub waypoints: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<GeoOffset>,
}

pub type CommandResult = Result<CommandReply, SessionError>;

/// Input to the session task, processed in arrival order
#[derive(Debug)]
pub enum SessionInput {
    Fix {
        fix: GpsFix,
        at_ms: u64,
    },
    Command {
        command: SessionCommand,
        reply: oneshot::Sender<CommandResult>,
    },
}

/// Decode bus frames, integrate fuel and publish engine values
pub async fn run_bus(
    mut frames: mpsc::Receiver<RawFrame>,
    mut assembler: PacketAssembler,
    fuel: Arc<FuelIntegrator>,
    injector: InjectorModel,
    publisher: SnapshotPublisher,
) {
    info!("Bus task started");

    while let Some(frame) = frames.recv().await {
        let Some(decoded) = assembler.push(&frame) else {
            continue;
        };

        let channels = &decoded.channels;
        fuel.record(u64::from(channels.fuel_used_raw));
        let flow = injector.flow_ml_per_s(f64::from(channels.rpm), channels.effective_pulse_width_us);
        let reading = fuel.reading();

        publisher.update(|s| {
            s.apply_engine(&decoded);
            s.apply_fuel(&reading, flow);
        });
    }

    let stats = assembler.stats();
    info!(
        "Bus task stopped: {} packets decoded, {} rejected, {} resyncs",
        stats.decoded, stats.rejected, stats.resyncs
    );
}

/// Feed simulated dash packets into the bus channel
pub async fn run_simulator(
    frames: mpsc::Sender<RawFrame>,
    mut bus: SimulatedBus,
    period: Duration,
    clock: Clock,
) {
    info!("Simulated bus running every {:?}", period);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        for frame in bus.frames_at(clock.now_ms()) {
            if frames.send(frame).await.is_err() {
                debug!("Bus channel closed, simulator stopping");
                return;
            }
        }
    }
}

/// Apply one operator command to the session
pub fn execute(session: &mut RaceSession, command: SessionCommand) -> CommandResult {
    let offset = match command {
        SessionCommand::SetStartLine => {
            session.set_start_line()?;
            None
        }
        SessionCommand::SetSector(index) => {
            session.set_sector(index)?;
            None
        }
        SessionCommand::Calibrate => Some(session.calibrate()?),
        SessionCommand::ResetSession => {
            session.reset_session();
            None
        }
    };

    Ok(CommandReply {
        command: command.name(),
        phase: session.phase(),
        waypoints: session.course().waypoints().len(),
        offset,
    })
}

/// Run GPS fixes and operator commands through the race session
pub async fn run_session(
    mut inputs: mpsc::Receiver<SessionInput>,
    mut session: RaceSession,
    publisher: SnapshotPublisher,
    clock: Clock,
) {
    info!(
        "Session task started: {} waypoints, phase {:?}",
        session.course().waypoints().len(),
        session.phase()
    );
    let now = clock.now_ms();
    publisher.update(|s| s.apply_timing(&session, now));

    while let Some(input) = inputs.recv().await {
        match input {
            SessionInput::Fix { fix, at_ms } => {
                if let Some(event) = session.on_fix(fix, at_ms) {
                    log_event(&event);
                }
                let distance = session.odometer().map(|o| o.reading());
                publisher.update(|s| {
                    s.apply_gps(&fix);
                    s.apply_timing(&session, at_ms);
                    if let Some(reading) = &distance {
                        s.apply_distance(reading);
                    }
                });
            }
            SessionInput::Command { command, reply } => {
                let result = execute(&mut session, command);
                if let Err(e) = &result {
                    warn!("Command {} rejected: {}", command.name(), e);
                }
                let now = clock.now_ms();
                let distance = session.odometer().map(|o| o.reading());
                publisher.update(|s| {
                    s.apply_timing(&session, now);
                    if let Some(reading) = &distance {
                        s.apply_distance(reading);
                    }
                });
                // Caller may have given up waiting
                let _ = reply.send(result);
            }
        }
    }

    info!("Session task stopped");
}

fn log_event(event: &LapEvent) {
    match event {
        LapEvent::Started { at } => debug!("Race start at {:.3}s", at),
        LapEvent::Sector { index, time, .. } => debug!("Sector {} in {:.3}s", index, time),
        LapEvent::LapCompleted { lap, lap_time, .. } => debug!("Lap {} in {:.3}s", lap, lap_time),
    }
}

/// Periodic consumer: refresh fuel and lap clock, then fan out to sinks
pub async fn run_tick(
    publisher: SnapshotPublisher,
    fuel: Arc<FuelIntegrator>,
    mut sinks: SinkSet,
    period: Duration,
    clock: Clock,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let reading = fuel.reading();
        let now = clock.now_ms();
        publisher.update(|s| {
            let flow = s.fuel_flow_ml_s;
            s.apply_fuel(&reading, flow);
            s.refresh_lap_time(now);
        });
        sinks.publish_all(&publisher.latest());
    }
}

/// Local calendar date the daily distance is kept against
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Run a file write on the blocking pool. Failures are logged and retried
/// next period.
async fn persist<F>(what: &'static str, write: F) -> bool
where
    F: FnOnce() -> Result<(), StorageError> + Send + 'static,
{
    match tokio::task::spawn_blocking(write).await {
        Ok(Ok(())) => {
            debug!("{} saved", what);
            true
        }
        Ok(Err(e)) => {
            warn!("Failed to save {}: {}", what, e);
            false
        }
        Err(e) => {
            warn!("{} save did not finish: {}", what, e);
            false
        }
    }
}

/// Save the fuel record
pub async fn save_fuel(fuel: &FuelIntegrator, store: &Arc<FuelStore>) -> bool {
    let record = fuel.to_record();
    let store = store.clone();
    persist("Fuel state", move || store.save(&record)).await
}

/// Save the odometer record, rolling the daily distance over first
pub async fn save_distance(odometer: &Odometer, store: &Arc<DistanceStore>, today: NaiveDate) -> bool {
    odometer.roll_day(today);
    let record = odometer.to_record();
    let store = store.clone();
    persist("Distance state", move || store.save(&record)).await
}

/// Low-frequency fuel and distance persistence
pub async fn run_persistence(
    fuel: Arc<FuelIntegrator>,
    fuel_store: Arc<FuelStore>,
    odometer: Arc<Odometer>,
    distance_store: Arc<DistanceStore>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        save_fuel(&fuel, &fuel_store).await;
        save_distance(&odometer, &distance_store, today()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_registry::CourseRegistry;
    use dash_protocol::layout::DEFAULT_CAN_ID;
    use dash_protocol::{encode_packet, split_frames, EngineChannels};
    use fuel_integrator::FuelConfig;
    use lap_timer::{FixStatus, LapTimer};

    fn fix(lat: f64, lon: f64) -> GpsFix {
        GpsFix {
            lat,
            lon,
            quality: 1,
            status: FixStatus::Active,
            heading: 90.0,
            sats: 9,
        }
    }

    fn fuel() -> Arc<FuelIntegrator> {
        Arc::new(
            FuelIntegrator::new(FuelConfig {
                tank_capacity_ml: 4500.0,
                ml_per_count: 1.0,
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_bus_task_updates_snapshot_and_fuel() {
        let (tx, rx) = mpsc::channel(64);
        let fuel = fuel();
        let publisher = SnapshotPublisher::default();
        let task = tokio::spawn(run_bus(
            rx,
            PacketAssembler::default(),
            fuel.clone(),
            InjectorModel::default(),
            publisher.clone(),
        ));

        for (rpm, counter) in [(3000u16, 100u16), (3200, 150)] {
            let packet = encode_packet(&EngineChannels {
                rpm,
                fuel_used_raw: counter,
                battery_voltage: 12.6,
                ..Default::default()
            });
            for frame in split_frames(&packet, DEFAULT_CAN_ID) {
                tx.send(frame).await.unwrap();
            }
        }
        drop(tx);
        task.await.unwrap();

        let snapshot = publisher.latest();
        assert_eq!(snapshot.rpm, 3200);
        assert_eq!(snapshot.packets, 2);
        assert!((snapshot.fuel_remaining_ml - 4450.0).abs() < 1e-9);
        assert!((fuel.session_consumed() - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_session_task_commands_and_fixes() {
        let (tx, rx) = mpsc::channel(16);
        let publisher = SnapshotPublisher::default();
        let session = RaceSession::new(CourseRegistry::default(), LapTimer::default());
        let task = tokio::spawn(run_session(rx, session, publisher.clone(), Clock::new()));

        // No fix yet
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(SessionInput::Command {
            command: SessionCommand::SetStartLine,
            reply: reply_tx,
        })
        .await
        .unwrap();
        assert_eq!(reply_rx.await.unwrap().unwrap_err(), SessionError::NoFix);

        tx.send(SessionInput::Fix {
            fix: fix(35.0, 139.0),
            at_ms: 0,
        })
        .await
        .unwrap();
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(SessionInput::Command {
            command: SessionCommand::SetStartLine,
            reply: reply_tx,
        })
        .await
        .unwrap();
        let reply = reply_rx.await.unwrap().unwrap();
        assert_eq!(reply.phase, TimerPhase::Armed);
        assert_eq!(reply.waypoints, 1);

        for (lon, at_ms) in [(139.0001, 1_000), (138.9999, 2_000)] {
            tx.send(SessionInput::Fix {
                fix: fix(35.0, lon),
                at_ms,
            })
            .await
            .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let snapshot = publisher.latest();
        assert_eq!(snapshot.timer_phase, TimerPhase::Running);
        assert_eq!(snapshot.lap_count, 1);
        assert_eq!(snapshot.gps_sats, 9);
    }

    #[test]
    fn test_execute_calibrate_reports_offset() {
        let mut session = RaceSession::new(CourseRegistry::default(), LapTimer::default());
        session.on_fix(fix(35.0, 139.0), 0);
        execute(&mut session, SessionCommand::SetStartLine).unwrap();
        session.on_fix(fix(35.0001, 139.0), 1000);

        let reply = execute(&mut session, SessionCommand::Calibrate).unwrap();
        assert_eq!(reply.command, "calibrate");
        let offset = reply.offset.unwrap();
        assert!((offset.dlat - 0.0001).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_refreshes_fuel() {
        let fuel = fuel();
        let publisher = SnapshotPublisher::default();
        let task = tokio::spawn(run_tick(
            publisher.clone(),
            fuel.clone(),
            SinkSet::new(),
            Duration::from_millis(50),
            Clock::new(),
        ));

        fuel.record(0);
        fuel.record(450);
        tokio::time::sleep(Duration::from_millis(120)).await;
        task.abort();

        let snapshot = publisher.latest();
        assert!((snapshot.fuel_percent - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_save_fuel_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file makes the rename fail
        let path = dir.path().join("fuel_state.json");
        std::fs::create_dir_all(&path).unwrap();
        let fuel = fuel();
        assert!(!save_fuel(&fuel, &Arc::new(FuelStore::new(&path))).await);

        let ok_path = dir.path().join("ok.json");
        assert!(save_fuel(&fuel, &Arc::new(FuelStore::new(&ok_path))).await);
    }

    #[tokio::test]
    async fn test_save_distance_rolls_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DistanceStore::new(dir.path().join("distance_state.json")));
        let odometer = Odometer::default();
        let day1 = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        odometer.roll_day(day1);
        odometer.record(3.5);
        assert!(save_distance(&odometer, &store, day1).await);
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.daily_km, 3.5);
        assert_eq!(saved.last_date, "2026-10-15");

        assert!(save_distance(&odometer, &store, day2).await);
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.daily_km, 0.0);
        assert_eq!(saved.total_km, 3.5);
        assert_eq!(saved.last_date, "2026-10-16");
    }

    #[tokio::test]
    async fn test_session_task_publishes_distance() {
        let (tx, rx) = mpsc::channel(16);
        let publisher = SnapshotPublisher::default();
        let odometer = Arc::new(Odometer::default());
        let session = RaceSession::new(CourseRegistry::default(), LapTimer::default())
            .with_odometer(odometer.clone());
        let task = tokio::spawn(run_session(rx, session, publisher.clone(), Clock::new()));

        for (lat, at_ms) in [(35.0, 0), (35.001, 1_000)] {
            tx.send(SessionInput::Fix {
                fix: fix(lat, 139.0),
                at_ms,
            })
            .await
            .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let snapshot = publisher.latest();
        assert!((snapshot.session_km - 0.11132).abs() < 1e-9);
        assert!((snapshot.odometer_total_km - 0.11132).abs() < 1e-9);
        assert_eq!(snapshot.tire, "Dry 1");
    }
}
