//! Race Dash Server
//!
//! Wires the bus decoder, fuel integrator, course registry, lap timer and
//! odometer into producer/consumer tasks and serves the snapshot and
//! operator commands over HTTP.

use axum::{
    routing::{get, post},
    Router,
};
use course_registry::CourseRegistry;
use dash_protocol::{PacketAssembler, RawFrame, SimulatedBus};
use fuel_integrator::FuelIntegrator;
use lap_timer::{LapTimer, Odometer, RaceSession};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage::{CourseStore, DistanceStore, FuelStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vehicle_state::{LogSink, SinkSet, SnapshotPublisher};

pub mod config;
mod error;
mod routes;
pub mod tasks;

pub use config::DashboardConfig;
pub use error::DashboardError;

use tasks::{Clock, SessionInput};

const FRAME_QUEUE: usize = 512;
const SESSION_QUEUE: usize = 64;
/// Simulated packet period
const SIM_PERIOD: Duration = Duration::from_millis(50);

/// Application state shared across handlers
pub struct AppState {
    pub publisher: SnapshotPublisher,
    pub fuel: Arc<FuelIntegrator>,
    pub fuel_store: Arc<FuelStore>,
    pub odometer: Arc<Odometer>,
    pub distance_store: Arc<DistanceStore>,
    /// Fixes and commands for the session task
    pub session_tx: mpsc::Sender<SessionInput>,
    pub clock: Clock,
    pub version: String,
    pub start_time: Instant,
}

/// A started dashboard: shared state, the bus input and the task handles
pub struct Dashboard {
    pub state: Arc<AppState>,
    /// Raw frames from an external bus transport
    pub frame_tx: mpsc::Sender<RawFrame>,
    handles: Vec<JoinHandle<()>>,
}

impl Dashboard {
    /// Restore persisted state and spawn the bus, session, tick and
    /// persistence tasks. Must be called inside a tokio runtime.
    pub fn start(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let clock = Clock::new();

        let fuel = Arc::new(FuelIntegrator::new(config.fuel_config())?);
        let fuel_store = Arc::new(FuelStore::new(config.fuel_path()));
        match fuel_store.load() {
            Ok(Some(record)) => fuel.restore(&record),
            Ok(None) => info!("No saved fuel state, starting with a full tank"),
            Err(e) => warn!("Saved fuel state unusable ({}), starting with a full tank", e),
        }

        let odometer = Arc::new(Odometer::new(config.odometer_config()));
        let distance_store = Arc::new(DistanceStore::new(config.distance_path()));
        match distance_store.load() {
            Ok(Some(record)) => odometer.restore(&record, tasks::today()),
            Ok(None) => info!("No saved distance state, odometer starts at zero"),
            Err(e) => warn!("Saved distance state unusable ({}), odometer starts at zero", e),
        }

        let course = CourseRegistry::with_store(config.course_config(), CourseStore::new(config.course_path()));
        let session =
            RaceSession::new(course, LapTimer::new(config.timer_config())).with_odometer(odometer.clone());

        let publisher = SnapshotPublisher::default();
        let reading = fuel.reading();
        let distance = odometer.reading();
        publisher.update(|s| {
            s.apply_fuel(&reading, 0.0);
            s.apply_distance(&distance);
        });

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE);
        let (session_tx, session_rx) = mpsc::channel(SESSION_QUEUE);

        let mut sinks = SinkSet::new();
        sinks.register(Box::new(LogSink::default()));

        let mut handles = vec![
            tokio::spawn(tasks::run_bus(
                frame_rx,
                PacketAssembler::new(config.bus.can_id),
                fuel.clone(),
                config.injector_model(),
                publisher.clone(),
            )),
            tokio::spawn(tasks::run_session(session_rx, session, publisher.clone(), clock)),
            tokio::spawn(tasks::run_tick(
                publisher.clone(),
                fuel.clone(),
                sinks,
                config.tick_interval(),
                clock,
            )),
            tokio::spawn(tasks::run_persistence(
                fuel.clone(),
                fuel_store.clone(),
                odometer.clone(),
                distance_store.clone(),
                config.save_interval(),
            )),
        ];

        if config.bus.simulate {
            info!("Bus simulation enabled on id {:#X}", config.bus.can_id);
            handles.push(tokio::spawn(tasks::run_simulator(
                frame_tx.clone(),
                SimulatedBus::new(config.bus.can_id),
                SIM_PERIOD,
                clock,
            )));
        }

        let state = Arc::new(AppState {
            publisher,
            fuel,
            fuel_store,
            odometer,
            distance_store,
            session_tx,
            clock,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        });

        Ok(Self {
            state,
            frame_tx,
            handles,
        })
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Stop every task and save fuel and distance state one last time
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        let state = &self.state;
        tasks::save_fuel(&state.fuel, &state.fuel_store).await;
        tasks::save_distance(&state.odometer, &state.distance_store, tasks::today()).await;
        info!("Dashboard stopped");
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::snapshot::health))
        .route("/api/v1/snapshot", get(routes::snapshot::get_snapshot))
        .route("/api/v1/gps", post(routes::gps::post_fix))
        .route("/api/v1/commands/start-line", post(routes::commands::set_start_line))
        .route("/api/v1/commands/sector/:index", post(routes::commands::set_sector))
        .route("/api/v1/commands/calibrate", post(routes::commands::calibrate))
        .route("/api/v1/commands/reset-session", post(routes::commands::reset_session))
        .route("/api/v1/commands/reset-fuel", post(routes::commands::reset_fuel))
        .route("/api/v1/commands/tire", post(routes::commands::select_tire))
        .route("/api/v1/tires", get(routes::snapshot::get_tires))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &DashboardConfig) {
    let level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    let result = if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Run the dashboard until ctrl-c
pub async fn run(config: DashboardConfig) -> Result<(), DashboardError> {
    let dashboard = Dashboard::start(&config)?;
    let app = dashboard.router();

    info!("Starting dash server on {}", config.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    dashboard.shutdown().await;
    Ok(())
}
