//! Gate-crossing lap timer
//!
//! Each valid fix forms a movement segment with the previous one. Only the
//! gate at `target_index` is tested, plus the start/finish gate when the car
//! is expected somewhere else, so a missed sector gate still closes the lap.
//! Crossing time is interpolated between the two fix timestamps.

use crate::fix::GpsFix;
use course_registry::{CourseRegistry, GeoPoint, START_FINISH};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::mem;
use tracing::{debug, info};

/// Lap timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Crossings are ignored for this long after the previous one (ms)
    pub crossing_cooldown_ms: u64,
    /// Minimum GGA quality for a fix to be used
    pub min_quality: u8,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            crossing_cooldown_ms: 1000,
            min_quality: 1,
        }
    }
}

/// Coarse timing state shown to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No start/finish line defined
    Idle,
    /// Start line defined, waiting for the first crossing
    Armed,
    /// A lap is being timed
    Running,
}

/// Result of a gate crossing
#[derive(Debug, Clone, PartialEq)]
pub enum LapEvent {
    /// First start/finish crossing; timing begins
    Started { at: f64 },
    /// Sector gate crossed
    Sector {
        index: u32,
        time: f64,
        /// Against the same sector of the previous lap; 0 without one
        diff: f64,
    },
    /// Start/finish crossed while running
    LapCompleted {
        /// Number of the lap just finished (1-based)
        lap: u32,
        lap_time: f64,
        /// Against the previous lap; 0 on the first lap
        diff: f64,
        /// Time from the last gate to the finish line
        final_sector: f64,
        /// Sector gates were skipped on the way round
        sectors_missed: bool,
    },
}

/// Lap/sector timer state. Times are seconds derived from the caller's
/// millisecond clock.
#[derive(Debug, Clone)]
pub struct LapTimer {
    config: TimerConfig,
    running: bool,
    target_index: u32,
    lap_count: u32,
    lap_start: f64,
    last_gate_time: Option<f64>,
    current_sectors: BTreeMap<u32, f64>,
    previous_sectors: BTreeMap<u32, f64>,
    sector_diffs: BTreeMap<u32, f64>,
    previous_lap_total: Option<f64>,
    lap_time_diff: f64,
    prev_fix: Option<(GeoPoint, f64)>,
}

impl LapTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            running: false,
            target_index: START_FINISH,
            lap_count: 0,
            lap_start: 0.0,
            last_gate_time: None,
            current_sectors: BTreeMap::new(),
            previous_sectors: BTreeMap::new(),
            sector_diffs: BTreeMap::new(),
            previous_lap_total: None,
            lap_time_diff: 0.0,
            prev_fix: None,
        }
    }

    /// Process one fix received at `now_ms`. Invalid fixes are dropped
    /// without touching any state.
    pub fn update(&mut self, course: &CourseRegistry, fix: &GpsFix, now_ms: u64) -> Option<LapEvent> {
        if !fix.is_valid(self.config.min_quality) {
            return None;
        }

        let now = now_ms as f64 / 1000.0;
        let position = fix.position();
        let (from, from_t) = self.prev_fix.replace((position, now))?;

        if let Some(last) = self.last_gate_time {
            if (now - last) * 1000.0 < self.config.crossing_cooldown_ms as f64 {
                return None;
            }
        }

        let (index, fraction) = self.find_crossing(course, from, position)?;
        let at = from_t + fraction * (now - from_t);
        Some(self.on_crossing(course, index, at))
    }

    fn find_crossing(&self, course: &CourseRegistry, from: GeoPoint, to: GeoPoint) -> Option<(u32, f64)> {
        let target = course
            .get_gate(self.target_index)
            .and_then(|gate| gate.crossed_by(from, to))
            .map(|fraction| (self.target_index, fraction));
        if target.is_some() || self.target_index == START_FINISH {
            return target;
        }

        // Expected gate missed (or removed): the finish line still closes the lap
        course
            .get_gate(START_FINISH)
            .and_then(|gate| gate.crossed_by(from, to))
            .map(|fraction| (START_FINISH, fraction))
    }

    fn on_crossing(&mut self, course: &CourseRegistry, index: u32, at: f64) -> LapEvent {
        let event = if index != START_FINISH {
            self.complete_sector(index, at)
        } else if self.running {
            self.complete_lap(at)
        } else {
            self.running = true;
            self.lap_count = 1;
            self.lap_start = at;
            self.current_sectors.clear();
            info!("Timing started at {:.3}s", at);
            LapEvent::Started { at }
        };

        self.last_gate_time = Some(at);
        self.target_index = course.next_index(index);
        debug!("Next gate: {}", self.target_index);
        event
    }

    fn complete_sector(&mut self, index: u32, at: f64) -> LapEvent {
        let time = at - self.last_gate_time.unwrap_or(self.lap_start);
        let diff = self.record_sector(index, time);
        info!("Sector {} time {:.3}s ({:+.3}s)", index, time, diff);
        LapEvent::Sector { index, time, diff }
    }

    fn complete_lap(&mut self, at: f64) -> LapEvent {
        let sectors_missed = self.target_index != START_FINISH;
        let final_sector = at - self.last_gate_time.unwrap_or(self.lap_start);
        self.record_sector(START_FINISH, final_sector);

        let lap_time = at - self.lap_start;
        self.lap_time_diff = self.previous_lap_total.map_or(0.0, |prev| lap_time - prev);
        let lap = self.lap_count;
        info!(
            "Lap {} completed: {:.3}s ({:+.3}s){}",
            lap,
            lap_time,
            self.lap_time_diff,
            if sectors_missed { ", sectors missed" } else { "" }
        );

        self.previous_sectors = mem::take(&mut self.current_sectors);
        self.previous_lap_total = Some(lap_time);
        self.lap_count += 1;
        self.lap_start = at;

        LapEvent::LapCompleted {
            lap,
            lap_time,
            diff: self.lap_time_diff,
            final_sector,
            sectors_missed,
        }
    }

    /// Store a sector time. The diff is only kept when the previous lap has
    /// the same sector; otherwise any older diff for the index is dropped.
    fn record_sector(&mut self, index: u32, time: f64) -> f64 {
        self.current_sectors.insert(index, time);
        match self.previous_sectors.get(&index) {
            Some(prev) => {
                let diff = time - prev;
                self.sector_diffs.insert(index, diff);
                diff
            }
            None => {
                self.sector_diffs.remove(&index);
                0.0
            }
        }
    }

    /// Stop timing and forget lap history. The last fix is kept as the
    /// segment origin for the next update.
    pub fn reset(&mut self) {
        self.running = false;
        self.target_index = START_FINISH;
        self.lap_count = 0;
        self.lap_start = 0.0;
        self.last_gate_time = None;
        self.current_sectors.clear();
        self.previous_sectors.clear();
        self.sector_diffs.clear();
        self.previous_lap_total = None;
        self.lap_time_diff = 0.0;
        info!("Lap timer reset");
    }

    pub fn phase(&self, course: &CourseRegistry) -> TimerPhase {
        if !course.has_start_line() {
            TimerPhase::Idle
        } else if self.running {
            TimerPhase::Running
        } else {
            TimerPhase::Armed
        }
    }

    /// Elapsed time of the lap in progress (seconds); 0 when not running
    pub fn current_lap_time(&self, now_ms: u64) -> f64 {
        if !self.running {
            return 0.0;
        }
        (now_ms as f64 / 1000.0 - self.lap_start).max(0.0)
    }

    /// Sector times for display: the previous lap overlaid with the sectors
    /// already completed on the current lap
    pub fn sector_times(&self) -> BTreeMap<u32, f64> {
        let mut times = self.previous_sectors.clone();
        times.extend(self.current_sectors.iter().map(|(&i, &t)| (i, t)));
        times
    }

    /// Start of the lap in progress (seconds on the caller's clock)
    pub fn lap_started_at(&self) -> Option<f64> {
        self.running.then_some(self.lap_start)
    }

    pub fn sector_diffs(&self) -> &BTreeMap<u32, f64> {
        &self.sector_diffs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 1 once timing starts, incremented per completed lap
    pub fn lap_count(&self) -> u32 {
        self.lap_count
    }

    pub fn target_index(&self) -> u32 {
        self.target_index
    }

    pub fn last_lap_time(&self) -> Option<f64> {
        self.previous_lap_total
    }

    pub fn lap_time_diff(&self) -> f64 {
        self.lap_time_diff
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }
}

impl Default for LapTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
