//! Integration tests for lap and sector timing.
//!
//! Courses are laid out along a north-south road at 139.0E with every gate
//! facing east, so each gate is a short north-south segment on the meridian.
//! The car crosses a gate by moving from 138.9999 to 139.0001 and returns to
//! the west side between gates, where no gate exists.

use course_registry::{CourseConfig, CourseRegistry};
use lap_timer::{FixStatus, GpsFix, LapEvent, LapTimer, RaceSession, TimerPhase};
use storage::CourseStore;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const WEST: f64 = 138.9999;
const EAST: f64 = 139.0001;
const TOLERANCE: f64 = 1e-3;

fn fix(lat: f64, lon: f64) -> GpsFix {
    GpsFix {
        lat,
        lon,
        quality: 1,
        status: FixStatus::Active,
        heading: 90.0,
        sats: 11,
    }
}

/// Build a course by standing on each gate and issuing the operator commands
fn session_with_gates(gate_lats: &[f64]) -> Result<RaceSession, Box<dyn std::error::Error>> {
    let mut session = RaceSession::new(CourseRegistry::default(), LapTimer::default());
    for (i, &lat) in gate_lats.iter().enumerate() {
        session.on_fix(fix(lat, 139.0), i as u64 * 100);
        if i == 0 {
            session.set_start_line()?;
        } else {
            session.set_sector(i as u32)?;
        }
    }
    session.on_fix(fix(gate_lats[gate_lats.len() - 1], EAST), 1000);
    Ok(session)
}

/// Drive round to the gate at `gate_lat` and cross it eastbound at `t_ms`
fn cross(session: &mut RaceSession, gate_lat: f64, t_ms: u64) -> Option<LapEvent> {
    let between = gate_lat - 0.0005;
    assert!(session.on_fix(fix(between, EAST), t_ms - 900).is_none());
    assert!(session.on_fix(fix(between, WEST), t_ms - 800).is_none());
    assert!(session.on_fix(fix(gate_lat, WEST), t_ms - 500).is_none());
    session.on_fix(fix(gate_lat, EAST), t_ms + 500)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < TOLERANCE
}

#[test]
fn test_lap_count_through_three_gates() -> TestResult {
    let gates = [35.0, 35.001, 35.002];
    let mut session = session_with_gates(&gates)?;
    assert_eq!(session.phase(), TimerPhase::Armed);

    let order = [0, 1, 2, 0, 1, 2, 0];
    let mut counts = Vec::new();
    for (n, &gate) in order.iter().enumerate() {
        let t = 10_000 + n as u64 * 10_000;
        assert!(cross(&mut session, gates[gate], t).is_some(), "gate {} not detected", gate);
        counts.push(session.timer().lap_count());
    }

    assert_eq!(counts, vec![1, 1, 1, 2, 2, 2, 3]);
    assert_eq!(session.phase(), TimerPhase::Running);
    Ok(())
}

#[test]
fn test_sector_diffs_appear_from_second_lap() -> TestResult {
    let gates = [35.0, 35.001, 35.002];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    cross(&mut session, gates[1], 20_000);
    cross(&mut session, gates[2], 30_000);
    assert!(session.timer().sector_diffs().is_empty());

    cross(&mut session, gates[0], 40_000);
    cross(&mut session, gates[1], 52_000);
    let diffs = session.timer().sector_diffs();
    assert!(approx(diffs[&1], 2.0));
    assert!(!diffs.contains_key(&2));

    cross(&mut session, gates[2], 61_000);
    assert!(approx(session.timer().sector_diffs()[&2], -1.0));
    Ok(())
}

#[test]
fn test_lap_and_sector_times() -> TestResult {
    let gates = [35.0, 35.001];
    let mut session = session_with_gates(&gates)?;

    match cross(&mut session, gates[0], 10_000) {
        Some(LapEvent::Started { at }) => assert!(approx(at, 10.0)),
        other => panic!("expected start, got {:?}", other),
    }
    match cross(&mut session, gates[1], 25_000) {
        Some(LapEvent::Sector { index, time, diff }) => {
            assert_eq!(index, 1);
            assert!(approx(time, 15.0));
            assert_eq!(diff, 0.0);
        }
        other => panic!("expected sector, got {:?}", other),
    }
    match cross(&mut session, gates[0], 42_000) {
        Some(LapEvent::LapCompleted {
            lap,
            lap_time,
            diff,
            final_sector,
            sectors_missed,
        }) => {
            assert_eq!(lap, 1);
            assert!(approx(lap_time, 32.0));
            assert_eq!(diff, 0.0);
            assert!(approx(final_sector, 17.0));
            assert!(!sectors_missed);
        }
        other => panic!("expected lap, got {:?}", other),
    }

    let timer = session.timer();
    assert!(approx(timer.last_lap_time().unwrap_or_default(), 32.0));
    let sectors = timer.sector_times();
    assert!(approx(sectors[&1], 15.0));
    assert!(approx(sectors[&0], 17.0));
    assert!(approx(timer.current_lap_time(45_000), 3.0));
    Ok(())
}

#[test]
fn test_lap_diff_against_previous_lap() -> TestResult {
    let gates = [35.0, 35.001];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    cross(&mut session, gates[1], 25_000);
    cross(&mut session, gates[0], 42_000);
    cross(&mut session, gates[1], 55_000);

    // Current-lap sector 1 overlays the previous lap's value
    let sectors = session.timer().sector_times();
    assert!(approx(sectors[&1], 13.0));
    assert!(approx(sectors[&0], 17.0));

    match cross(&mut session, gates[0], 70_000) {
        Some(LapEvent::LapCompleted { lap, lap_time, diff, .. }) => {
            assert_eq!(lap, 2);
            assert!(approx(lap_time, 28.0));
            assert!(approx(diff, -4.0));
        }
        other => panic!("expected lap, got {:?}", other),
    }
    let diffs = session.timer().sector_diffs();
    assert!(approx(diffs[&1], -2.0));
    assert!(approx(diffs[&0], -2.0));
    assert!(approx(session.timer().lap_time_diff(), -4.0));
    Ok(())
}

#[test]
fn test_missed_sector_still_closes_lap() -> TestResult {
    let gates = [35.0, 35.001, 35.002];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    cross(&mut session, gates[1], 20_000);
    // Sector 2 never crossed
    match cross(&mut session, gates[0], 40_000) {
        Some(LapEvent::LapCompleted {
            lap,
            lap_time,
            final_sector,
            sectors_missed,
            ..
        }) => {
            assert_eq!(lap, 1);
            assert!(approx(lap_time, 30.0));
            assert!(approx(final_sector, 20.0));
            assert!(sectors_missed);
        }
        other => panic!("expected lap, got {:?}", other),
    }

    assert_eq!(session.timer().lap_count(), 2);
    assert_eq!(session.timer().target_index(), 1);

    // Sequencing resumes normally on the next lap
    assert!(matches!(
        cross(&mut session, gates[1], 50_000),
        Some(LapEvent::Sector { index: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_sector_diff_dropped_after_lap_that_skipped_it() -> TestResult {
    let gates = [35.0, 35.001];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    cross(&mut session, gates[1], 25_000);
    cross(&mut session, gates[0], 42_000);
    cross(&mut session, gates[1], 62_000);
    assert!(approx(session.timer().sector_diffs()[&1], 5.0));
    cross(&mut session, gates[0], 80_000);

    // Lap 3 goes round without sector 1
    assert!(matches!(
        cross(&mut session, gates[0], 100_000),
        Some(LapEvent::LapCompleted { sectors_missed: true, .. })
    ));

    // Lap 4 has no previous sector 1 to compare against
    match cross(&mut session, gates[1], 110_000) {
        Some(LapEvent::Sector { index, time, diff }) => {
            assert_eq!(index, 1);
            assert!(approx(time, 10.0));
            assert_eq!(diff, 0.0);
        }
        other => panic!("expected sector, got {:?}", other),
    }
    let diffs = session.timer().sector_diffs();
    assert!(!diffs.contains_key(&1), "diff from lap 2 still published: {:?}", diffs);
    assert!(approx(diffs[&0], 2.0));
    Ok(())
}

#[test]
fn test_wrong_gate_ignored_while_targeting_another() -> TestResult {
    let gates = [35.0, 35.001, 35.002];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    // Targeting sector 1; crossing sector 2 first is not counted
    assert!(cross(&mut session, gates[2], 20_000).is_none());
    assert_eq!(session.timer().target_index(), 1);
    assert!(session.timer().sector_times().is_empty());
    Ok(())
}

#[test]
fn test_reset_session_keeps_course() -> TestResult {
    let gates = [35.0, 35.001];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    cross(&mut session, gates[1], 25_000);
    cross(&mut session, gates[0], 42_000);
    session.reset_session();

    assert_eq!(session.phase(), TimerPhase::Armed);
    assert_eq!(session.timer().lap_count(), 0);
    assert!(session.timer().sector_times().is_empty());
    assert_eq!(session.course().sector_count(), 1);

    assert!(matches!(
        cross(&mut session, gates[0], 60_000),
        Some(LapEvent::Started { .. })
    ));
    assert_eq!(session.timer().lap_count(), 1);
    Ok(())
}

#[test]
fn test_void_fixes_do_not_time() -> TestResult {
    let gates = [35.0];
    let mut session = session_with_gates(&gates)?;

    let mut west = fix(35.0, WEST);
    let mut east = fix(35.0, EAST);
    for f in [&mut west, &mut east] {
        f.quality = 0;
        f.status = FixStatus::Void;
    }
    assert!(session.on_fix(west, 9_500).is_none());
    assert!(session.on_fix(east, 10_500).is_none());
    assert_eq!(session.phase(), TimerPhase::Armed);
    Ok(())
}

#[test]
fn test_persisted_course_times_after_restart() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("course_data.json");

    {
        let course = CourseRegistry::with_store(CourseConfig::default(), CourseStore::new(&path));
        let mut session = RaceSession::new(course, LapTimer::default());
        session.on_fix(fix(35.0, 139.0), 0);
        session.set_start_line()?;
        session.on_fix(fix(35.001, 139.0), 100);
        session.set_sector(1)?;
    }

    let course = CourseRegistry::with_store(CourseConfig::default(), CourseStore::new(&path));
    let mut session = RaceSession::new(course, LapTimer::default());
    assert_eq!(session.phase(), TimerPhase::Armed);

    session.on_fix(fix(35.0, EAST), 1_000);
    assert!(matches!(cross(&mut session, 35.0, 10_000), Some(LapEvent::Started { .. })));
    assert!(matches!(
        cross(&mut session, 35.001, 20_000),
        Some(LapEvent::Sector { index: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_two_gate_course_closes_lap_without_sector() -> TestResult {
    let gates = [35.0, 35.001];
    let mut session = session_with_gates(&gates)?;

    cross(&mut session, gates[0], 10_000);
    let event = cross(&mut session, gates[0], 30_000);
    assert!(matches!(
        event,
        Some(LapEvent::LapCompleted { lap: 1, sectors_missed: true, .. })
    ));
    assert_eq!(session.timer().lap_count(), 2);
    assert!(!session.timer().sector_times().contains_key(&1));
    Ok(())
}
