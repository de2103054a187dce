mod common;

use approx::assert_abs_diff_eq;
use common::{engine_at, engine_with, jst, loop_schedule, run_for};
use tokyo_motion::{
    prelude::*,
    shared::{Bounds, Coordinate},
};

const FIRST: &str = "Test.Line.1";
const SECOND: &str = "Test.Line.2";

fn progress(engine: &Engine, id: &str) -> f64 {
    engine.vehicle(id).and_then(Vehicle::as_train).unwrap().progress()
}

#[test]
fn train_is_half_way_at_half_time() {
    let (engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    let train = engine.vehicle(FIRST).and_then(Vehicle::as_train).unwrap();

    assert_eq!(train.phase(), Phase::Running);
    assert_abs_diff_eq!(train.progress(), 0.5, epsilon = 1e-3);
    assert_eq!(train.arrival_station().map(|s| &**s), Some("Test.Line.B"));
    assert_eq!(train.departure_station().map(|s| &**s), Some("Test.Line.A"));

    let cars = &train.current_pose().cars;
    assert_eq!(cars.len(), 4);
    assert!(cars.iter().all(|car| car.coordinate.latitude > 35.60 && car.coordinate.latitude < 35.61));
    assert!(engine.vehicle(SECOND).is_none());
}

#[test]
fn nothing_runs_outside_the_timetable() {
    let (engine, _) = engine_at(jst(2026, 10, 16, 9, 0, 0));
    assert_eq!(engine.index().vehicle_count(), 0);

    let (engine, _) = engine_at(jst(2026, 10, 16, 11, 0, 0));
    assert_eq!(engine.index().vehicle_count(), 0);
}

#[test]
fn train_waits_at_origin_before_departure() {
    let (engine, _) = engine_at(jst(2026, 10, 16, 9, 59, 30));
    let train = engine.vehicle(FIRST).unwrap();
    assert_eq!(train.phase(), Phase::Standing);
    assert_eq!(train.current_pose().cars.len(), 4);
}

#[test]
fn handoff_keeps_the_tracked_reference() {
    let (mut engine, wall) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    assert!(engine.track(FIRST));
    engine.drain_events();

    for _ in 0..40 {
        wall.advance(1_000.0);
        engine.tick();
        assert!(engine.tracked().is_some());
    }

    assert_eq!(engine.tracked().map(|id| &**id), Some(SECOND));
    assert!(engine.vehicle(FIRST).is_none());
    assert_eq!(engine.vehicle(SECOND).map(StateMachine::phase), Some(Phase::Standing));

    let events = engine.drain_events();
    assert!(events.contains(&Event::Created { id: SECOND.into() }));
    assert!(events.contains(&Event::Terminated {
        id: FIRST.into(),
        reason: TerminateReason::Finished,
    }));
    assert!(events.iter().any(|event| matches!(event, Event::TrackedPose { id, .. } if &**id == SECOND)));
}

#[test]
fn chain_runs_to_its_terminal() {
    let (mut engine, wall) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    assert!(engine.track(FIRST));

    // 10:02:10, second leg between B and C
    run_for(&mut engine, &wall, 100);
    assert_eq!(engine.vehicle(SECOND).map(StateMachine::phase), Some(Phase::Running));

    // 10:04:30, past the terminal standing time
    run_for(&mut engine, &wall, 140);
    assert_eq!(engine.index().vehicle_count(), 0);
    assert!(engine.tracked().is_none());
}

#[test]
fn jumping_in_time_restarts_vehicles() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 9, 0, 0));
    engine.set_time(Timestamp::from_millis(jst(2026, 10, 16, 10, 0, 30)));

    assert_abs_diff_eq!(progress(&engine, FIRST), 0.5, epsilon = 1e-3);
    assert!(!engine.clock().is_realtime());
}

#[test]
fn stale_frames_restart_everything() {
    let (mut engine, wall) = engine_at(jst(2026, 10, 16, 10, 0, 10));
    engine.tick();
    engine.drain_events();

    wall.advance(20_000.0);
    engine.tick();

    let events = engine.drain_events();
    assert!(events.contains(&Event::Terminated {
        id: FIRST.into(),
        reason: TerminateReason::Stale,
    }));
    assert!(events.contains(&Event::Created { id: FIRST.into() }));
    assert!(engine.vehicle(FIRST).is_some());
}

#[test]
fn offscreen_vehicles_update_less_often() {
    let (mut engine, wall) = engine_at(jst(2026, 10, 16, 10, 0, 10));
    engine.set_viewport(Some(Bounds::new(
        Coordinate::new(0.0, 0.0),
        Coordinate::new(1.0, 1.0),
    )));

    wall.advance(100.0);
    engine.tick();
    let before = progress(&engine, FIRST);

    wall.advance(100.0);
    engine.tick();
    assert_eq!(progress(&engine, FIRST), before);

    engine.set_viewport(None);
    wall.advance(100.0);
    engine.tick();
    wall.advance(100.0);
    engine.tick();
    assert!(progress(&engine, FIRST) > before);
}

#[test]
fn tracking_unknown_vehicle_fails() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    assert!(!engine.track("Test.Line.404"));
    assert!(engine.mark(FIRST));
    assert_eq!(engine.marked().map(|id| &**id), Some(FIRST));
}

#[test]
fn southbound_train_runs_with_reversed_cars() {
    let (engine, _) = engine_at(jst(2026, 10, 16, 15, 0, 30));
    let train = engine.vehicle("Test.Line.4").and_then(Vehicle::as_train).unwrap();

    assert_eq!(train.phase(), Phase::Running);
    assert_eq!(train.arrival_station().map(|s| &**s), Some("Test.Line.B"));
    assert_eq!(train.section().index, 2);
    assert_eq!(train.section().target(), 1);

    let cars = &train.current_pose().cars;
    assert_eq!(cars.len(), 4);
    // Same car order as a northbound train: rearmost first.
    assert!(cars[0].coordinate.latitude > cars[3].coordinate.latitude);
    assert!(cars.iter().all(|car| car.bearing.abs() > 179.0));
    assert!(cars.iter().all(|car| car.coordinate.latitude > 35.61 && car.coordinate.latitude < 35.62));
}

#[test]
fn northbound_train_faces_north() {
    let (engine, _) = engine_at(jst(2026, 10, 16, 14, 0, 30));
    let train = engine.vehicle("Test.Line.3").and_then(Vehicle::as_train).unwrap();

    let cars = &train.current_pose().cars;
    assert!(cars[0].coordinate.latitude < cars[3].coordinate.latitude);
    assert!(cars.iter().all(|car| car.bearing.abs() < 1.0));
}

#[test]
fn loop_line_train_runs_into_the_closing_station() {
    let (engine, _) = engine_with(loop_schedule(), Config::default(), jst(2026, 10, 16, 10, 2, 0));
    let train = engine.vehicle("Test.Loop.Outer.1").and_then(Vehicle::as_train).unwrap();

    assert_eq!(train.phase(), Phase::Running);
    assert_eq!(train.section().index, 2);
    assert_eq!(train.section().target(), 3);
    assert_eq!(train.arrival_station().map(|s| &**s), Some("Test.Loop.A"));
    assert!(train.progress() > 0.0 && train.progress() < 1.0);

    let stops: Vec<usize> = train.timetable().stops.iter().map(|stop| stop.station_index).collect();
    assert_eq!(stops, [2, 3]);
}
