mod common;

use chrono::NaiveDate;
use common::{engine_at, engine_with, jst, line_schedule, run_for};
use tokyo_motion::{
    config::RailwayRename,
    prelude::*,
    realtime::{LiveFlight, LiveTrain, RunwayConfig, TrainInformation},
    vehicle::Stage,
};

fn delayed_snapshot() -> TrainSnapshot {
    TrainSnapshot {
        trains: vec![LiveTrain {
            id: "Test.Line.1".into(),
            delay: Some(60_000.0),
            car_composition: Some(6),
            train_type: Some("Rapid".into()),
            ..Default::default()
        }],
        information: Vec::new(),
    }
}

#[test]
fn reconciling_the_same_snapshot_is_silent() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    engine.drain_events();

    engine.apply_train_snapshot(&delayed_snapshot());
    let events = engine.drain_events();
    assert_eq!(events.len(), 3);
    assert!(events.contains(&Event::DelayChanged {
        id: "Test.Line.1".into(),
        delay: Duration::from_minutes(1.0),
    }));
    assert!(events.contains(&Event::CompositionChanged {
        id: "Test.Line.1".into(),
        cars: 6,
    }));

    engine.apply_train_snapshot(&delayed_snapshot());
    assert!(engine.drain_events().is_empty());
    assert_eq!(engine.index().delay_of("Test.Line.1"), Duration::from_minutes(1.0));
    assert!(engine.vehicle("Test.Line.1").is_some());
}

#[test]
fn unknown_train_type_is_ignored() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    let mut snapshot = delayed_snapshot();
    snapshot.trains[0].train_type = Some("Bullet".into());
    engine.apply_train_snapshot(&snapshot);

    let status = engine.index().status("Test.Line.1").unwrap();
    assert!(status.train_type.is_none());
}

#[test]
fn disrupted_railway_only_runs_live_trains() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    engine.drain_events();

    engine.apply_train_snapshot(&TrainSnapshot {
        trains: Vec::new(),
        information: vec![TrainInformation {
            railway: "Test.Line".into(),
            status: Some("Suspended".into()),
            text: None,
        }],
    });

    assert!(engine.index().is_dynamic("Test.Line"));
    assert!(engine.vehicle("Test.Line.1").is_none());
    assert!(engine.drain_events().contains(&Event::Terminated {
        id: "Test.Line.1".into(),
        reason: TerminateReason::Restart,
    }));
}

#[test]
fn unmatched_live_train_follows_its_hints() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 12, 0, 0));
    let live = TrainSnapshot {
        trains: vec![LiveTrain {
            id: "Test.Line.900".into(),
            from_station: Some("Test.Line.A".into()),
            to_station: Some("Test.Line.B".into()),
            ..Default::default()
        }],
        information: Vec::new(),
    };
    engine.apply_train_snapshot(&live);

    let train = engine.vehicle("Test.Line.900").and_then(Vehicle::as_train).unwrap();
    assert!(train.is_realtime_only());
    assert_eq!(train.phase(), Phase::Running);
    assert_eq!(train.arrival_station().map(|s| &**s), Some("Test.Line.B"));

    engine.apply_train_snapshot(&TrainSnapshot::default());
    assert!(engine.vehicle("Test.Line.900").is_none());
    assert!(engine.index().timetable("Test.Line.900").is_none());
}

fn departure(id: &str, time: &str) -> LiveFlight {
    LiveFlight {
        id: id.into(),
        departure_airport: Some("HND".into()),
        arrival_airport: Some("CTS".into()),
        scheduled_departure_time: Some(time.into()),
        ..Default::default()
    }
}

fn flights(departure_runway: &str, flights: Vec<LiveFlight>) -> FlightSnapshot {
    FlightSnapshot {
        runways: RunwayConfig {
            landing: vec!["34L".into()],
            departure: vec![departure_runway.into()],
        },
        flights,
    }
}

#[test]
fn runway_departures_are_spaced() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    engine.apply_flight_snapshot(&flights(
        "34R",
        vec![departure("JL501", "10:00"), departure("NH61", "10:01")],
    ));

    let first = engine.index().flight("JL501").unwrap().base;
    let second = engine.index().flight("NH61").unwrap().base;
    assert_eq!(first.as_millis(), jst(2026, 10, 16, 10, 0, 0));
    assert_eq!(second - first, engine.config().flight.min_interval());

    let boarding = engine.vehicle("NH61").and_then(Vehicle::as_flight).unwrap();
    assert_eq!(boarding.stage(), Stage::Boarding);
}

#[test]
fn runway_pattern_change_restarts_flights() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    engine.apply_flight_snapshot(&flights("34R", vec![departure("NH61", "10:01")]));
    assert!(engine.vehicle("NH61").is_some());
    engine.drain_events();

    engine.apply_flight_snapshot(&flights("05", vec![departure("NH61", "10:01")]));
    let events = engine.drain_events();
    assert!(events.iter().any(|event| matches!(event, Event::RunwayPatternChanged { .. })));
    assert!(events.contains(&Event::Terminated {
        id: "NH61".into(),
        reason: TerminateReason::PatternChanged,
    }));
    // No departure route serves runway 05.
    assert!(engine.vehicle("NH61").is_none());
}

#[test]
fn cancelled_flights_are_not_placed() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    let mut cancelled = departure("NH61", "10:01");
    cancelled.status = Some("Cancelled".into());
    engine.apply_flight_snapshot(&flights("34R", vec![cancelled]));

    assert!(engine.index().flight("NH61").is_none());
    assert!(engine.vehicle("NH61").is_none());
}

fn live(id: &str) -> LiveTrain {
    LiveTrain {
        id: id.into(),
        ..Default::default()
    }
}

fn snapshot_of(trains: Vec<LiveTrain>) -> TrainSnapshot {
    TrainSnapshot {
        trains,
        information: Vec::new(),
    }
}

#[test]
fn live_destination_cuts_the_chain() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 14, 0, 30));
    engine.drain_events();

    let mut train = live("Test.Line.3");
    train.destination = vec!["Test.Line.B".into()];
    engine.apply_train_snapshot(&snapshot_of(vec![train]));

    let timetable = engine.index().timetable("Test.Line.3").unwrap();
    assert_eq!(timetable.stops.len(), 2);
    assert!(timetable.next.is_none());
    assert_eq!(timetable.destination.len(), 1);
    assert_eq!(&*timetable.destination[0], "Test.Line.B");
    assert_eq!(timetable.end.as_millis(), jst(2026, 10, 16, 14, 1, 0));

    let events = engine.drain_events();
    assert!(events.contains(&Event::Terminated {
        id: "Test.Line.3".into(),
        reason: TerminateReason::Restart,
    }));
    assert!(events.contains(&Event::Created { id: "Test.Line.3".into() }));
    let restarted = engine.vehicle("Test.Line.3").and_then(Vehicle::as_train).unwrap();
    assert!(restarted.next().is_none());
    assert_eq!(restarted.arrival_station().map(|s| &**s), Some("Test.Line.B"));
}

#[test]
fn live_origin_drops_the_previous_link() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 15, 0, 30));
    assert!(engine.vehicle("Test.Line.4").is_some());

    let mut train = live("Test.Line.4");
    train.origin = vec!["Test.Line.B".into()];
    engine.apply_train_snapshot(&snapshot_of(vec![train]));

    let timetable = engine.index().timetable("Test.Line.4").unwrap();
    assert!(timetable.previous.is_none());
    assert_eq!(&*timetable.stops[0].station, "Test.Line.B");
    assert_eq!(timetable.start.as_millis(), jst(2026, 10, 16, 15, 1, 0));
    // Not due to stand at B yet.
    assert!(engine.vehicle("Test.Line.4").is_none());
}

#[test]
fn live_boundary_without_a_section_keeps_the_timetable() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 14, 0, 30));
    engine.drain_events();

    let mut train = live("Test.Line.3");
    train.origin = vec!["Test.Line.B".into()];
    train.destination = vec!["Test.Line.B".into()];
    engine.apply_train_snapshot(&snapshot_of(vec![train]));

    let timetable = engine.index().timetable("Test.Line.3").unwrap();
    assert_eq!(timetable.stops.len(), 3);
    assert_eq!(timetable.next.as_deref(), Some("Test.Line.4"));
    assert!(engine.drain_events().is_empty());
    assert!(engine.vehicle("Test.Line.3").is_some());
}

#[test]
fn renamed_railway_matches_its_timetables() {
    let mut config = Config::default();
    config.realtime.fallback_rename = Some(RailwayRename {
        from: "Test.Old".into(),
        to: "Test.Line".into(),
    });
    let (mut engine, _) = engine_with(line_schedule(), config, jst(2026, 10, 16, 10, 0, 30));

    let mut train = live("Test.Old.1");
    train.delay = Some(60_000.0);
    engine.apply_train_snapshot(&snapshot_of(vec![train.clone()]));

    assert!(engine.index().is_live("Test.Line.1"));
    assert_eq!(engine.index().delay_of("Test.Line.1"), Duration::from_minutes(1.0));
    assert!(engine.index().timetable("Test.Old.1").is_none());

    // Without the rename the same train has nothing to match or synthesize from.
    let (mut plain, _) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    plain.apply_train_snapshot(&snapshot_of(vec![train]));
    assert!(!plain.index().is_live("Test.Line.1"));
    assert_eq!(plain.index().delay_of("Test.Line.1"), Duration::ZERO);
}

#[test]
fn realtime_timetables_survive_a_service_day_reload() {
    let (mut engine, _) = engine_at(jst(2026, 10, 16, 14, 0, 30));
    let mut truncated = live("Test.Line.3");
    truncated.destination = vec!["Test.Line.B".into()];
    let mut extra = live("Test.Line.900");
    extra.from_station = Some("Test.Line.A".into());
    extra.to_station = Some("Test.Line.B".into());
    engine.apply_train_snapshot(&snapshot_of(vec![truncated, extra]));
    assert!(engine.vehicle("Test.Line.900").is_some());

    engine.set_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());

    assert_eq!(engine.index().service_day(), NaiveDate::from_ymd_opt(2026, 10, 17));
    let timetable = engine.index().timetable("Test.Line.3").unwrap();
    assert_eq!(timetable.stops.len(), 2);
    assert!(timetable.next.is_none());
    assert!(engine.index().timetable("Test.Line.900").is_some_and(|entry| entry.synthetic));
    let train = engine.vehicle("Test.Line.900").and_then(Vehicle::as_train).unwrap();
    assert!(train.is_realtime_only());
    assert!(engine.vehicle("Test.Line.3").is_some());
}

fn arrival(id: &str, time: &str) -> LiveFlight {
    LiveFlight {
        id: id.into(),
        departure_airport: Some("CTS".into()),
        arrival_airport: Some("HND".into()),
        scheduled_arrival_time: Some(time.into()),
        ..Default::default()
    }
}

#[test]
fn arriving_flight_lands_then_parks() {
    let (mut engine, wall) = engine_at(jst(2026, 10, 16, 10, 0, 30));
    engine.apply_flight_snapshot(&flights("34R", vec![arrival("JL502", "10:01")]));

    let entry = engine.index().flight("JL502").unwrap();
    assert_eq!(&*entry.route, "HND.34L.Arrival");
    assert_eq!(entry.base.as_millis(), jst(2026, 10, 16, 10, 1, 0));

    let flight = engine.vehicle("JL502").and_then(Vehicle::as_flight).unwrap();
    assert_eq!(flight.stage(), Stage::Landing);
    assert_eq!(flight.phase(), Phase::Running);
    let altitude = flight.current_pose().cars[0].altitude;
    assert!(altitude > 0.0 && altitude < 900.0);
    engine.drain_events();

    // 10:01:10, on the ground
    run_for(&mut engine, &wall, 40);
    let flight = engine.vehicle("JL502").and_then(Vehicle::as_flight).unwrap();
    assert_eq!(flight.stage(), Stage::Parked);
    assert_eq!(flight.phase(), Phase::Standing);
    assert!(engine.drain_events().contains(&Event::SectionChanged {
        id: "JL502".into(),
        section: 1,
    }));

    // 10:02:10, past the standing time
    run_for(&mut engine, &wall, 60);
    assert!(engine.vehicle("JL502").is_none());
    assert!(engine.drain_events().contains(&Event::Terminated {
        id: "JL502".into(),
        reason: TerminateReason::Finished,
    }));
}
