#![allow(dead_code)]

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use tokyo_motion::{
    prelude::*,
    schedule::{
        ScheduleFlightRoute, ScheduleRailway, ScheduleStation, ScheduleStop, ScheduleTimetable,
        ScheduleTrainType,
    },
};

pub const LINE: &str = "Test.Line";

/// Epoch milliseconds of a Tokyo local time.
pub fn jst(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> f64 {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .unwrap()
        .timestamp_millis() as f64
}

fn station(name: &str, latitude: f64) -> ScheduleStation {
    ScheduleStation {
        id: format!("{LINE}.{name}"),
        railway: LINE.into(),
        name: Some(name.into()),
        coordinate: Some(vec![139.70, latitude]),
    }
}

fn stop(name: &str, arrival: Option<&str>, departure: Option<&str>) -> ScheduleStop {
    ScheduleStop {
        station: format!("{LINE}.{name}"),
        arrival: arrival.map(Into::into),
        departure: departure.map(Into::into),
    }
}

/// Three stations about 1.1 km apart running north, and two chained legs:
/// `1` runs A 10:00 to B 10:01, `2` runs B 10:02 to C 10:03.
///
/// `3` runs the whole line north from 14:00 and turns into `4`, which runs it
/// back south from 15:00.
pub fn line_schedule() -> Schedule {
    Schedule {
        railways: vec![ScheduleRailway {
            id: LINE.into(),
            name: Some("Test Line".into()),
            ascending: "Northbound".into(),
            descending: "Southbound".into(),
            stations: ["A", "B", "C"].iter().map(|s| format!("{LINE}.{s}")).collect(),
            coordinates: vec![vec![139.70, 35.60], vec![139.70, 35.61], vec![139.70, 35.62]],
            car_composition: Some(4),
            ..Default::default()
        }],
        stations: vec![station("A", 35.60), station("B", 35.61), station("C", 35.62)],
        train_types: vec![ScheduleTrainType {
            id: "Rapid".into(),
            name: Some("Rapid".into()),
        }],
        timetables: vec![
            ScheduleTimetable {
                id: format!("{LINE}.1"),
                railway: LINE.into(),
                direction: "Northbound".into(),
                next: Some(format!("{LINE}.2")),
                stops: vec![stop("A", None, Some("10:00")), stop("B", Some("10:01"), None)],
                ..Default::default()
            },
            ScheduleTimetable {
                id: format!("{LINE}.2"),
                railway: LINE.into(),
                direction: "Northbound".into(),
                previous: Some(format!("{LINE}.1")),
                stops: vec![stop("B", None, Some("10:02")), stop("C", Some("10:03"), None)],
                ..Default::default()
            },
            ScheduleTimetable {
                id: format!("{LINE}.3"),
                railway: LINE.into(),
                direction: "Northbound".into(),
                next: Some(format!("{LINE}.4")),
                destination: vec![format!("{LINE}.C")],
                stops: vec![
                    stop("A", None, Some("14:00")),
                    stop("B", Some("14:01"), Some("14:02")),
                    stop("C", Some("14:03"), None),
                ],
                ..Default::default()
            },
            ScheduleTimetable {
                id: format!("{LINE}.4"),
                railway: LINE.into(),
                direction: "Southbound".into(),
                previous: Some(format!("{LINE}.3")),
                origin: vec![format!("{LINE}.C")],
                stops: vec![
                    stop("C", None, Some("15:00")),
                    stop("B", Some("15:01"), Some("15:02")),
                    stop("A", Some("15:03"), None),
                ],
                ..Default::default()
            },
        ],
        flight_routes: vec![
            ScheduleFlightRoute {
                id: "HND.34R.Departure".into(),
                kind: "departure".into(),
                runway: "34R".into(),
                airports: Vec::new(),
                coordinates: vec![vec![139.78, 35.54, 0.0], vec![139.78, 35.58, 600.0]],
            },
            ScheduleFlightRoute {
                id: "HND.34L.Arrival".into(),
                kind: "arrival".into(),
                runway: "34L".into(),
                airports: Vec::new(),
                coordinates: vec![vec![139.80, 35.50, 900.0], vec![139.77, 35.54, 0.0]],
            },
        ],
        holidays: Vec::new(),
    }
}

/// A loop line listing its first station again at the end: A, B, C, A.
/// `Outer.1` runs C 10:00 back to A 10:05.
pub fn loop_schedule() -> Schedule {
    let points = [("A", 35.60, 139.70), ("B", 35.61, 139.70), ("C", 35.61, 139.71)];
    let loop_stop = |name: &str, arrival: Option<&str>, departure: Option<&str>| ScheduleStop {
        station: format!("Test.Loop.{name}"),
        arrival: arrival.map(Into::into),
        departure: departure.map(Into::into),
    };
    Schedule {
        railways: vec![ScheduleRailway {
            id: "Test.Loop".into(),
            ascending: "Outer".into(),
            descending: "Inner".into(),
            stations: ["A", "B", "C", "A"].iter().map(|s| format!("Test.Loop.{s}")).collect(),
            coordinates: [0, 1, 2, 0].iter().map(|&i| vec![points[i].2, points[i].1]).collect(),
            car_composition: Some(2),
            ..Default::default()
        }],
        stations: points
            .iter()
            .map(|(name, latitude, longitude)| ScheduleStation {
                id: format!("Test.Loop.{name}"),
                railway: "Test.Loop".into(),
                name: Some((*name).into()),
                coordinate: Some(vec![*longitude, *latitude]),
            })
            .collect(),
        timetables: vec![ScheduleTimetable {
            id: "Test.Loop.Outer.1".into(),
            railway: "Test.Loop".into(),
            direction: "Outer".into(),
            stops: vec![loop_stop("C", None, Some("10:00")), loop_stop("A", Some("10:05"), None)],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Engine over [`line_schedule`] with a hand driven wall clock starting at `epoch`.
pub fn engine_at(epoch: f64) -> (Engine, ManualWallClock) {
    engine_with(line_schedule(), Config::default(), epoch)
}

pub fn engine_with(schedule: Schedule, config: Config, epoch: f64) -> (Engine, ManualWallClock) {
    let wall = ManualWallClock::at_epoch(epoch);
    let engine = Engine::new(schedule, config, Arc::new(wall.clone())).unwrap();
    (engine, wall)
}

/// Advances wall time in one second frames.
pub fn run_for(engine: &mut Engine, wall: &ManualWallClock, seconds: u32) {
    for _ in 0..seconds {
        wall.advance(1_000.0);
        engine.tick();
    }
}
