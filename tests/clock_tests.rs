mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::jst;
use tokyo_motion::{config::ClockConfig, prelude::*};

fn clock_at(epoch: f64) -> (Clock, ManualWallClock) {
    let wall = ManualWallClock::at_epoch(epoch);
    (Clock::new(Arc::new(wall.clone()), &ClockConfig::default()), wall)
}

#[test]
fn speed_changes_never_jump() {
    let (mut clock, wall) = clock_at(jst(2026, 10, 16, 8, 0, 0));
    for speed in [1.0, 60.0, 0.5, 0.0, 3600.0, 1.0] {
        wall.advance(1_234.0);
        let time = clock.time();
        let high_res = clock.high_res_time();
        clock.set_speed(speed);
        assert_eq!(clock.time(), time);
        assert_eq!(clock.high_res_time(), high_res);
        assert_eq!(clock.speed(), speed);
    }
}

#[test]
fn time_advances_by_speed() {
    let (mut clock, wall) = clock_at(jst(2026, 10, 16, 8, 0, 0));
    clock.set_speed(60.0);
    let before = clock.time();
    wall.advance(1_000.0);
    assert_eq!(clock.time() - before, Duration::from_minutes(1.0));
}

#[test]
fn date_change_keeps_time_of_day() {
    let (mut clock, _) = clock_at(jst(2026, 10, 16, 8, 30, 0));
    clock.set_date(NaiveDate::from_ymd_opt(2026, 12, 24).unwrap());
    assert_eq!(clock.time().as_millis(), jst(2026, 12, 24, 8, 30, 0));
    assert_eq!(clock.time_string(), "2026-12-24 08:30:00");
    assert!(!clock.is_realtime());
}

#[test]
fn reset_returns_to_real_time() {
    let (mut clock, wall) = clock_at(jst(2026, 10, 16, 8, 0, 0));
    clock.set_speed(600.0);
    wall.advance(10_000.0);
    clock.reset();

    assert!(clock.is_realtime());
    assert_eq!(clock.speed(), 1.0);
    assert_eq!(clock.time().as_millis(), jst(2026, 10, 16, 8, 0, 10));
}

#[test]
fn service_day_turns_at_the_boundary() {
    let (clock, _) = clock_at(jst(2026, 10, 17, 2, 59, 0));
    assert_eq!(clock.service_day(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());

    let (clock, _) = clock_at(jst(2026, 10, 17, 3, 0, 0));
    assert_eq!(clock.service_day(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
}

#[test]
fn malformed_labels_do_not_resolve() {
    let (clock, _) = clock_at(jst(2026, 10, 16, 8, 0, 0));
    assert!(clock.time_at("8h30").is_none());
    assert!(clock.time_at("").is_none());
    assert_eq!(
        clock.time_at("25:10").map(|time| time.as_millis()),
        Some(jst(2026, 10, 17, 1, 10, 0))
    );
}
