//! Virtual time source.
//!
//! The clock maps a monotonic wall clock onto simulated time:
//!
//! ```text
//! time           = base_time           + wall_now * speed
//! high_res_time  = base_high_res_time  + wall_now * speed
//! ```
//!
//! `time` is an absolute instant (epoch milliseconds) used for timetable lookups,
//! `high_res_time` is a free running counter the animation scheduler consumes.
//! Changing the speed rebases both offsets so neither jumps.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

use crate::{
    config::ClockConfig,
    shared::{Duration, Label, Timestamp},
};

/// Source of real time. Injected so playback and tests can control it.
pub trait WallClock: Send + Sync {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now(&self) -> f64;
    /// Milliseconds since the unix epoch.
    fn epoch(&self) -> f64;
}

#[derive(Debug)]
pub struct SystemWallClock {
    origin: Instant,
}

impl Default for SystemWallClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl WallClock for SystemWallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn epoch(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: f64,
    epoch: f64,
}

/// A wall clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualWallClock(Arc<Mutex<ManualState>>);

impl ManualWallClock {
    /// Creates a clock whose epoch reads `epoch` at monotonic zero.
    pub fn at_epoch(epoch: f64) -> Self {
        Self(Arc::new(Mutex::new(ManualState { now: 0.0, epoch })))
    }

    pub fn advance(&self, millis: f64) {
        if let Ok(mut state) = self.0.lock() {
            state.now += millis;
            state.epoch += millis;
        }
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> f64 {
        self.0.lock().map(|state| state.now).unwrap_or_default()
    }

    fn epoch(&self) -> f64 {
        self.0.lock().map(|state| state.epoch).unwrap_or_default()
    }
}

pub struct Clock {
    wall: Arc<dyn WallClock>,
    offset: FixedOffset,
    day_boundary: u32,
    base_time: f64,
    base_high_res_time: f64,
    speed: f64,
    realtime: bool,
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("base_time", &self.base_time)
            .field("base_high_res_time", &self.base_high_res_time)
            .field("speed", &self.speed)
            .field("realtime", &self.realtime)
            .finish()
    }
}

impl Clock {
    pub fn new(wall: Arc<dyn WallClock>, config: &ClockConfig) -> Self {
        let mut clock = Self {
            wall,
            offset: config.offset(),
            day_boundary: config.day_boundary_hour,
            base_time: 0.0,
            base_high_res_time: 0.0,
            speed: 1.0,
            realtime: true,
        };
        clock.base_time = clock.wall.epoch() - clock.wall.now();
        clock
    }

    pub fn system(config: &ClockConfig) -> Self {
        Self::new(Arc::new(SystemWallClock::default()), config)
    }

    /// Back to real time at normal speed. The high resolution counter stays continuous.
    pub fn reset(&mut self) {
        let now = self.wall.now();
        let high_res = self.high_res_time();
        self.speed = 1.0;
        self.base_time = self.wall.epoch() - now;
        self.base_high_res_time = high_res - now;
        self.realtime = true;
    }

    pub fn time(&self) -> Timestamp {
        Timestamp::from_millis(self.base_time + self.wall.now() * self.speed)
    }

    /// Scaled monotonic time used to consume animation durations.
    pub fn high_res_time(&self) -> f64 {
        self.base_high_res_time + self.wall.now() * self.speed
    }

    /// Unscaled monotonic wall time.
    pub fn wall_time(&self) -> f64 {
        self.wall.now()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn day_boundary(&self) -> u32 {
        self.day_boundary
    }

    pub fn set_speed(&mut self, speed: f64) {
        let now = self.wall.now();
        let time = self.base_time + now * self.speed;
        let high_res = self.base_high_res_time + now * self.speed;
        self.speed = speed;
        self.base_time = time - now * speed;
        self.base_high_res_time = high_res - now * speed;
        if speed != 1.0 {
            self.realtime = false;
        }
    }

    /// Moves to `date` keeping the current time of day.
    pub fn set_date(&mut self, date: NaiveDate) {
        let Some(local) = self.time().to_local(self.offset) else {
            return;
        };
        let Some(naive) = date.and_hms_milli_opt(
            local.hour(),
            local.minute(),
            local.second(),
            local.nanosecond() / 1_000_000,
        ) else {
            return;
        };
        let Some(target) = self.offset.from_local_datetime(&naive).single() else {
            return;
        };
        self.set_time(Timestamp::from_local(target));
    }

    /// Jumps to an absolute instant.
    pub fn set_time(&mut self, time: Timestamp) {
        self.base_time = time.as_millis() - self.wall.now() * self.speed;
        self.realtime = false;
    }

    /// Resolves a `hh:mm` timetable label against the current instant, treating the hours
    /// before the day boundary as belonging to the previous service day.
    pub fn time_at(&self, label: &str) -> Option<Timestamp> {
        let label = Label::parse(label)?;
        let local = self.time().to_local(self.offset)?;
        let mut date = local.date_naive();
        if label.hours >= 24 {
            // Service-day notation: count from the start of the service day.
            date = self.service_day();
        } else {
            let current_hour = local.hour();
            if current_hour < self.day_boundary && label.hours >= self.day_boundary {
                date = date.pred_opt()?;
            } else if current_hour >= self.day_boundary && label.hours < self.day_boundary {
                date = date.succ_opt()?;
            }
        }
        let naive = date.and_hms_opt(0, 0, 0)?;
        let midnight = self.offset.from_local_datetime(&naive).single()?;
        Some(Timestamp::from_local(midnight) + label.as_duration())
    }

    pub fn time_string(&self) -> String {
        self.time()
            .to_local(self.offset)
            .map(|local| local.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }

    /// Calendar date of the service day the current instant belongs to.
    pub fn service_day(&self) -> NaiveDate {
        self.service_day_of(self.time())
    }

    pub fn service_day_of(&self, time: Timestamp) -> NaiveDate {
        let shifted = time - Duration::from_hours(self.day_boundary as f64);
        shifted
            .to_local(self.offset)
            .map(|local| local.date_naive())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) fn jst(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> f64 {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .unwrap()
        .timestamp_millis() as f64
}

#[test]
fn realtime_follows_wall_clock() {
    let wall = ManualWallClock::at_epoch(jst(2026, 10, 16, 12, 0, 0));
    let clock = Clock::new(Arc::new(wall.clone()), &ClockConfig::default());
    let before = clock.time();
    wall.advance(1500.0);
    assert_eq!(clock.time() - before, Duration::from_millis(1500.0));
    assert!(clock.is_realtime());
}

#[test]
fn speed_change_is_continuous() {
    let wall = ManualWallClock::at_epoch(jst(2026, 10, 16, 12, 0, 0));
    let mut clock = Clock::new(Arc::new(wall.clone()), &ClockConfig::default());
    wall.advance(10_000.0);
    let before = clock.time();
    let before_high_res = clock.high_res_time();
    clock.set_speed(60.0);
    assert_eq!(clock.time(), before);
    assert_eq!(clock.high_res_time(), before_high_res);
    wall.advance(1000.0);
    assert_eq!(clock.time() - before, Duration::from_millis(60_000.0));
    assert!(!clock.is_realtime());
}

#[test]
fn label_before_boundary_belongs_to_next_day() {
    let wall = ManualWallClock::at_epoch(jst(2026, 10, 16, 23, 0, 0));
    let clock = Clock::new(Arc::new(wall), &ClockConfig::default());
    let resolved = clock.time_at("00:30").unwrap();
    assert_eq!(resolved.as_millis(), jst(2026, 10, 17, 0, 30, 0));
}

#[test]
fn label_after_boundary_belongs_to_previous_day() {
    let wall = ManualWallClock::at_epoch(jst(2026, 10, 17, 1, 0, 0));
    let clock = Clock::new(Arc::new(wall), &ClockConfig::default());
    let resolved = clock.time_at("23:50").unwrap();
    assert_eq!(resolved.as_millis(), jst(2026, 10, 16, 23, 50, 0));
    assert_eq!(clock.service_day(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
}

#[test]
fn malformed_label_is_none() {
    let clock = Clock::new(
        Arc::new(ManualWallClock::at_epoch(0.0)),
        &ClockConfig::default(),
    );
    assert!(clock.time_at("ab:cd").is_none());
}
