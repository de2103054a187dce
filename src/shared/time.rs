use std::{
    fmt::Display,
    ops::{Add, AddAssign, Div, Mul, Sub, SubAssign},
};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

pub const SECOND: Duration = Duration::from_seconds(1.0);
pub const MINUTE: Duration = Duration::from_minutes(1.0);
pub const HOUR: Duration = Duration::from_hours(1.0);
pub const DAY: Duration = Duration::from_hours(24.0);

/// An absolute instant, stored as milliseconds since the unix epoch.
/// Virtual time (clock playback) uses the same representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Timestamp(f64);

impl From<f64> for Timestamp {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0 - rhs.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Timestamp {
    pub const fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Converts to a date time in the given fixed offset.
    /// Returns None for instants chrono cannot represent.
    pub fn to_local(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        let utc = DateTime::from_timestamp_millis(self.0 as i64)?;
        Some(utc.with_timezone(&offset))
    }

    pub fn from_local(local: DateTime<FixedOffset>) -> Self {
        Self(local.timestamp_millis() as f64)
    }
}

/// A signed span of time in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Duration(f64);

impl From<f64> for Duration {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}ms", self.0))
    }
}

impl Duration {
    pub const ZERO: Self = Self(0.0);
    pub const INFINITE: Self = Self(f64::INFINITY);

    pub const fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    pub const fn from_seconds(secs: f64) -> Self {
        Self(secs * 1000.0)
    }

    pub const fn from_minutes(minutes: f64) -> Self {
        Self(minutes * 60.0 * 1000.0)
    }

    pub const fn from_hours(hours: f64) -> Self {
        Self(hours * 60.0 * 60.0 * 1000.0)
    }

    pub const fn as_millis(&self) -> f64 {
        self.0
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 / 1000.0
    }

    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}

impl Mul<f64> for Duration {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Duration {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// A timetable label such as `"07:45"` or `"25:10:30"`, parsed into hours,
/// minutes and seconds. Hours may exceed 23 for service days running past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Label {
    pub fn parse(label: &str) -> Option<Self> {
        let mut split = label.trim().split(':');
        let hours: u32 = split.next()?.parse().ok()?;
        let minutes: u32 = split.next()?.parse().ok()?;
        let seconds: u32 = match split.next() {
            Some(value) => value.parse().ok()?,
            None => 0,
        };
        if split.next().is_some() || minutes > 59 || seconds > 59 || hours > 47 {
            return None;
        }
        Some(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_hours(self.hours as f64)
            + Duration::from_minutes(self.minutes as f64)
            + Duration::from_seconds(self.seconds as f64)
    }

    /// Offset of this label from midnight of its service day.
    /// Labels before `day_boundary` belong to the tail of the service day.
    pub fn service_offset(&self, day_boundary: u32) -> Duration {
        if self.hours < day_boundary {
            self.as_duration() + DAY
        } else {
            self.as_duration()
        }
    }
}

/// Midnight of `date` in the given offset.
pub fn midnight(date: NaiveDate, offset: FixedOffset) -> Option<Timestamp> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(Timestamp::from_local(local))
}

/// Resolves a timetable label on a service day to an absolute instant.
pub fn resolve_label(
    label: &str,
    service_day: NaiveDate,
    offset: FixedOffset,
    day_boundary: u32,
) -> Option<Timestamp> {
    let label = Label::parse(label)?;
    Some(midnight(service_day, offset)? + label.service_offset(day_boundary))
}

#[test]
fn parse_label_1() {
    let label = Label::parse("07:45").unwrap();
    assert_eq!(label.hours, 7);
    assert_eq!(label.minutes, 45);
    assert_eq!(label.seconds, 0);
}

#[test]
fn parse_label_2() {
    let label = Label::parse("25:10:30").unwrap();
    assert_eq!(label.as_duration(), Duration::from_seconds(90_630.0));
}

#[test]
fn parse_label_invalid() {
    assert!(Label::parse("07").is_none());
    assert!(Label::parse("07:6a").is_none());
    assert!(Label::parse("07:61").is_none());
    assert!(Label::parse("07:00:00:00").is_none());
}

#[test]
fn service_offset_rolls_over_boundary() {
    let label = Label::parse("00:30").unwrap();
    assert_eq!(label.service_offset(3), DAY + Duration::from_minutes(30.0));
    let label = Label::parse("03:00").unwrap();
    assert_eq!(label.service_offset(3), Duration::from_hours(3.0));
}

#[test]
fn timestamp_arithmetic() {
    let a = Timestamp::from_millis(1000.0);
    let b = a + Duration::from_seconds(2.0);
    assert_eq!(b - a, Duration::from_millis(2000.0));
    assert!(b > a);
}
