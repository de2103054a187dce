//! Acceleration limited travel curves.
//!
//! Speeds are in meters per millisecond and accelerations in meters per
//! millisecond squared so profiles can be evaluated directly against clock time.

mod flight;

pub use flight::*;

use crate::shared::Duration;

const KMH_TO_MPMS: f64 = 1.0 / 3_600.0;
const KMHPS_TO_MPMS2: f64 = 1.0 / 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub max_speed: f64,
    pub acceleration: f64,
    pub max_acceleration_time: Duration,
}

impl MotionParams {
    pub fn new(max_speed: f64, acceleration: f64, max_acceleration_time: Duration) -> Self {
        Self {
            max_speed,
            acceleration,
            max_acceleration_time,
        }
    }

    /// Builds parameters from km/h and km/h/s, the units operators publish.
    pub fn from_kmh(max_speed_kmh: f64, acceleration_kmhps: f64, max_acceleration_time: Duration) -> Self {
        Self::new(
            max_speed_kmh * KMH_TO_MPMS,
            acceleration_kmhps * KMHPS_TO_MPMS2,
            max_acceleration_time,
        )
    }

    /// Longest acceleration phase, capped by the time needed to reach top speed.
    pub fn max_acceleration_time(&self) -> f64 {
        self.max_acceleration_time
            .as_millis()
            .min(self.max_speed / self.acceleration)
    }

    pub fn max_acceleration_distance(&self) -> f64 {
        let time = self.max_acceleration_time();
        self.acceleration * time * time / 2.0
    }
}

/// Bounds a travel time has to land in, usually the gap between two timetable events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationWindow {
    pub min: Duration,
    pub max: Duration,
}

impl DurationWindow {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    fn clamp(&self, duration: f64) -> f64 {
        duration.max(self.min.as_millis()).min(self.max.as_millis())
    }
}

/// A symmetric accelerate, cruise, decelerate curve over a fixed distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    distance: f64,
    duration: f64,
    acceleration: f64,
    acceleration_time: f64,
    top_speed: f64,
}

impl MotionProfile {
    pub fn solve(distance: f64, params: &MotionParams, window: Option<DurationWindow>) -> Self {
        let distance = distance.abs();
        let acceleration = params.acceleration;
        let max_acc_time = params.max_acceleration_time();
        let max_acc_distance = params.max_acceleration_distance();

        if distance <= 2.0 * max_acc_distance {
            let duration = 2.0 * (distance / acceleration).sqrt();
            return Self {
                distance,
                duration,
                acceleration,
                acceleration_time: duration / 2.0,
                top_speed: acceleration * duration / 2.0,
            };
        }

        // Top speed is what the capped acceleration phase reaches, which may be
        // below `max_speed`.
        let top_speed = acceleration * max_acc_time;
        let duration = 2.0 * max_acc_time + (distance - 2.0 * max_acc_distance) / top_speed;
        let natural = Self {
            distance,
            duration,
            acceleration,
            acceleration_time: max_acc_time,
            top_speed,
        };

        let Some(window) = window.filter(|window| window.max.is_positive()) else {
            return natural;
        };
        let clamped = window.clamp(duration);
        if clamped == duration || clamped <= 0.0 {
            return natural;
        }
        Self::fit(distance, acceleration, clamped)
    }

    /// Re-derives speed and acceleration so `distance` takes exactly `duration`.
    fn fit(distance: f64, acceleration: f64, duration: f64) -> Self {
        let half = duration / 2.0;
        let discriminant = half * half - distance / acceleration;
        if discriminant >= 0.0 {
            let acceleration_time = half - discriminant.sqrt();
            Self {
                distance,
                duration,
                acceleration,
                acceleration_time,
                top_speed: acceleration * acceleration_time,
            }
        } else {
            let acceleration = 4.0 * distance / (duration * duration);
            Self {
                distance,
                duration,
                acceleration,
                acceleration_time: half,
                top_speed: acceleration * half,
            }
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration)
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn top_speed(&self) -> f64 {
        self.top_speed
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Travelled share of the distance after `elapsed`, in `[0, 1]`.
    pub fn position(&self, elapsed: Duration) -> f64 {
        if self.distance <= 0.0 {
            return 1.0;
        }
        let e = elapsed.as_millis();
        let (a, ta, t) = (self.acceleration, self.acceleration_time, self.duration);
        let travelled = if e <= 0.0 {
            0.0
        } else if e < ta {
            a * e * e / 2.0
        } else if e < t - ta {
            a * ta * ta / 2.0 + self.top_speed * (e - ta)
        } else if e < t {
            let left = t - e;
            self.distance - a * left * left / 2.0
        } else {
            self.distance
        };
        (travelled / self.distance).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
fn default_params() -> MotionParams {
    crate::config::TrainConfig::default().motion()
}

#[test]
fn unit_conversion() {
    let params = MotionParams::from_kmh(36.0, 3.6, Duration::from_seconds(10.0));
    assert!((params.max_speed - 0.01).abs() < 1e-12);
    assert!((params.acceleration - 1e-6).abs() < 1e-15);
}

#[test]
fn short_distance_is_triangular() {
    let params = default_params();
    let profile = MotionProfile::solve(100.0, &params, None);
    let expected = 2.0 * (100.0 / params.acceleration).sqrt();
    assert!((profile.duration().as_millis() - expected).abs() < 1e-6);
    assert!(profile.top_speed() < params.max_speed);
    assert!((profile.position(profile.duration() / 2.0) - 0.5).abs() < 1e-9);
}

#[test]
fn long_distance_is_trapezoidal() {
    let params = default_params();
    let profile = MotionProfile::solve(5_000.0, &params, None);
    let acc_time = params.max_acceleration_time();
    let expected = 2.0 * acc_time + (5_000.0 - 2.0 * params.max_acceleration_distance()) / params.max_speed;
    assert!((profile.duration().as_millis() - expected).abs() < 1e-6);
    assert!((profile.top_speed() - params.max_speed).abs() < 1e-9);
}

#[test]
fn capped_acceleration_time_cruises_at_reached_speed() {
    // 10 s at 3 km/h/s only reaches 30 km/h, well below the 80 km/h cap.
    let params = MotionParams::from_kmh(80.0, 3.0, Duration::from_seconds(10.0));
    let profile = MotionProfile::solve(5_000.0, &params, None);
    let (a, ta) = (params.acceleration, params.max_acceleration_time());
    let t = profile.duration().as_millis();
    assert!((profile.top_speed() - a * ta).abs() < 1e-12);
    assert!((a * ta * (t - ta) - 5_000.0).abs() < 1e-6);

    let steps = 10_000;
    let mut last = 0.0;
    for step in 1..=steps {
        let position = profile.position(profile.duration() * (step as f64 / steps as f64));
        assert!(position >= last);
        assert!(position - last < 1e-3);
        last = position;
    }
    assert_eq!(last, 1.0);
}

#[test]
fn window_slows_profile_down() {
    let params = default_params();
    let natural = MotionProfile::solve(5_000.0, &params, None).duration();
    let target = natural + Duration::from_seconds(30.0);
    let window = DurationWindow::new(target, target);
    let profile = MotionProfile::solve(5_000.0, &params, Some(window));
    assert_eq!(profile.duration(), target);
    assert!(profile.top_speed() < params.max_speed);
    assert!((profile.position(target) - 1.0).abs() < 1e-12);
    assert!((profile.position(target / 2.0) - 0.5).abs() < 1e-9);
}

#[test]
fn window_without_upper_bound_is_ignored() {
    let params = default_params();
    let natural = MotionProfile::solve(5_000.0, &params, None);
    let window = DurationWindow::new(Duration::from_hours(1.0), Duration::ZERO);
    assert_eq!(MotionProfile::solve(5_000.0, &params, Some(window)), natural);
}

#[test]
fn position_is_monotone() {
    let params = default_params();
    let profile = MotionProfile::solve(3_000.0, &params, None);
    let steps = 200;
    let mut last = 0.0;
    for step in 0..=steps {
        let elapsed = profile.duration() * (step as f64 / steps as f64);
        let position = profile.position(elapsed);
        assert!(position >= last);
        last = position;
    }
    assert_eq!(last, 1.0);
}

#[test]
fn zero_distance_is_complete() {
    let profile = MotionProfile::solve(0.0, &default_params(), None);
    assert_eq!(profile.duration(), Duration::ZERO);
    assert_eq!(profile.position(Duration::ZERO), 1.0);
}
