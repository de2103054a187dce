use crate::shared::Duration;

/// Which end of the path carries the speed ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Takeoff,
    Landing,
}

/// One-sided profile used by aircraft: ramp then cruise for a takeoff,
/// cruise then ramp for a landing.
///
/// The sign of the acceleration picks the ramp, positive for takeoff and
/// negative for landing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightProfile {
    distance: f64,
    max_speed: f64,
    acceleration: f64,
    acceleration_time: f64,
    duration: f64,
}

impl FlightProfile {
    pub fn solve(distance: f64, max_speed: f64, acceleration: f64) -> Self {
        let acceleration_time = max_speed / acceleration.abs();
        Self {
            distance,
            max_speed,
            acceleration,
            acceleration_time,
            duration: acceleration_time / 2.0 + distance / max_speed,
        }
    }

    pub fn ramp(&self) -> Ramp {
        if self.acceleration < 0.0 {
            Ramp::Landing
        } else {
            Ramp::Takeoff
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration)
    }

    /// Travelled share of the path after `elapsed`, in `[0, 1]`.
    pub fn position(&self, elapsed: Duration) -> f64 {
        if self.distance <= 0.0 {
            return 1.0;
        }
        let e = elapsed.as_millis().clamp(0.0, self.duration);
        let travelled = match self.ramp() {
            Ramp::Takeoff if e < self.acceleration_time => self.acceleration * e * e / 2.0,
            Ramp::Takeoff => self.max_speed * (e - self.acceleration_time / 2.0),
            Ramp::Landing => {
                let left = self.duration - e;
                if left >= self.acceleration_time {
                    self.max_speed * e
                } else {
                    self.distance - self.acceleration.abs() * left * left / 2.0
                }
            }
        };
        (travelled / self.distance).clamp(0.0, 1.0)
    }
}

#[test]
fn takeoff_starts_slow() {
    let profile = FlightProfile::solve(10_000.0, 0.1, 1e-5);
    assert_eq!(profile.ramp(), Ramp::Takeoff);
    assert!((profile.duration().as_millis() - 105_000.0).abs() < 1e-6);
    let end = profile.duration();
    let early = profile.position(Duration::from_seconds(5.0));
    let late = profile.position(end) - profile.position(end - Duration::from_seconds(5.0));
    assert!(early < late);
    assert!((profile.position(profile.duration()) - 1.0).abs() < 1e-12);
}

#[test]
fn landing_ends_slow() {
    let profile = FlightProfile::solve(10_000.0, 0.1, -1e-5);
    assert_eq!(profile.ramp(), Ramp::Landing);
    let early = profile.position(Duration::from_seconds(5.0));
    let late = 1.0 - profile.position(profile.duration() - Duration::from_seconds(5.0));
    assert!(early > late);
    assert_eq!(profile.position(Duration::ZERO), 0.0);
    assert!((profile.position(profile.duration()) - 1.0).abs() < 1e-12);
}

#[test]
fn flight_position_is_continuous_at_ramp_edge() {
    let profile = FlightProfile::solve(10_000.0, 0.1, 1e-5);
    let edge = Duration::from_millis(10_000.0);
    let before = profile.position(edge - Duration::from_millis(1e-3));
    let after = profile.position(edge);
    assert!((after - before).abs() < 1e-6);
}
