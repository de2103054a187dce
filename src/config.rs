//! Static tunables for the simulation engine.
//!
//! Every group deserializes with defaults, so a config file only needs to name the
//! values it overrides.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::{motion::MotionParams, shared::Duration};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub train: TrainConfig,
    pub flight: FlightConfig,
    pub realtime: RealtimeConfig,
    pub clock: ClockConfig,
    pub frame: FrameConfig,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Cruise speed in km/h.
    pub max_speed_kmh: f64,
    /// Acceleration and deceleration in km/h/s.
    pub acceleration_kmhps: f64,
    /// Upper bound on a single acceleration phase in milliseconds.
    pub max_acceleration_time_ms: f64,
    /// Length of one car in meters.
    pub car_length_m: f64,
    /// Cars rendered for a railway that declares no composition.
    pub default_car_composition: u32,
    /// Time spent at the origin before the first departure.
    pub standing_duration_ms: f64,
    /// Shortest dwell kept at an intermediate stop when absorbing delay.
    pub min_standing_duration_ms: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 80.0,
            acceleration_kmhps: 3.0,
            max_acceleration_time_ms: 80.0 / 3.0 * 1000.0,
            car_length_m: 20.0,
            default_car_composition: 10,
            standing_duration_ms: 60_000.0,
            min_standing_duration_ms: 30_000.0,
        }
    }
}

impl TrainConfig {
    pub fn motion(&self) -> MotionParams {
        MotionParams::from_kmh(
            self.max_speed_kmh,
            self.acceleration_kmhps,
            Duration::from_millis(self.max_acceleration_time_ms),
        )
    }

    pub fn standing_duration(&self) -> Duration {
        Duration::from_millis(self.standing_duration_ms)
    }

    pub fn min_standing_duration(&self) -> Duration {
        Duration::from_millis(self.min_standing_duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub max_speed_kmh: f64,
    pub acceleration_kmhps: f64,
    /// Time on the ground before takeoff and after landing.
    pub standing_duration_ms: f64,
    /// Minimum spacing between two movements on the same runway.
    pub min_interval_ms: f64,
    /// Airport whose runways are simulated.
    pub hub_airport: String,
    /// Live statuses that mean the flight will not move.
    pub cancelled_statuses: Vec<String>,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 500.0,
            acceleration_kmhps: 12.0,
            standing_duration_ms: 60_000.0,
            min_interval_ms: 90_000.0,
            hub_airport: "HND".into(),
            cancelled_statuses: vec!["Cancelled".into()],
        }
    }
}

impl FlightConfig {
    pub fn max_speed(&self) -> f64 {
        self.max_speed_kmh / 3_600.0
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration_kmhps / 3_600_000.0
    }

    pub fn standing_duration(&self) -> Duration {
        Duration::from_millis(self.standing_duration_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Live ids under `from` are retried under `to` when they have no static match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailwayRename {
    pub from: String,
    pub to: String,
}

impl RailwayRename {
    /// Rewrites a train id whose railway prefix matches `from`.
    pub fn apply(&self, train_id: &str) -> Option<String> {
        let number = train_id.strip_prefix(self.from.as_str())?.strip_prefix('.')?;
        Some(format!("{}.{}", self.to, number))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub train_refresh_interval_ms: f64,
    pub flight_refresh_interval_ms: f64,
    /// How often a realtime-only train re-checks its live hints while standing.
    pub poll_interval_ms: f64,
    /// Validity window of a timetable synthesized from live hints.
    pub synthetic_validity_ms: f64,
    pub fallback_rename: Option<RailwayRename>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            train_refresh_interval_ms: 60_000.0,
            flight_refresh_interval_ms: 60_000.0,
            poll_interval_ms: 30_000.0,
            synthetic_validity_ms: 24.0 * 3_600_000.0,
            fallback_rename: Some(RailwayRename {
                from: "JR-East.SobuRapid".into(),
                to: "JR-East.Yokosuka".into(),
            }),
        }
    }
}

impl RealtimeConfig {
    pub fn train_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.train_refresh_interval_ms)
    }

    pub fn flight_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.flight_refresh_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn synthetic_validity(&self) -> Duration {
        Duration::from_millis(self.synthetic_validity_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Offset of timetable local time from UTC.
    pub utc_offset_hours: i32,
    /// Hour at which one service day ends and the next begins.
    pub day_boundary_hour: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            day_boundary_hour: 3,
        }
    }
}

impl ClockConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Off-screen vehicles update once every this many frames.
    pub offscreen_frame_interval: u32,
    /// Wall-clock gap after which every vehicle is restarted from the timetable.
    pub stale_after_ms: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            offscreen_frame_interval: 60,
            stale_after_ms: 10_000.0,
        }
    }
}

impl FrameConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

#[test]
fn partial_config_uses_defaults() {
    let config = Config::from_json(r#"{ "train": { "max_speed_kmh": 100.0 } }"#).unwrap();
    assert_eq!(config.train.max_speed_kmh, 100.0);
    assert_eq!(config.train.acceleration_kmhps, 3.0);
    assert_eq!(config.flight.hub_airport, "HND");
}

#[test]
fn rename_rewrites_prefix() {
    let rename = RailwayRename {
        from: "JR-East.SobuRapid".into(),
        to: "JR-East.Yokosuka".into(),
    };
    assert_eq!(
        rename.apply("JR-East.SobuRapid.1234F").as_deref(),
        Some("JR-East.Yokosuka.1234F")
    );
    assert_eq!(rename.apply("JR-East.SobuRapidX.1"), None);
    assert_eq!(rename.apply("JR-East.Chuo.1"), None);
}
