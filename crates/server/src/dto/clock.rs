use serde::{Deserialize, Serialize};
use tokyo_motion::clock::Clock;

#[derive(Debug, Clone, Serialize)]
pub struct ClockDto {
    /// Epoch milliseconds.
    pub time: f64,
    pub local: String,
    pub service_day: String,
    pub speed: f64,
    pub realtime: bool,
}

impl From<&Clock> for ClockDto {
    fn from(clock: &Clock) -> Self {
        Self {
            time: clock.time().as_millis(),
            local: clock.time_string(),
            service_day: clock.service_day().format("%Y-%m-%d").to_string(),
            speed: clock.speed(),
            realtime: clock.is_realtime(),
        }
    }
}

/// Body of `POST /clock`. Fields left out are not changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClockUpdateDto {
    pub reset: bool,
    pub speed: Option<f64>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// Epoch milliseconds.
    pub time: Option<f64>,
}
