use serde::{Deserialize, Serialize};

/// One train as reported by the live feed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveTrain {
    pub id: String,
    /// Delay in milliseconds.
    pub delay: Option<f64>,
    pub car_composition: Option<u32>,
    pub train_type: Option<String>,
    pub origin: Vec<String>,
    pub destination: Vec<String>,
    pub from_station: Option<String>,
    pub to_station: Option<String>,
    pub rail_direction: Option<String>,
    pub operator: Option<String>,
    pub timestamp: Option<String>,
}

/// Operation status of a railway.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainInformation {
    pub railway: String,
    pub status: Option<String>,
    pub text: Option<String>,
}

impl TrainInformation {
    /// A railway with any status other than normal operation runs off timetable.
    pub fn is_dynamic(&self) -> bool {
        self.status
            .as_deref()
            .map(str::trim)
            .is_some_and(|status| !status.is_empty() && !status.eq_ignore_ascii_case("normal"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TrainSnapshot {
    pub trains: Vec<LiveTrain>,
    pub information: Vec<TrainInformation>,
}

/// Runways in use for landings and departures, from ATIS.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RunwayConfig {
    pub landing: Vec<String>,
    pub departure: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveFlight {
    pub id: String,
    pub flight_number: Vec<String>,
    pub airline: Option<String>,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub scheduled_departure_time: Option<String>,
    pub estimated_departure_time: Option<String>,
    pub actual_departure_time: Option<String>,
    pub scheduled_arrival_time: Option<String>,
    pub estimated_arrival_time: Option<String>,
    pub actual_arrival_time: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FlightSnapshot {
    pub runways: RunwayConfig,
    pub flights: Vec<LiveFlight>,
}
