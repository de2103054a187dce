use serde::{Deserialize, Serialize};

/// A railway line with its geometry.
///
/// `coordinates` are `[longitude, latitude]` or `[longitude, latitude, altitude]`.
/// When `station_offsets` is missing the offsets are projected from the station
/// coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleRailway {
    pub id: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub ascending: String,
    pub descending: String,
    pub stations: Vec<String>,
    pub coordinates: Vec<Vec<f64>>,
    pub station_offsets: Option<Vec<f64>>,
    pub car_composition: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleStation {
    pub id: String,
    pub railway: String,
    pub name: Option<String>,
    /// `[longitude, latitude]`.
    pub coordinate: Option<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleTrainType {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleStop {
    pub station: String,
    pub arrival: Option<String>,
    pub departure: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleTimetable {
    pub id: String,
    /// Id the live feed uses for this train. Defaults to `id`.
    pub train_id: Option<String>,
    pub railway: String,
    pub direction: String,
    pub train_type: Option<String>,
    #[serde(default)]
    pub origin: Vec<String>,
    #[serde(default)]
    pub destination: Vec<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
    /// `Weekday`, `SaturdayHoliday`, or missing for every day.
    pub calendar: Option<String>,
    pub car_composition: Option<u32>,
    pub stops: Vec<ScheduleStop>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScheduleFlightRoute {
    pub id: String,
    /// `arrival` or `departure`.
    pub kind: String,
    pub runway: String,
    /// Remote airports this route serves. Empty means any.
    #[serde(default)]
    pub airports: Vec<String>,
    pub coordinates: Vec<Vec<f64>>,
}

/// Every table of a static schedule bundle.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Schedule {
    pub railways: Vec<ScheduleRailway>,
    pub stations: Vec<ScheduleStation>,
    pub train_types: Vec<ScheduleTrainType>,
    pub timetables: Vec<ScheduleTimetable>,
    pub flight_routes: Vec<ScheduleFlightRoute>,
    /// Public holidays as `YYYY-MM-DD`.
    pub holidays: Vec<String>,
}
