//! Lookup tables shared by every component.
//!
//! Static tables are built from a [`Schedule`](crate::schedule::Schedule), timetables
//! are resolved per service day, and the live tables are patched by the reconciler.
//! Vehicles are owned here; the scheduler only holds their handles.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use chrono::NaiveDate;
use thiserror::Error;

mod models;
pub mod source;
pub use models::*;

use crate::{geometry, realtime::RunwayConfig, schedule, shared::Duration, vehicle::Vehicle};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Geometry error: {0}")]
    Geometry(#[from] geometry::Error),
    #[error("Schedule error: {0}")]
    Schedule(#[from] schedule::Error),
    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

type IdToIds = HashMap<Arc<str>, Vec<Arc<str>>>;

#[derive(Debug, Default)]
pub struct RuntimeIndex {
    pub(crate) railways: HashMap<Arc<str>, Railway>,
    pub(crate) stations: HashMap<Arc<str>, Station>,
    pub(crate) train_types: HashMap<Arc<str>, TrainType>,
    pub(crate) flight_routes: BTreeMap<Arc<str>, FlightRoute>,
    pub(crate) holidays: HashSet<NaiveDate>,

    // Resolved for `service_day`
    pub(crate) service_day: Option<NaiveDate>,
    pub(crate) timetables: HashMap<Arc<str>, Arc<TimetableEntry>>,
    pub(crate) train_lookup: IdToIds,

    // Live
    pub(crate) status: HashMap<Arc<str>, TrainStatus>,
    pub(crate) live_trains: HashSet<Arc<str>>,
    pub(crate) dynamic_railways: HashSet<Arc<str>>,
    pub(crate) flights: BTreeMap<Arc<str>, FlightEntry>,
    pub(crate) runway_pattern: Option<RunwayConfig>,

    pub(crate) vehicles: BTreeMap<Arc<str>, Vehicle>,
}

impl RuntimeIndex {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn railway(&self, id: &str) -> Option<&Railway> {
        self.railways.get(id)
    }

    pub fn railways(&self) -> impl Iterator<Item = &Railway> {
        self.railways.values()
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn train_type(&self, id: &str) -> Option<&TrainType> {
        self.train_types.get(id)
    }

    pub fn flight_route(&self, id: &str) -> Option<&FlightRoute> {
        self.flight_routes.get(id)
    }

    pub fn flight_routes(&self) -> impl Iterator<Item = &FlightRoute> {
        self.flight_routes.values()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        use chrono::{Datelike, Weekday};
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.holidays.contains(&date)
    }

    pub fn service_day(&self) -> Option<NaiveDate> {
        self.service_day
    }

    pub fn timetable(&self, id: &str) -> Option<&Arc<TimetableEntry>> {
        self.timetables.get(id)
    }

    pub fn timetables(&self) -> impl Iterator<Item = &Arc<TimetableEntry>> {
        self.timetables.values()
    }

    /// Timetable ids the live feed's `train_id` maps to.
    pub fn timetables_for_train(&self, train_id: &str) -> &[Arc<str>] {
        self.train_lookup
            .get(train_id)
            .map(|ids| ids.as_slice())
            .unwrap_or_default()
    }

    pub fn status(&self, timetable_id: &str) -> Option<&TrainStatus> {
        self.status.get(timetable_id)
    }

    pub fn delay_of(&self, timetable_id: &str) -> Duration {
        self.status
            .get(timetable_id)
            .map(|status| status.delay)
            .unwrap_or_default()
    }

    /// Whether the latest train snapshot reported this timetable.
    pub fn is_live(&self, timetable_id: &str) -> bool {
        self.live_trains.contains(timetable_id)
    }

    pub fn is_dynamic(&self, railway: &str) -> bool {
        self.dynamic_railways.contains(railway)
    }

    pub fn flight(&self, id: &str) -> Option<&FlightEntry> {
        self.flights.get(id)
    }

    pub fn flights(&self) -> impl Iterator<Item = &FlightEntry> {
        self.flights.values()
    }

    pub fn runway_pattern(&self) -> Option<&RunwayConfig> {
        self.runway_pattern.as_ref()
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Adds or replaces a timetable, keeping the train id lookup in sync.
    pub(crate) fn insert_timetable(&mut self, entry: Arc<TimetableEntry>) {
        if let Some(old) = self.timetables.insert(entry.id.clone(), entry.clone()) {
            if let Some(ids) = self.train_lookup.get_mut(&old.train_id) {
                ids.retain(|id| id != &old.id);
            }
        }
        let ids = self.train_lookup.entry(entry.train_id.clone()).or_default();
        if !ids.contains(&entry.id) {
            ids.push(entry.id.clone());
        }
    }

    pub(crate) fn remove_timetable(&mut self, id: &str) -> Option<Arc<TimetableEntry>> {
        let entry = self.timetables.remove(id)?;
        if let Some(ids) = self.train_lookup.get_mut(&entry.train_id) {
            ids.retain(|other| other != &entry.id);
            if ids.is_empty() {
                self.train_lookup.remove(&entry.train_id);
            }
        }
        self.status.remove(id);
        Some(entry)
    }
}
