use std::{collections::HashMap, sync::Arc};

use serde::Serialize;

use crate::{
    geometry::Route,
    shared::{Coordinate, Duration, Identifiable, Timestamp},
};

/// Travel direction along a railway's station list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Station indices increase.
    Ascending,
    /// Station indices decrease.
    Descending,
}

impl Direction {
    pub fn sign(&self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    Weekday,
    SaturdayHoliday,
    Everyday,
}

impl Calendar {
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            None | Some("") => Some(Calendar::Everyday),
            Some("Weekday") => Some(Calendar::Weekday),
            Some("SaturdayHoliday") | Some("Holiday") => Some(Calendar::SaturdayHoliday),
            Some(_) => None,
        }
    }

    pub fn runs_on(&self, holiday: bool) -> bool {
        match self {
            Calendar::Weekday => !holiday,
            Calendar::SaturdayHoliday => holiday,
            Calendar::Everyday => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Railway {
    pub id: Arc<str>,
    pub name: Option<Arc<str>>,
    pub color: Option<Arc<str>>,
    pub ascending: Arc<str>,
    pub descending: Arc<str>,
    pub stations: Box<[Arc<str>]>,
    pub route: Arc<Route>,
    pub car_composition: Option<u32>,
    /// Every index a station occupies; loop lines list their closing station twice.
    pub(crate) station_lookup: HashMap<Arc<str>, Vec<usize>>,
}

impl Identifiable for Railway {
    fn id(&self) -> &Arc<str> {
        &self.id
    }
}

impl Railway {
    /// First index of `station` in the station list.
    pub fn station_index(&self, station: &str) -> Option<usize> {
        self.station_lookup.get(station)?.first().copied()
    }

    /// Index of `station` reached next when travelling in `direction` from `after`.
    ///
    /// Without `after` this is the first occurrence seen in travel order.
    pub fn station_index_toward(
        &self,
        station: &str,
        direction: Direction,
        after: Option<usize>,
    ) -> Option<usize> {
        let indices = self.station_lookup.get(station)?;
        match direction {
            Direction::Ascending => indices
                .iter()
                .copied()
                .find(|&index| after.is_none_or(|after| index > after)),
            Direction::Descending => indices
                .iter()
                .rev()
                .copied()
                .find(|&index| after.is_none_or(|after| index < after)),
        }
    }

    pub fn direction(&self, value: &str) -> Option<Direction> {
        if value == &*self.ascending {
            Some(Direction::Ascending)
        } else if value == &*self.descending {
            Some(Direction::Descending)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Station {
    pub id: Arc<str>,
    pub railway: Arc<str>,
    pub name: Option<Arc<str>>,
    pub coordinate: Option<Coordinate>,
}

impl Identifiable for Station {
    fn id(&self) -> &Arc<str> {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct TrainType {
    pub id: Arc<str>,
    pub name: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub station: Arc<str>,
    /// Index of the station in its railway's station list.
    pub station_index: usize,
    pub arrival: Option<Timestamp>,
    pub departure: Option<Timestamp>,
}

impl Stop {
    /// Instant the train is due at this stop, arrival first.
    pub fn arrival_or_departure(&self) -> Option<Timestamp> {
        self.arrival.or(self.departure)
    }
}

/// A timetable resolved against one service day.
#[derive(Debug, Clone)]
pub struct TimetableEntry {
    pub id: Arc<str>,
    pub train_id: Arc<str>,
    pub railway: Arc<str>,
    pub direction: Direction,
    pub train_type: Option<Arc<str>>,
    pub origin: Box<[Arc<str>]>,
    pub destination: Box<[Arc<str>]>,
    pub previous: Option<Arc<str>>,
    pub next: Option<Arc<str>>,
    pub car_composition: Option<u32>,
    pub stops: Box<[Stop]>,
    /// First departure minus the standing duration.
    pub start: Timestamp,
    /// Last arrival or departure.
    pub end: Timestamp,
    /// Built from live hints instead of a static timetable.
    pub synthetic: bool,
}

impl Identifiable for TimetableEntry {
    fn id(&self) -> &Arc<str> {
        &self.id
    }
}

impl TimetableEntry {
    /// Whether `time` falls between start and end, with the end pushed back by `delay`.
    pub fn in_range(&self, time: Timestamp, delay: Duration) -> bool {
        time >= self.start && time <= self.end + delay
    }

    pub fn stop_position(&self, station: &str) -> Option<usize> {
        self.stops.iter().position(|stop| &*stop.station == station)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlightKind {
    Arrival,
    Departure,
}

impl FlightKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "arrival" => Some(FlightKind::Arrival),
            "departure" => Some(FlightKind::Departure),
            _ => None,
        }
    }
}

/// Approach or departure path for one runway.
///
/// Departure paths start at the runway, arrival paths end at it.
#[derive(Debug, Clone)]
pub struct FlightRoute {
    pub id: Arc<str>,
    pub kind: FlightKind,
    pub runway: Arc<str>,
    pub airports: Box<[Arc<str>]>,
    pub route: Arc<Route>,
}

impl Identifiable for FlightRoute {
    fn id(&self) -> &Arc<str> {
        &self.id
    }
}

/// A live flight placed on a runway queue.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightEntry {
    pub id: Arc<str>,
    pub kind: FlightKind,
    pub route: Arc<str>,
    pub runway: Arc<str>,
    /// Instant the flight leaves or touches the runway, after queueing.
    pub base: Timestamp,
    pub duration: Duration,
    pub status: Option<Arc<str>>,
}

impl FlightEntry {
    /// Span during which the flight is visible, standing included.
    pub fn window(&self, standing: Duration) -> (Timestamp, Timestamp) {
        match self.kind {
            FlightKind::Departure => (self.base - standing, self.base + self.duration),
            FlightKind::Arrival => (self.base - self.duration, self.base + standing),
        }
    }
}

/// Live state of one timetable, as last reported by the train feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainStatus {
    pub delay: Duration,
    pub car_composition: Option<u32>,
    pub train_type: Option<Arc<str>>,
    pub from_station: Option<Arc<str>>,
    pub to_station: Option<Arc<str>>,
}
