use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

use chrono::{FixedOffset, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    geometry::{Route, Vertex},
    index::{
        Calendar, Error, FlightKind, FlightRoute, Railway, RuntimeIndex, Station, Stop,
        TimetableEntry, TrainType,
    },
    schedule::{Schedule, ScheduleRailway, ScheduleTimetable},
    shared::{Coordinate, Duration, Timestamp, resolve_label},
};

/// What a service day resolution needs to know about local time.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDay {
    pub date: NaiveDate,
    pub offset: FixedOffset,
    pub day_boundary: u32,
    /// Standing time before the first departure.
    pub standing: Duration,
}

impl RuntimeIndex {
    /// Loads everything that does not depend on the service day.
    pub fn load_schedule(mut self, schedule: &Schedule) -> Result<Self, Error> {
        self.load_stations(schedule);
        self.load_train_types(schedule);
        self.load_railways(schedule)?;
        self.load_flight_routes(schedule)?;
        self.load_holidays(schedule);
        Ok(self)
    }

    fn load_stations(&mut self, schedule: &Schedule) {
        debug!("Loading stations...");
        let now = Instant::now();
        self.stations = schedule
            .stations
            .iter()
            .map(|station| {
                let coordinate = station.coordinate.as_deref().and_then(parse_point).map(|v| v.coordinate);
                let value = Station {
                    id: station.id.as_str().into(),
                    railway: station.railway.as_str().into(),
                    name: station.name.as_deref().map(Into::into),
                    coordinate,
                };
                (value.id.clone(), value)
            })
            .collect();
        debug!("Loading stations took {:?}", now.elapsed());
    }

    fn load_train_types(&mut self, schedule: &Schedule) {
        debug!("Loading train types...");
        let now = Instant::now();
        self.train_types = schedule
            .train_types
            .iter()
            .map(|train_type| {
                let value = TrainType {
                    id: train_type.id.as_str().into(),
                    name: train_type.name.as_deref().map(Into::into),
                };
                (value.id.clone(), value)
            })
            .collect();
        debug!("Loading train types took {:?}", now.elapsed());
    }

    fn load_railways(&mut self, schedule: &Schedule) -> Result<(), Error> {
        debug!("Loading railways...");
        let now = Instant::now();
        let railways: Vec<Railway> = schedule
            .railways
            .par_iter()
            .map(|railway| build_railway(railway, &self.stations))
            .collect::<Result<_, _>>()?;
        self.railways = railways
            .into_iter()
            .map(|railway| (railway.id.clone(), railway))
            .collect();
        debug!("Loading railways took {:?}", now.elapsed());
        Ok(())
    }

    fn load_flight_routes(&mut self, schedule: &Schedule) -> Result<(), Error> {
        debug!("Loading flight routes...");
        let now = Instant::now();
        let routes: Vec<FlightRoute> = schedule
            .flight_routes
            .par_iter()
            .map(|route| {
                let kind = FlightKind::parse(&route.kind).ok_or_else(|| Error::InvalidRecord {
                    id: route.id.clone(),
                    reason: format!("unknown flight kind {}", route.kind),
                })?;
                let vertices = parse_vertices(&route.id, &route.coordinates)?;
                Ok(FlightRoute {
                    id: route.id.as_str().into(),
                    kind,
                    runway: route.runway.as_str().into(),
                    airports: route.airports.iter().map(|a| a.as_str().into()).collect(),
                    route: Route::new(&route.id, &vertices)?.into(),
                })
            })
            .collect::<Result<_, Error>>()?;
        self.flight_routes = routes
            .into_iter()
            .map(|route| (route.id.clone(), route))
            .collect();
        debug!("Loading flight routes took {:?}", now.elapsed());
        Ok(())
    }

    fn load_holidays(&mut self, schedule: &Schedule) {
        self.holidays = schedule
            .holidays
            .iter()
            .filter_map(|date| match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(err) => {
                    warn!("Skipping holiday {date}: {err}");
                    None
                }
            })
            .collect();
    }

    /// Resolves the timetables running on `day` and replaces the current set.
    pub fn load_service_day(&mut self, schedule: &Schedule, day: ServiceDay) {
        debug!("Loading timetables for {}...", day.date);
        let now = Instant::now();
        let holiday = self.is_holiday(day.date);
        let entries: Vec<TimetableEntry> = schedule
            .timetables
            .par_iter()
            .filter(|timetable| {
                Calendar::parse(timetable.calendar.as_deref())
                    .is_some_and(|calendar| calendar.runs_on(holiday))
            })
            .filter_map(|timetable| self.resolve_timetable(timetable, &day))
            .collect();

        self.timetables = HashMap::with_capacity(entries.len());
        self.train_lookup = HashMap::new();
        for entry in entries {
            self.insert_timetable(entry.into());
        }
        self.break_chain_cycles();
        self.service_day = Some(day.date);
        info!(
            "Loaded {} timetables for {} in {:?}",
            self.timetables.len(),
            day.date,
            now.elapsed()
        );
    }

    fn resolve_timetable(&self, timetable: &ScheduleTimetable, day: &ServiceDay) -> Option<TimetableEntry> {
        let Some(railway) = self.railways.get(timetable.railway.as_str()) else {
            warn!("Timetable {} references unknown railway {}", timetable.id, timetable.railway);
            return None;
        };
        let Some(direction) = railway.direction(&timetable.direction) else {
            warn!("Timetable {} has unknown direction {}", timetable.id, timetable.direction);
            return None;
        };

        let resolve = |label: &Option<String>| -> Result<Option<Timestamp>, ()> {
            match label {
                None => Ok(None),
                Some(label) => resolve_label(label, day.date, day.offset, day.day_boundary)
                    .map(Some)
                    .ok_or(()),
            }
        };

        let mut stops: Vec<Stop> = Vec::with_capacity(timetable.stops.len());
        for stop in &timetable.stops {
            let after = stops.last().map(|last| last.station_index);
            let Some(station_index) = railway.station_index_toward(&stop.station, direction, after) else {
                warn!("Timetable {} stops at unknown station {}", timetable.id, stop.station);
                return None;
            };
            let (Ok(arrival), Ok(departure)) = (resolve(&stop.arrival), resolve(&stop.departure)) else {
                warn!("Timetable {} has a malformed time at {}", timetable.id, stop.station);
                return None;
            };
            stops.push(Stop {
                station: railway.stations[station_index].clone(),
                station_index,
                arrival,
                departure,
            });
        }

        let first = stops.iter().find_map(|stop| stop.departure.or(stop.arrival))?;
        let last = stops.last().and_then(|stop| stop.arrival_or_departure())?;

        Some(TimetableEntry {
            id: timetable.id.as_str().into(),
            train_id: timetable.train_id.as_deref().unwrap_or(&timetable.id).into(),
            railway: railway.id.clone(),
            direction,
            train_type: timetable.train_type.as_deref().map(Into::into),
            origin: timetable.origin.iter().map(|s| s.as_str().into()).collect(),
            destination: timetable.destination.iter().map(|s| s.as_str().into()).collect(),
            previous: timetable.previous.as_deref().map(Into::into),
            next: timetable.next.as_deref().map(Into::into),
            car_composition: timetable.car_composition.or(railway.car_composition),
            stops: stops.into(),
            start: first - day.standing,
            end: last,
            synthetic: false,
        })
    }

    /// Drops the `next` edge that closes a loop in a timetable chain.
    fn break_chain_cycles(&mut self) {
        let mut ids: Vec<Arc<str>> = self.timetables.keys().cloned().collect();
        ids.sort();
        let mut broken = Vec::new();
        for id in ids {
            let mut visited: HashSet<Arc<str>> = HashSet::from([id.clone()]);
            let mut current = id;
            while let Some(next) = self.timetables.get(&current).and_then(|t| t.next.clone()) {
                if !self.timetables.contains_key(&next) {
                    break;
                }
                if !visited.insert(next.clone()) {
                    if !broken.contains(&current) {
                        broken.push(current.clone());
                    }
                    break;
                }
                current = next;
            }
            for id in broken.drain(..) {
                warn!("Timetable chain through {id} is cyclic, dropping its next link");
                if let Some(entry) = self.timetables.get_mut(&id) {
                    Arc::make_mut(entry).next = None;
                }
            }
        }
    }
}

fn build_railway(railway: &ScheduleRailway, stations: &HashMap<Arc<str>, Station>) -> Result<Railway, Error> {
    let vertices = parse_vertices(&railway.id, &railway.coordinates)?;
    let mut route = Route::new(&railway.id, &vertices)?;
    route = match &railway.station_offsets {
        Some(offsets) => {
            if offsets.len() != railway.stations.len() {
                return Err(crate::geometry::Error::StationCountMismatch {
                    route: railway.id.clone(),
                    offsets: offsets.len(),
                    stations: railway.stations.len(),
                }
                .into());
            }
            route.with_station_offsets(&railway.id, offsets.clone())?
        }
        None => {
            let coordinates = railway
                .stations
                .iter()
                .map(|id| {
                    stations
                        .get(id.as_str())
                        .and_then(|station| station.coordinate)
                        .ok_or_else(|| Error::InvalidRecord {
                            id: railway.id.clone(),
                            reason: format!("station {id} has no coordinate"),
                        })
                })
                .collect::<Result<Vec<Coordinate>, Error>>()?;
            route.project_stations(&railway.id, &coordinates)?
        }
    };

    let stations: Box<[Arc<str>]> = railway.stations.iter().map(|s| s.as_str().into()).collect();
    let mut station_lookup: HashMap<Arc<str>, Vec<usize>> = HashMap::with_capacity(stations.len());
    for (i, station) in stations.iter().enumerate() {
        station_lookup.entry(station.clone()).or_default().push(i);
    }

    Ok(Railway {
        id: railway.id.as_str().into(),
        name: railway.name.as_deref().map(Into::into),
        color: railway.color.as_deref().map(Into::into),
        ascending: railway.ascending.as_str().into(),
        descending: railway.descending.as_str().into(),
        stations,
        route: route.into(),
        car_composition: railway.car_composition,
        station_lookup,
    })
}

fn parse_vertices(id: &str, coordinates: &[Vec<f64>]) -> Result<Vec<Vertex>, Error> {
    coordinates
        .iter()
        .map(|point| {
            parse_point(point).ok_or_else(|| Error::InvalidRecord {
                id: id.to_string(),
                reason: format!("malformed coordinate {point:?}"),
            })
        })
        .collect()
}

/// `[longitude, latitude]` or `[longitude, latitude, altitude]`.
fn parse_point(point: &[f64]) -> Option<Vertex> {
    match *point {
        [longitude, latitude] => Some(Coordinate::new(latitude, longitude).into()),
        [longitude, latitude, altitude] => Some(Vertex {
            coordinate: Coordinate::new(latitude, longitude),
            altitude,
        }),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn two_station_schedule() -> Schedule {
    use crate::schedule::{ScheduleStation, ScheduleStop};
    Schedule {
        railways: vec![ScheduleRailway {
            id: "Test.Line".into(),
            ascending: "Up".into(),
            descending: "Down".into(),
            stations: vec!["Test.Line.A".into(), "Test.Line.B".into()],
            coordinates: vec![vec![139.70, 35.60], vec![139.70, 35.61]],
            ..Default::default()
        }],
        stations: vec![
            ScheduleStation {
                id: "Test.Line.A".into(),
                railway: "Test.Line".into(),
                name: None,
                coordinate: Some(vec![139.70, 35.60]),
            },
            ScheduleStation {
                id: "Test.Line.B".into(),
                railway: "Test.Line".into(),
                name: None,
                coordinate: Some(vec![139.70, 35.61]),
            },
        ],
        timetables: ["1", "2"]
            .iter()
            .map(|n| ScheduleTimetable {
                id: format!("Test.Line.{n}"),
                railway: "Test.Line".into(),
                direction: "Up".into(),
                next: Some(format!("Test.Line.{}", if *n == "1" { "2" } else { "1" })),
                stops: vec![
                    ScheduleStop {
                        station: "Test.Line.A".into(),
                        arrival: None,
                        departure: Some("10:00".into()),
                    },
                    ScheduleStop {
                        station: "Test.Line.B".into(),
                        arrival: Some("10:02".into()),
                        departure: None,
                    },
                ],
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

#[cfg(test)]
fn test_day() -> ServiceDay {
    ServiceDay {
        date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
        offset: FixedOffset::east_opt(9 * 3600).unwrap(),
        day_boundary: 3,
        standing: Duration::from_minutes(1.0),
    }
}

#[test]
fn projected_offsets_span_the_route() {
    let index = RuntimeIndex::new().load_schedule(&two_station_schedule()).unwrap();
    let railway = index.railway("Test.Line").unwrap();
    let offsets = railway.route.station_offsets();
    assert_eq!(offsets[0], 0.0);
    assert!((offsets[1] - railway.route.length().as_meters()).abs() < 1e-6);
}

#[test]
fn chain_cycles_are_broken() {
    let schedule = two_station_schedule();
    let mut index = RuntimeIndex::new().load_schedule(&schedule).unwrap();
    index.load_service_day(&schedule, test_day());
    let cut = index
        .timetables()
        .filter(|timetable| timetable.next.is_none())
        .count();
    assert_eq!(cut, 1);
    assert_eq!(index.timetable("Test.Line.1").unwrap().next.as_deref(), Some("Test.Line.2"));
}

#[test]
fn timetable_bounds_include_standing() {
    let schedule = two_station_schedule();
    let mut index = RuntimeIndex::new().load_schedule(&schedule).unwrap();
    let day = test_day();
    index.load_service_day(&schedule, day);
    let entry = index.timetable("Test.Line.1").unwrap();
    let departure = entry.stops[0].departure.unwrap();
    assert_eq!(departure - entry.start, day.standing);
    assert_eq!(entry.end - departure, Duration::from_minutes(2.0));
    assert_eq!(index.timetables_for_train("Test.Line.1").len(), 1);
}

#[test]
fn calendar_filters_timetables() {
    let mut schedule = two_station_schedule();
    schedule.timetables[0].calendar = Some("SaturdayHoliday".into());
    schedule.timetables[1].calendar = Some("Weekday".into());
    let mut index = RuntimeIndex::new().load_schedule(&schedule).unwrap();
    index.load_service_day(&schedule, test_day());
    assert!(index.timetable("Test.Line.1").is_none());
    assert!(index.timetable("Test.Line.2").is_some());
}

#[cfg(test)]
fn loop_schedule() -> Schedule {
    use crate::schedule::{ScheduleStation, ScheduleStop};
    let points = [("A", 35.60, 139.70), ("B", 35.61, 139.70), ("C", 35.61, 139.71)];
    let stop = |station: &str, arrival: Option<&str>, departure: Option<&str>| ScheduleStop {
        station: format!("Test.Loop.{station}"),
        arrival: arrival.map(Into::into),
        departure: departure.map(Into::into),
    };
    Schedule {
        railways: vec![ScheduleRailway {
            id: "Test.Loop".into(),
            ascending: "Outer".into(),
            descending: "Inner".into(),
            stations: ["A", "B", "C", "A"].iter().map(|s| format!("Test.Loop.{s}")).collect(),
            coordinates: [0, 1, 2, 0].iter().map(|&i| vec![points[i].2, points[i].1]).collect(),
            ..Default::default()
        }],
        stations: points
            .iter()
            .map(|(name, lat, lon)| ScheduleStation {
                id: format!("Test.Loop.{name}"),
                railway: "Test.Loop".into(),
                name: None,
                coordinate: Some(vec![*lon, *lat]),
            })
            .collect(),
        timetables: vec![
            ScheduleTimetable {
                id: "Test.Loop.Outer".into(),
                railway: "Test.Loop".into(),
                direction: "Outer".into(),
                stops: vec![stop("C", None, Some("10:00")), stop("A", Some("10:05"), None)],
                ..Default::default()
            },
            ScheduleTimetable {
                id: "Test.Loop.Inner".into(),
                railway: "Test.Loop".into(),
                direction: "Inner".into(),
                stops: vec![stop("A", None, Some("10:00")), stop("C", Some("10:05"), None)],
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

#[test]
fn loop_stations_resolve_in_travel_order() {
    use crate::index::Direction;
    let schedule = loop_schedule();
    let mut index = RuntimeIndex::new().load_schedule(&schedule).unwrap();
    index.load_service_day(&schedule, test_day());

    let railway = index.railway("Test.Loop").unwrap();
    assert_eq!(railway.station_index("Test.Loop.A"), Some(0));
    assert_eq!(railway.station_index_toward("Test.Loop.A", Direction::Ascending, Some(2)), Some(3));
    assert_eq!(railway.station_index_toward("Test.Loop.A", Direction::Descending, None), Some(3));
    assert_eq!(railway.station_index_toward("Test.Loop.A", Direction::Descending, Some(0)), None);

    let outer: Vec<usize> = index
        .timetable("Test.Loop.Outer")
        .unwrap()
        .stops
        .iter()
        .map(|stop| stop.station_index)
        .collect();
    assert_eq!(outer, [2, 3]);
    let inner: Vec<usize> = index
        .timetable("Test.Loop.Inner")
        .unwrap()
        .stops
        .iter()
        .map(|stop| stop.station_index)
        .collect();
    assert_eq!(inner, [3, 2]);
}
