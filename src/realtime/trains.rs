use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use tracing::{debug, trace, warn};

use crate::{
    clock::Clock,
    config::Config,
    engine::Event,
    index::{Direction, RuntimeIndex, Stop, TimetableEntry},
    realtime::{LiveTrain, Reconciliation, TrainSnapshot},
    shared::{Duration, split_train_id},
};

/// Applies a live train snapshot.
///
/// Change events only fire for values that differ from the previous snapshot,
/// so applying the same snapshot twice is silent the second time.
pub fn reconcile_trains(
    index: &mut RuntimeIndex,
    snapshot: &TrainSnapshot,
    clock: &Clock,
    config: &Config,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    index.dynamic_railways = snapshot
        .information
        .iter()
        .filter(|information| information.is_dynamic())
        .map(|information| information.railway.as_str().into())
        .collect();

    let previous = std::mem::take(&mut index.live_trains);
    let mut live: HashSet<Arc<str>> = HashSet::with_capacity(snapshot.trains.len());

    for train in &snapshot.trains {
        if train.id.is_empty() {
            warn!("Skipping live train without id");
            continue;
        }
        let ids = match matching_timetables(index, train, config) {
            ids if !ids.is_empty() => ids,
            _ => match synthesize(index, train, clock, config) {
                Some(entry) => {
                    let id = entry.id.clone();
                    debug!("Synthesized realtime timetable {id}");
                    index.insert_timetable(entry.into());
                    vec![id]
                }
                None => {
                    warn!("Skipping live train {} without enough hints", train.id);
                    continue;
                }
            },
        };

        for id in ids {
            update_status(index, &id, train, &mut result.events);
            if truncate(index, &id, train, config) {
                result.restart.insert(id.clone());
            }
            live.insert(id);
        }
    }

    for id in previous.difference(&live) {
        trace!("Live train {id} disappeared");
        result.restart.insert(id.clone());
    }

    let stale: Vec<Arc<str>> = index
        .timetables
        .values()
        .filter(|entry| entry.synthetic && !live.contains(&entry.id))
        .map(|entry| entry.id.clone())
        .collect();
    for id in stale {
        index.remove_timetable(&id);
        result.restart.insert(id);
    }

    // Timetable-only vehicles on disrupted railways give way to live ones.
    let ghosts: BTreeSet<Arc<str>> = index
        .vehicles
        .values()
        .filter(|vehicle| {
            vehicle
                .railway()
                .is_some_and(|railway| index.dynamic_railways.contains(railway))
                && !live.contains(vehicle.id())
        })
        .map(|vehicle| vehicle.id().clone())
        .collect();
    result.restart.extend(ghosts);

    index.live_trains = live;
    result
}

fn matching_timetables(index: &RuntimeIndex, train: &LiveTrain, config: &Config) -> Vec<Arc<str>> {
    let ids = index.timetables_for_train(&train.id);
    if !ids.is_empty() {
        return ids.to_vec();
    }
    config
        .realtime
        .fallback_rename
        .as_ref()
        .and_then(|rename| rename.apply(&train.id))
        .map(|renamed| index.timetables_for_train(&renamed).to_vec())
        .unwrap_or_default()
}

fn update_status(index: &mut RuntimeIndex, id: &Arc<str>, train: &LiveTrain, events: &mut Vec<Event>) {
    let train_type = match train.train_type.as_deref() {
        Some(train_type) if index.train_type(train_type).is_some() => Some(Arc::<str>::from(train_type)),
        Some(train_type) => {
            warn!("Ignoring unknown train type {train_type} for {id}");
            None
        }
        None => None,
    };

    let status = index.status.entry(id.clone()).or_default();
    let delay = Duration::from_millis(train.delay.filter(|delay| delay.is_finite()).unwrap_or(0.0));
    if status.delay != delay {
        status.delay = delay;
        events.push(Event::DelayChanged {
            id: id.clone(),
            delay,
        });
    }

    if let Some(cars) = train.car_composition.filter(|cars| *cars > 0) {
        if status.car_composition != Some(cars) {
            status.car_composition = Some(cars);
            events.push(Event::CompositionChanged {
                id: id.clone(),
                cars,
            });
        }
    }

    if let Some(train_type) = train_type {
        if status.train_type.as_ref() != Some(&train_type) {
            status.train_type = Some(train_type.clone());
            events.push(Event::TrainTypeChanged {
                id: id.clone(),
                train_type,
            });
        }
    }

    status.from_station = train.from_station.as_deref().map(Into::into);
    status.to_station = train.to_station.as_deref().map(Into::into);
}

/// Narrows a timetable to the live origin and destination.
/// Returns whether the timetable was replaced.
fn truncate(index: &mut RuntimeIndex, id: &str, train: &LiveTrain, config: &Config) -> bool {
    let Some(entry) = index.timetable(id) else {
        return false;
    };
    if entry.synthetic {
        return false;
    }

    let last = entry.stops.len().saturating_sub(1);
    let first = train
        .origin
        .first()
        .and_then(|station| entry.stop_position(station))
        .filter(|position| *position > 0)
        .unwrap_or(0);
    let end = train
        .destination
        .first()
        .and_then(|station| {
            entry.stops[first..]
                .iter()
                .position(|stop| &*stop.station == station.as_str())
                .map(|position| first + position)
        })
        .filter(|position| *position < last)
        .unwrap_or(last);
    if first == 0 && end == last {
        return false;
    }
    if end <= first {
        warn!("Live boundary of {id} leaves no section, keeping timetable");
        return false;
    }

    let mut narrowed = TimetableEntry::clone(entry);
    narrowed.stops = entry.stops[first..=end].into();
    if first > 0 {
        narrowed.previous = None;
        narrowed.origin = train.origin.iter().map(|s| s.as_str().into()).collect();
    }
    if end < last {
        narrowed.next = None;
        narrowed.destination = train.destination.iter().map(|s| s.as_str().into()).collect();
    }
    let Some(first_time) = narrowed.stops.iter().find_map(|stop| stop.departure.or(stop.arrival)) else {
        return false;
    };
    let Some(last_time) = narrowed.stops.last().and_then(Stop::arrival_or_departure) else {
        return false;
    };
    narrowed.start = first_time - config.train.standing_duration();
    narrowed.end = last_time;

    debug!("Truncated {id} to stops {first}..={end}");
    index.insert_timetable(narrowed.into());
    true
}

/// Builds a realtime-only timetable from the hints of an unmatched live train.
fn synthesize(index: &RuntimeIndex, train: &LiveTrain, clock: &Clock, config: &Config) -> Option<TimetableEntry> {
    let (railway_id, _) = split_train_id(&train.id)?;
    let railway = index.railway(railway_id)?;
    let declared = train
        .rail_direction
        .as_deref()
        .and_then(|direction| railway.direction(direction));
    let resolve = |station: &str, after: Option<usize>| match declared {
        Some(direction) => railway.station_index_toward(station, direction, after),
        None => railway.station_index(station),
    };
    let from = train.from_station.as_deref()?;
    let from_index = resolve(from, None)?;
    let to_index = train
        .to_station
        .as_deref()
        .and_then(|station| resolve(station, Some(from_index)));

    let direction = declared
        .or_else(|| to_index.and_then(|to| direction_between(from_index, to)))
        .or_else(|| {
            train
                .destination
                .first()
                .and_then(|station| resolve(station, Some(from_index)))
                .and_then(|to| direction_between(from_index, to))
        })?;

    let mut stops = vec![Stop {
        station: railway.stations[from_index].clone(),
        station_index: from_index,
        arrival: None,
        departure: None,
    }];
    if let Some(to_index) = to_index.filter(|to| *to != from_index) {
        stops.push(Stop {
            station: railway.stations[to_index].clone(),
            station_index: to_index,
            arrival: None,
            departure: None,
        });
    }

    let now = clock.time();
    let id: Arc<str> = train.id.as_str().into();
    Some(TimetableEntry {
        id: id.clone(),
        train_id: id,
        railway: railway.id.clone(),
        direction,
        train_type: None,
        origin: train.origin.iter().map(|s| s.as_str().into()).collect(),
        destination: train.destination.iter().map(|s| s.as_str().into()).collect(),
        previous: None,
        next: None,
        car_composition: railway.car_composition,
        stops: stops.into(),
        start: now,
        end: now + config.realtime.synthetic_validity(),
        synthetic: true,
    })
}

fn direction_between(from: usize, to: usize) -> Option<Direction> {
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => Some(Direction::Ascending),
        std::cmp::Ordering::Less => Some(Direction::Descending),
        std::cmp::Ordering::Equal => None,
    }
}
