use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    clock::Clock,
    config::Config,
    engine::Event,
    index::{FlightEntry, FlightKind, FlightRoute, RuntimeIndex},
    motion::FlightProfile,
    realtime::{FlightSnapshot, LiveFlight, Reconciliation, RunwayConfig},
    shared::{Duration, Timestamp},
};

/// Applies a live flight snapshot: selects the runway pattern, places every
/// flight on a route and spaces each runway queue.
pub fn reconcile_flights(
    index: &mut RuntimeIndex,
    snapshot: &FlightSnapshot,
    clock: &Clock,
    config: &Config,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    if index.runway_pattern.as_ref() != Some(&snapshot.runways) {
        info!(
            "Runway pattern is now landing {:?} departure {:?}",
            snapshot.runways.landing, snapshot.runways.departure
        );
        if index.runway_pattern.is_some() {
            result.restart_flights = true;
            result.events.push(Event::RunwayPatternChanged {
                landing: snapshot.runways.landing.clone(),
                departure: snapshot.runways.departure.clone(),
            });
        }
        index.runway_pattern = Some(snapshot.runways.clone());
    }

    let mut queues: BTreeMap<Arc<str>, Vec<FlightEntry>> = BTreeMap::new();
    let mut cancelled: BTreeSet<Arc<str>> = BTreeSet::new();
    for flight in &snapshot.flights {
        if flight.id.is_empty() {
            warn!("Skipping live flight without id");
            continue;
        }
        let status = flight.status.as_deref();
        if status.is_some_and(|status| config.flight.cancelled_statuses.iter().any(|c| c == status)) {
            cancelled.insert(flight.id.as_str().into());
            continue;
        }
        match place_flight(index, flight, &snapshot.runways, clock, config) {
            Some(entry) => queues.entry(entry.runway.clone()).or_default().push(entry),
            None => warn!("Skipping live flight {} that fits no route", flight.id),
        }
    }

    let mut flights = BTreeMap::new();
    for (_, mut queue) in queues {
        sequence_runway(&mut queue, config.flight.min_interval());
        flights.extend(queue.into_iter().map(|entry| (entry.id.clone(), entry)));
    }
    index.flights = flights;

    result.restart.extend(
        cancelled
            .into_iter()
            .filter(|id| index.vehicles.contains_key(id)),
    );
    result
}

/// Orders a runway queue by base time and pushes each flight back until it is
/// at least `min_interval` after the one before it.
pub fn sequence_runway(queue: &mut [FlightEntry], min_interval: Duration) {
    queue.sort_by(|a, b| {
        a.base
            .as_millis()
            .total_cmp(&b.base.as_millis())
            .then_with(|| a.id.cmp(&b.id))
    });
    let mut latest: Option<Timestamp> = None;
    for entry in queue.iter_mut() {
        if let Some(latest) = latest {
            entry.base = entry.base.max(latest + min_interval);
        }
        latest = Some(entry.base);
    }
}

fn place_flight(
    index: &RuntimeIndex,
    flight: &LiveFlight,
    runways: &RunwayConfig,
    clock: &Clock,
    config: &Config,
) -> Option<FlightEntry> {
    let hub = config.flight.hub_airport.as_str();
    let (kind, remote, times) = if flight.departure_airport.as_deref() == Some(hub) {
        (
            FlightKind::Departure,
            flight.arrival_airport.as_deref(),
            [
                &flight.actual_departure_time,
                &flight.estimated_departure_time,
                &flight.scheduled_departure_time,
            ],
        )
    } else if flight.arrival_airport.as_deref() == Some(hub) {
        (
            FlightKind::Arrival,
            flight.departure_airport.as_deref(),
            [
                &flight.actual_arrival_time,
                &flight.estimated_arrival_time,
                &flight.scheduled_arrival_time,
            ],
        )
    } else {
        return None;
    };

    let route = select_route(index, kind, remote, runways)?;
    let base = times
        .into_iter()
        .find_map(|label| label.as_deref().and_then(|label| clock.time_at(label)))?;

    let acceleration = match kind {
        FlightKind::Departure => config.flight.acceleration(),
        FlightKind::Arrival => -config.flight.acceleration(),
    };
    let profile = FlightProfile::solve(
        route.route.length().as_meters(),
        config.flight.max_speed(),
        acceleration,
    );

    Some(FlightEntry {
        id: flight.id.as_str().into(),
        kind,
        route: route.id.clone(),
        runway: route.runway.clone(),
        base,
        duration: profile.duration(),
        status: flight.status.as_deref().map(Into::into),
    })
}

/// Picks a route of the right kind on an active runway, preferring one that
/// lists the remote airport over a catch-all route.
fn select_route<'a>(
    index: &'a RuntimeIndex,
    kind: FlightKind,
    remote: Option<&str>,
    runways: &RunwayConfig,
) -> Option<&'a FlightRoute> {
    let active = match kind {
        FlightKind::Arrival => &runways.landing,
        FlightKind::Departure => &runways.departure,
    };
    let candidates = || {
        index
            .flight_routes()
            .filter(move |route| route.kind == kind && active.iter().any(|r| **r == *route.runway))
    };
    remote
        .and_then(|remote| candidates().find(|route| route.airports.iter().any(|a| &**a == remote)))
        .or_else(|| candidates().find(|route| route.airports.is_empty()))
}

#[cfg(test)]
fn queued(id: &str, base: f64) -> FlightEntry {
    FlightEntry {
        id: id.into(),
        kind: FlightKind::Arrival,
        route: "route".into(),
        runway: "34L".into(),
        base: Timestamp::from_millis(base),
        duration: Duration::from_minutes(3.0),
        status: None,
    }
}

#[test]
fn runway_queue_is_spaced() {
    let mut queue = vec![queued("b", 2_000.0), queued("a", 0.0)];
    sequence_runway(&mut queue, Duration::from_millis(5_000.0));
    assert_eq!(&*queue[0].id, "a");
    assert_eq!(queue[0].base.as_millis(), 0.0);
    assert_eq!(queue[1].base.as_millis(), 5_000.0);
}

#[test]
fn spaced_flights_keep_their_time() {
    let mut queue = vec![queued("a", 0.0), queued("b", 60_000.0)];
    sequence_runway(&mut queue, Duration::from_millis(5_000.0));
    assert_eq!(queue[1].base.as_millis(), 60_000.0);
}

#[test]
fn queue_push_cascades() {
    let mut queue = vec![queued("a", 0.0), queued("b", 1_000.0), queued("c", 2_000.0)];
    sequence_runway(&mut queue, Duration::from_millis(5_000.0));
    let bases: Vec<f64> = queue.iter().map(|entry| entry.base.as_millis()).collect();
    assert_eq!(bases, vec![0.0, 5_000.0, 10_000.0]);
}
