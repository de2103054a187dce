//! Frame driven orchestrator.
//!
//! One [`Engine::tick`] per rendered frame: staleness and service day checks,
//! periodic refresh, scheduler ticks dispatched to vehicles, then the
//! pose dependent work (visibility throttling, tracked vehicle event).

mod events;

pub use events::*;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, trace, warn};

use crate::{
    clock::{Clock, SystemWallClock, WallClock},
    config::Config,
    index::{self, FlightEntry, FlightKind, RuntimeIndex, TimetableEntry, source::ServiceDay},
    motion::FlightProfile,
    realtime::{self, FlightSnapshot, TrainSnapshot},
    schedule::Schedule,
    scheduler::{AnimationScheduler, Tick},
    shared::{Bounds, Timestamp},
    vehicle::{
        Context, Flight, Pose, Stage, StateMachine, Step, TerminateReason, Train, Vehicle,
    },
};

pub struct Engine {
    config: Config,
    clock: Clock,
    schedule: Schedule,
    index: RuntimeIndex,
    scheduler: AnimationScheduler<Arc<str>>,
    events: Vec<Event>,
    tracked: Option<Arc<str>>,
    marked: Option<Arc<str>>,
    viewport: Option<Bounds>,
    last_frame: Option<f64>,
    last_refresh: Option<f64>,
    /// Re-applied after a reload so synthetic and truncated timetables survive it.
    last_train_snapshot: Option<TrainSnapshot>,
}

impl Engine {
    pub fn new(schedule: Schedule, config: Config, wall: Arc<dyn WallClock>) -> Result<Self, index::Error> {
        let clock = Clock::new(wall, &config.clock);
        let index = RuntimeIndex::new().load_schedule(&schedule)?;
        let mut engine = Self {
            config,
            clock,
            schedule,
            index,
            scheduler: AnimationScheduler::new(),
            events: Vec::new(),
            tracked: None,
            marked: None,
            viewport: None,
            last_frame: None,
            last_refresh: None,
            last_train_snapshot: None,
        };
        engine.reload();
        Ok(engine)
    }

    pub fn with_system_clock(schedule: Schedule, config: Config) -> Result<Self, index::Error> {
        Self::new(schedule, config, Arc::new(SystemWallClock::default()))
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &RuntimeIndex {
        &self.index
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.index.vehicle(id)
    }

    pub fn tracked(&self) -> Option<&Arc<str>> {
        self.tracked.as_ref()
    }

    pub fn marked(&self) -> Option<&Arc<str>> {
        self.marked.as_ref()
    }

    /// Current pose of every active vehicle.
    pub fn poses(&self) -> impl Iterator<Item = (&Arc<str>, &Pose)> {
        self.index
            .vehicles
            .iter()
            .map(|(id, vehicle)| (id, vehicle.current_pose()))
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn tick(&mut self) {
        let wall = self.clock.wall_time();
        if let Some(last) = self.last_frame {
            if wall - last > self.config.frame.stale_after().as_millis() {
                warn!("No frame for {}ms, restarting every vehicle", wall - last);
                self.terminate_all(TerminateReason::Stale);
                self.refresh();
            }
        }
        self.last_frame = Some(wall);

        if self.index.service_day() != Some(self.clock.service_day()) {
            self.reload();
        }

        let interval = self.config.realtime.train_refresh_interval().as_millis();
        let now = self.clock.high_res_time();
        if self.last_refresh.is_none_or(|last| now - last >= interval) {
            self.refresh();
        }

        for tick in self.scheduler.tick(&self.clock) {
            self.dispatch(tick);
        }

        self.update_visibility();
        self.emit_tracked_pose();
    }

    /// Starts every train and flight that should be running now and is not.
    pub fn refresh(&mut self) {
        let now = self.clock.time();
        self.last_refresh = Some(self.clock.high_res_time());

        let mut trains: Vec<Arc<str>> = self
            .index
            .timetables()
            .filter(|timetable| self.should_start(timetable, now))
            .map(|timetable| timetable.id.clone())
            .collect();
        trains.sort();
        for id in trains {
            self.start_train(&id, false);
        }

        let standing = self.config.flight.standing_duration();
        let flights: Vec<FlightEntry> = self
            .index
            .flights()
            .filter(|entry| !self.index.vehicles.contains_key(&entry.id))
            .filter(|entry| {
                let (start, end) = entry.window(standing);
                now >= start && now < end
            })
            .cloned()
            .collect();
        for entry in flights {
            self.start_flight(entry);
        }
    }

    fn should_start(&self, timetable: &TimetableEntry, now: Timestamp) -> bool {
        if self.index.vehicles.contains_key(&timetable.id) {
            return false;
        }
        if !timetable.in_range(now, self.index.delay_of(&timetable.id)) {
            return false;
        }
        let live = self.index.is_live(&timetable.id);
        if (timetable.synthetic || self.index.is_dynamic(&timetable.railway)) && !live {
            return false;
        }
        // The previous leg hands over when it reaches its terminal.
        let previous_running = timetable.previous.as_deref().is_some_and(|previous| {
            self.index
                .timetable(previous)
                .is_some_and(|entry| entry.in_range(now, self.index.delay_of(previous)))
        });
        !previous_running
    }

    pub fn apply_train_snapshot(&mut self, snapshot: &TrainSnapshot) {
        self.last_train_snapshot = Some(snapshot.clone());
        let result = realtime::reconcile_trains(&mut self.index, snapshot, &self.clock, &self.config);
        debug!(
            "Train snapshot: {} events, {} restarts",
            result.events.len(),
            result.restart.len()
        );
        self.events.extend(result.events);
        for id in result.restart {
            self.terminate(&id, TerminateReason::Restart);
        }
        self.refresh();
    }

    pub fn apply_flight_snapshot(&mut self, snapshot: &FlightSnapshot) {
        let result = realtime::reconcile_flights(&mut self.index, snapshot, &self.clock, &self.config);
        self.events.extend(result.events);
        if result.restart_flights {
            let flights: Vec<Arc<str>> = self
                .index
                .vehicles
                .iter()
                .filter(|(_, vehicle)| vehicle.as_flight().is_some())
                .map(|(id, _)| id.clone())
                .collect();
            for id in flights {
                self.terminate(&id, TerminateReason::PatternChanged);
            }
        }
        for id in result.restart {
            self.terminate(&id, TerminateReason::Restart);
        }
        self.refresh();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.clock.set_date(date);
        self.reload();
    }

    /// Jumps to `time`. Vehicles are restarted at their new positions.
    pub fn set_time(&mut self, time: Timestamp) {
        self.clock.set_time(time);
        if self.index.service_day() != Some(self.clock.service_day()) {
            self.reload();
        } else {
            self.terminate_all(TerminateReason::Restart);
            self.refresh();
        }
    }

    /// Back to real time at normal speed.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
        self.reload();
    }

    pub fn track(&mut self, id: &str) -> bool {
        let Some(vehicle) = self.index.vehicle(id) else {
            return false;
        };
        self.tracked = Some(vehicle.id().clone());
        true
    }

    pub fn untrack(&mut self) {
        self.tracked = None;
    }

    pub fn mark(&mut self, id: &str) -> bool {
        let Some(vehicle) = self.index.vehicle(id) else {
            return false;
        };
        self.marked = Some(vehicle.id().clone());
        true
    }

    pub fn unmark(&mut self) {
        self.marked = None;
    }

    /// Vehicles outside `viewport` update at the off-screen frame interval.
    pub fn set_viewport(&mut self, viewport: Option<Bounds>) {
        self.viewport = viewport;
    }

    /// Rebuilds the timetables for the clock's service day and starts over.
    fn reload(&mut self) {
        self.terminate_all(TerminateReason::Reload);
        let day = ServiceDay {
            date: self.clock.service_day(),
            offset: self.clock.offset(),
            day_boundary: self.clock.day_boundary(),
            standing: self.config.train.standing_duration(),
        };
        info!("Reloading timetables for {}", day.date);
        self.index.load_service_day(&self.schedule, day);
        if let Some(snapshot) = &self.last_train_snapshot {
            let result = realtime::reconcile_trains(&mut self.index, snapshot, &self.clock, &self.config);
            debug!("Re-applied train snapshot after reload, {} events", result.events.len());
            self.events.extend(result.events);
        }
        self.refresh();
    }

    fn dispatch(&mut self, tick: Tick<Arc<str>>) {
        let Some(mut vehicle) = self.index.vehicles.remove(tick.key()) else {
            self.scheduler.stop(tick.handle());
            return;
        };
        if vehicle.handle() != Some(tick.handle()) {
            trace!("Ignoring stale tick for {}", tick.key());
            self.scheduler.stop(tick.handle());
            self.index.vehicles.insert(vehicle.id().clone(), vehicle);
            return;
        }

        let step = {
            let mut ctx = Context {
                clock: &self.clock,
                index: &self.index,
                scheduler: &mut self.scheduler,
                config: &self.config,
            };
            match tick {
                Tick::Frame { elapsed, .. } => vehicle.advance(&mut ctx, elapsed),
                Tick::Complete { .. } => vehicle.on_section_end(&mut ctx),
            }
        };
        self.apply(vehicle, step);
    }

    fn apply(&mut self, vehicle: Vehicle, step: Step) {
        let id = vehicle.id().clone();
        match step {
            Step::Continue => {
                self.index.vehicles.insert(id, vehicle);
            }
            Step::SectionChanged => {
                self.events.push(Event::SectionChanged {
                    id: id.clone(),
                    section: section_of(&vehicle),
                });
                self.index.vehicles.insert(id, vehicle);
            }
            Step::Handoff(next) => {
                self.index.vehicles.insert(id.clone(), vehicle);
                self.handoff(&id, &next);
            }
            Step::Terminate(reason) => self.finish(vehicle, reason),
        }
    }

    /// Passes the chain from `current` to `next`. The next vehicle is active
    /// and holds any tracked or marked reference before `current` goes away.
    fn handoff(&mut self, current: &Arc<str>, next: &Arc<str>) {
        let active = self.index.vehicles.contains_key(next) || self.start_train(next, true);
        if active {
            if self.tracked.as_ref() == Some(current) {
                self.tracked = Some(next.clone());
            }
            if self.marked.as_ref() == Some(current) {
                self.marked = Some(next.clone());
            }
            debug!("Handed {current} over to {next}");
        }
        self.terminate(current, TerminateReason::Finished);
    }

    fn start_train(&mut self, id: &str, chained: bool) -> bool {
        if self.index.vehicles.contains_key(id) {
            return false;
        }
        let Some(timetable) = self.index.timetable(id).cloned() else {
            return false;
        };
        let Some(railway) = self.index.railway(&timetable.railway) else {
            return false;
        };
        let train = Train::new(timetable, railway.route.clone(), chained);
        self.start_vehicle(Vehicle::Train(train))
    }

    fn start_flight(&mut self, entry: FlightEntry) -> bool {
        let Some(route) = self.index.flight_route(&entry.route) else {
            warn!("Flight {} references unknown route {}", entry.id, entry.route);
            return false;
        };
        let acceleration = match entry.kind {
            FlightKind::Departure => self.config.flight.acceleration(),
            FlightKind::Arrival => -self.config.flight.acceleration(),
        };
        let profile = FlightProfile::solve(
            route.route.length().as_meters(),
            self.config.flight.max_speed(),
            acceleration,
        );
        let flight = Flight::new(entry, route.route.clone(), profile);
        self.start_vehicle(Vehicle::Flight(flight))
    }

    fn start_vehicle(&mut self, mut vehicle: Vehicle) -> bool {
        let step = {
            let mut ctx = Context {
                clock: &self.clock,
                index: &self.index,
                scheduler: &mut self.scheduler,
                config: &self.config,
            };
            vehicle.begin(&mut ctx)
        };
        let id = vehicle.id().clone();
        match step {
            Step::Terminate(reason) => {
                vehicle.release(&mut self.scheduler);
                debug!("Not starting {id}: {reason:?}");
                false
            }
            Step::Handoff(next) => {
                vehicle.release(&mut self.scheduler);
                debug!("{id} already reached its terminal, starting {next}");
                self.start_train(&next, true)
            }
            Step::Continue | Step::SectionChanged => {
                trace!("Started {id}");
                self.events.push(Event::Created { id: id.clone() });
                self.index.vehicles.insert(id, vehicle);
                true
            }
        }
    }

    fn terminate(&mut self, id: &str, reason: TerminateReason) {
        if let Some(vehicle) = self.index.vehicles.remove(id) {
            self.finish(vehicle, reason);
        }
    }

    fn terminate_all(&mut self, reason: TerminateReason) {
        let vehicles = std::mem::take(&mut self.index.vehicles);
        for (_, vehicle) in vehicles {
            self.finish(vehicle, reason);
        }
    }

    /// Releases a vehicle that is no longer in the index.
    fn finish(&mut self, mut vehicle: Vehicle, reason: TerminateReason) {
        vehicle.release(&mut self.scheduler);
        let id = vehicle.id().clone();
        if self.tracked.as_ref() == Some(&id) {
            self.tracked = None;
        }
        if self.marked.as_ref() == Some(&id) {
            self.marked = None;
        }
        trace!("Terminated {id}: {reason:?}");
        self.events.push(Event::Terminated { id, reason });
    }

    fn update_visibility(&mut self) {
        let offscreen = self.config.frame.offscreen_frame_interval;
        for (id, vehicle) in self.index.vehicles.iter() {
            let Some(handle) = vehicle.handle() else {
                continue;
            };
            let visible = self.tracked.as_ref() == Some(id)
                || self.viewport.is_none_or(|bounds| {
                    vehicle
                        .current_pose()
                        .cars
                        .iter()
                        .any(|car| bounds.contains(&car.coordinate))
                });
            let rate = if visible { 1 } else { offscreen };
            self.scheduler.set_frame_rate(handle, rate);
        }
    }

    fn emit_tracked_pose(&mut self) {
        let Some(id) = self.tracked.clone() else {
            return;
        };
        let pose = self
            .index
            .vehicle(&id)
            .and_then(|vehicle| vehicle.current_pose().cars.first().copied());
        if let Some(pose) = pose {
            self.events.push(Event::TrackedPose { id, pose });
        }
    }
}

fn section_of(vehicle: &Vehicle) -> usize {
    match vehicle {
        Vehicle::Train(train) => train.section().index,
        Vehicle::Flight(flight) => match flight.stage() {
            Stage::Boarding | Stage::Landing => 0,
            Stage::Takeoff | Stage::Parked => 1,
        },
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("clock", &self.clock)
            .field("vehicles", &self.index.vehicle_count())
            .field("tasks", &self.scheduler.len())
            .finish()
    }
}


#[cfg(test)]
fn two_station_engine() -> (Engine, crate::clock::ManualWallClock) {
    let wall = crate::clock::ManualWallClock::at_epoch(crate::clock::jst(2026, 10, 14, 10, 1, 0));
    let engine = Engine::new(
        index::source::two_station_schedule(),
        Config::default(),
        Arc::new(wall.clone()),
    )
    .unwrap();
    (engine, wall)
}

#[test]
fn ticks_for_a_replaced_handle_are_dropped() {
    use crate::{scheduler::TaskSpec, shared::Duration};

    let (mut engine, wall) = two_station_engine();
    let id: Arc<str> = "Test.Line.1".into();
    let own = engine.vehicle(&id).and_then(StateMachine::handle).unwrap();
    let stray = engine
        .scheduler
        .start(&engine.clock, TaskSpec::new(id.clone(), Duration::from_seconds(5.0)));

    wall.advance(100.0);
    engine.tick();

    assert!(!engine.scheduler.is_active(stray));
    assert!(engine.scheduler.is_active(own));
    assert_eq!(engine.vehicle(&id).and_then(StateMachine::handle), Some(own));
}

#[test]
fn train_running_against_its_direction_is_not_started() {
    let (mut engine, _) = two_station_engine();
    let template = engine.index.timetable("Test.Line.1").cloned().unwrap();
    let mut backwards = TimetableEntry::clone(&template);
    backwards.id = "Test.Line.9".into();
    backwards.train_id = backwards.id.clone();
    backwards.next = None;
    backwards.stops = template.stops.iter().rev().cloned().collect();
    backwards.stops[0].departure = template.stops[0].departure;
    backwards.stops[0].arrival = None;
    backwards.stops[1].departure = None;
    backwards.stops[1].arrival = template.stops[1].arrival;
    engine.index.insert_timetable(backwards.into());
    let tasks = engine.scheduler.len();

    engine.refresh();

    assert!(engine.vehicle("Test.Line.9").is_none());
    assert_eq!(engine.scheduler.len(), tasks);
    assert!(!engine.drain_events().contains(&Event::Created { id: "Test.Line.9".into() }));
}
