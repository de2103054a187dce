use std::sync::Arc;

use tracing::{trace, warn};

use crate::{
    geometry::Route,
    index::{Direction, TimetableEntry},
    motion::{DurationWindow, MotionProfile},
    scheduler::{AnimationScheduler, Handle},
    shared::{Duration, Timestamp},
    vehicle::{Context, Phase, Pose, StateMachine, Step, TerminateReason, reschedule},
};

/// Span between two stops, in station index units. `length` is signed and
/// follows the direction of travel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Section {
    pub index: usize,
    pub length: i32,
}

impl Section {
    pub fn target(&self) -> usize {
        (self.index as i64 + self.length as i64).max(0) as usize
    }
}

#[derive(Debug)]
pub struct Train {
    id: Arc<str>,
    timetable: Arc<TimetableEntry>,
    route: Arc<Route>,
    direction: Direction,
    /// Started by a chain handoff, so the timetable start bound does not apply.
    chained: bool,
    phase: Phase,
    handle: Option<Handle>,
    /// Position in the timetable of the stop the train stands at or last left.
    stop: usize,
    section: Section,
    offset: f64,
    interval: f64,
    t: f64,
    delay: Duration,
    profile: Option<MotionProfile>,
    terminal: bool,
    pose: Pose,
}

impl Train {
    pub fn new(timetable: Arc<TimetableEntry>, route: Arc<Route>, chained: bool) -> Self {
        Self {
            id: timetable.id.clone(),
            direction: timetable.direction,
            timetable,
            route,
            chained,
            phase: Phase::Start,
            handle: None,
            stop: 0,
            section: Section::default(),
            offset: 0.0,
            interval: 0.0,
            t: 0.0,
            delay: Duration::ZERO,
            profile: None,
            terminal: false,
            pose: Pose::default(),
        }
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn railway(&self) -> &str {
        &self.timetable.railway
    }

    pub fn timetable(&self) -> &Arc<TimetableEntry> {
        &self.timetable
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// Distance along the route where the current section starts, in meters.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Signed distance of the current section, in meters.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn progress(&self) -> f64 {
        self.t
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_realtime_only(&self) -> bool {
        self.timetable.synthetic
    }

    pub fn departure_station(&self) -> Option<&Arc<str>> {
        self.timetable.stops.get(self.stop).map(|stop| &stop.station)
    }

    /// Station the train is heading to, or standing at.
    pub fn arrival_station(&self) -> Option<&Arc<str>> {
        let stops = &self.timetable.stops;
        match self.phase {
            Phase::Running if !self.timetable.synthetic => {
                stops.get(self.stop + 1).map(|stop| &stop.station)
            }
            _ => stops
                .iter()
                .find(|stop| stop.station_index == self.section.target())
                .map(|stop| &stop.station)
                .or_else(|| self.departure_station()),
        }
    }

    pub fn next(&self) -> Option<&Arc<str>> {
        self.timetable.next.as_ref()
    }

    pub fn previous(&self) -> Option<&Arc<str>> {
        self.timetable.previous.as_ref()
    }

    fn composition(&self, ctx: &Context) -> u32 {
        ctx.index
            .status(&self.id)
            .and_then(|status| status.car_composition)
            .or(self.timetable.car_composition)
            .unwrap_or(ctx.config.train.default_car_composition)
    }

    /// Places the cars around `distance`.
    fn place(&mut self, ctx: &Context, distance: f64) -> Step {
        let composition = self.composition(ctx);
        let mut cars = self
            .route
            .sample_at(distance, composition, ctx.config.train.car_length_m);
        if cars.is_empty() {
            warn!("Train {} has no cars to place", self.id);
            return Step::Terminate(TerminateReason::Corrupted);
        }
        if self.direction == Direction::Descending {
            cars = cars.into_iter().rev().map(|car| car.reversed()).collect();
        }
        self.pose.update(&self.id, cars, self.t);
        Step::Continue
    }

    /// Resolves the section between two station indices, checking it runs
    /// in the train's direction.
    fn section_between(&self, from: usize, to: usize) -> Option<(Section, f64, f64)> {
        let length = to as i32 - from as i32;
        if length == 0 || length.signum() != self.direction.sign() {
            return None;
        }
        let offset = self.route.station_offset(from)?;
        let interval = self.route.station_offset(to)? - offset;
        Some((Section { index: from, length }, offset, interval))
    }

    /// Window the section from `stop` has to fit in, relative to its departure.
    fn window(&self, ctx: &Context, stop: usize) -> Option<DurationWindow> {
        let stops = &self.timetable.stops;
        let departure = stops.get(stop)?.departure?;
        let next = stops.get(stop + 1)?;
        let min = next.arrival_or_departure()? - departure;
        let max = match next.departure.filter(|_| stop + 2 < stops.len()) {
            Some(next_departure) => {
                next_departure - departure - ctx.config.train.min_standing_duration()
            }
            None => min,
        };
        max.is_positive().then(|| DurationWindow::new(min, max))
    }

    fn stand(&mut self, ctx: &mut Context, station: usize, duration: Duration) -> Step {
        self.phase = Phase::Standing;
        self.section = Section {
            index: station,
            length: 0,
        };
        self.offset = self.route.station_offset(station).unwrap_or_default();
        self.interval = 0.0;
        self.t = 0.0;
        self.profile = None;
        let step = self.place(ctx, self.offset);
        if step != Step::Continue {
            return step;
        }
        reschedule(ctx, &mut self.handle, &self.id, duration.max(Duration::ZERO), Duration::ZERO);
        trace!("Train {} standing at {} for {}", self.id, station, duration);
        Step::Continue
    }

    /// Leaves stop `stop`, or arrives straight away when the whole section is
    /// already in the past.
    fn depart(&mut self, ctx: &mut Context, stop: usize, now: Timestamp) -> Step {
        self.delay = ctx.index.delay_of(&self.id);
        let stops = &self.timetable.stops;
        let (Some(from), Some(to)) = (stops.get(stop), stops.get(stop + 1)) else {
            self.stop = stop;
            return self.arrive(ctx, now);
        };
        let Some((section, offset, interval)) = self.section_between(from.station_index, to.station_index) else {
            warn!("Train {} has no section from {} to {}", self.id, from.station, to.station);
            return Step::Terminate(TerminateReason::Corrupted);
        };
        let origin = from.departure.map(|departure| departure + self.delay).unwrap_or(now);
        let window = self.window(ctx, stop);
        let profile = MotionProfile::solve(interval, &ctx.config.train.motion(), window);
        let elapsed = (now - origin).max(Duration::ZERO);

        self.stop = stop;
        if elapsed >= profile.duration() {
            self.stop = stop + 1;
            return self.arrive(ctx, now);
        }

        self.phase = Phase::Running;
        self.section = section;
        self.offset = offset;
        self.interval = interval;
        self.t = profile.position(elapsed);
        self.profile = Some(profile);
        let step = self.place(ctx, offset + interval * self.t);
        if step != Step::Continue {
            return step;
        }
        reschedule(ctx, &mut self.handle, &self.id, profile.duration(), elapsed);
        trace!("Train {} running section {:?}", self.id, section);
        Step::Continue
    }

    /// Handles reaching `self.stop`.
    fn arrive(&mut self, ctx: &mut Context, now: Timestamp) -> Step {
        self.delay = ctx.index.delay_of(&self.id);
        let stops = &self.timetable.stops;
        let Some(stop) = stops.get(self.stop) else {
            return Step::Terminate(TerminateReason::Corrupted);
        };
        let station = stop.station_index;
        let departure = stop.departure;
        if self.stop + 1 >= stops.len() {
            return self.reach_terminal(ctx, now);
        }
        match departure.map(|departure| departure + self.delay) {
            Some(departure) if departure > now => self.stand(ctx, station, departure - now),
            _ => self.depart(ctx, self.stop, now),
        }
    }

    fn reach_terminal(&mut self, ctx: &mut Context, now: Timestamp) -> Step {
        if let Some(next) = self.timetable.next.clone() {
            if ctx.index.timetable(&next).is_some() {
                return Step::Handoff(next);
            }
        }
        let Some(last) = self.timetable.stops.last() else {
            return Step::Terminate(TerminateReason::Corrupted);
        };
        let station = last.station_index;
        let arrived = last.arrival_or_departure().map(|time| time + self.delay).unwrap_or(now);
        let remaining = ctx.config.train.standing_duration() - (now - arrived).max(Duration::ZERO);
        if !remaining.is_positive() {
            return Step::Terminate(TerminateReason::Finished);
        }
        self.terminal = true;
        self.stand(ctx, station, remaining)
    }

    fn begin_timetable(&mut self, ctx: &mut Context) -> Step {
        let now = ctx.clock.time();
        self.delay = ctx.index.delay_of(&self.id);
        let timetable = self.timetable.clone();
        if (!self.chained && now < timetable.start) || now > timetable.end + self.delay {
            return Step::Terminate(TerminateReason::OutOfRange);
        }

        let departed = timetable
            .stops
            .iter()
            .rposition(|stop| stop.departure.is_some_and(|departure| departure + self.delay <= now));
        match departed {
            None => {
                let Some(first) = timetable.stops.first() else {
                    return Step::Terminate(TerminateReason::Corrupted);
                };
                let wait = first
                    .departure
                    .map(|departure| departure + self.delay - now)
                    .unwrap_or_default();
                self.stop = 0;
                self.stand(ctx, first.station_index, wait)
            }
            Some(stop) => self.depart(ctx, stop, now),
        }
    }

    /// Realtime-only trains follow the from/to hints of the live feed.
    fn follow_hints(&mut self, ctx: &mut Context) -> Step {
        let now = ctx.clock.time();
        if now > self.timetable.end {
            return Step::Terminate(TerminateReason::OutOfRange);
        }
        let Some(railway) = ctx.index.railway(&self.timetable.railway) else {
            return Step::Terminate(TerminateReason::Corrupted);
        };
        let status = ctx.index.status(&self.id);
        let from_station = status.and_then(|status| status.from_station.clone());
        let to_station = status.and_then(|status| status.to_station.clone());
        let is_at = |index: usize, station: &str| {
            railway.stations.get(index).is_some_and(|s| &**s == station)
        };

        let current = match self.phase {
            Phase::Start => None,
            _ => Some(self.section.target()),
        };
        let from = from_station.as_deref().and_then(|station| match current {
            Some(index) if is_at(index, station) => Some(index),
            _ => railway.station_index_toward(station, self.direction, None),
        });
        let first = self.timetable.stops.first().map(|stop| stop.station_index);
        let Some(mut at) = current.or(from).or(first) else {
            return Step::Terminate(TerminateReason::Corrupted);
        };
        let arrived = to_station.as_deref().is_some_and(|station| is_at(at, station));
        if let Some(from) = from {
            if from != at && !arrived {
                at = from;
            }
        }
        let to = to_station
            .as_deref()
            .and_then(|station| railway.station_index_toward(station, self.direction, Some(at)));

        let section = to.and_then(|to| self.section_between(at, to));
        let poll = ctx.config.realtime.poll_interval();
        let Some((section, offset, interval)) = section else {
            return self.stand(ctx, at, poll);
        };

        let profile = MotionProfile::solve(interval, &ctx.config.train.motion(), None);
        self.phase = Phase::Running;
        self.section = section;
        self.offset = offset;
        self.interval = interval;
        self.t = 0.0;
        self.profile = Some(profile);
        let step = self.place(ctx, offset);
        if step != Step::Continue {
            return step;
        }
        reschedule(ctx, &mut self.handle, &self.id, profile.duration(), Duration::ZERO);
        Step::Continue
    }
}

impl StateMachine for Train {
    fn begin(&mut self, ctx: &mut Context) -> Step {
        if self.timetable.synthetic {
            self.follow_hints(ctx)
        } else {
            self.begin_timetable(ctx)
        }
    }

    fn advance(&mut self, ctx: &mut Context, elapsed: Duration) -> Step {
        match (self.phase, self.profile) {
            (Phase::Running, Some(profile)) => {
                self.t = profile.position(elapsed);
                self.place(ctx, self.offset + self.interval * self.t)
            }
            (Phase::Standing, _) if self.pose.cars.len() != self.composition(ctx) as usize => {
                self.place(ctx, self.offset)
            }
            _ => Step::Continue,
        }
    }

    fn on_section_end(&mut self, ctx: &mut Context) -> Step {
        self.handle = None;
        let now = ctx.clock.time();
        match self.phase {
            Phase::Running => {
                self.t = 1.0;
                let step = self.place(ctx, self.offset + self.interval);
                if step != Step::Continue {
                    return step;
                }
                if self.timetable.synthetic {
                    self.section = Section {
                        index: self.section.target(),
                        length: 0,
                    };
                    let poll = ctx.config.realtime.poll_interval();
                    return match self.stand(ctx, self.section.index, poll) {
                        Step::Continue => Step::SectionChanged,
                        step => step,
                    };
                }
                self.stop += 1;
                match self.arrive(ctx, now) {
                    Step::Continue => Step::SectionChanged,
                    step => step,
                }
            }
            Phase::Standing if self.terminal => Step::Terminate(TerminateReason::Finished),
            Phase::Standing if self.timetable.synthetic => match self.follow_hints(ctx) {
                Step::Continue if self.phase == Phase::Running => Step::SectionChanged,
                step => step,
            },
            Phase::Standing => match self.depart(ctx, self.stop, now) {
                Step::Continue if self.phase == Phase::Running => Step::SectionChanged,
                step => step,
            },
            Phase::Start | Phase::Terminated => Step::Continue,
        }
    }

    fn current_pose(&self) -> &Pose {
        &self.pose
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn handle(&self) -> Option<Handle> {
        self.handle
    }

    fn release(&mut self, scheduler: &mut AnimationScheduler<Arc<str>>) {
        if let Some(handle) = self.handle.take() {
            scheduler.stop(handle);
        }
        self.phase = Phase::Terminated;
    }
}
