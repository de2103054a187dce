use std::sync::Arc;

use tracing::trace;

use crate::{
    geometry::Route,
    index::{FlightEntry, FlightKind},
    motion::FlightProfile,
    scheduler::{AnimationScheduler, Handle},
    shared::Duration,
    vehicle::{Context, Phase, Pose, StateMachine, Step, TerminateReason, reschedule},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// On the ground before takeoff.
    Boarding,
    Takeoff,
    Landing,
    /// On the ground after landing.
    Parked,
}

#[derive(Debug)]
pub struct Flight {
    id: Arc<str>,
    entry: FlightEntry,
    route: Arc<Route>,
    profile: FlightProfile,
    stage: Stage,
    phase: Phase,
    handle: Option<Handle>,
    pose: Pose,
}

impl Flight {
    pub fn new(entry: FlightEntry, route: Arc<Route>, profile: FlightProfile) -> Self {
        let stage = match entry.kind {
            FlightKind::Departure => Stage::Boarding,
            FlightKind::Arrival => Stage::Landing,
        };
        Self {
            id: entry.id.clone(),
            entry,
            route,
            profile,
            stage,
            phase: Phase::Start,
            handle: None,
            pose: Pose::default(),
        }
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn entry(&self) -> &FlightEntry {
        &self.entry
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn place(&mut self, progress: f64) -> Step {
        let distance = self.route.length().as_meters() * progress;
        let cars = self.route.sample_at(distance, 1, 0.0);
        if cars.is_empty() {
            return Step::Terminate(TerminateReason::Corrupted);
        }
        self.pose.update(&self.id, cars, progress);
        Step::Continue
    }

    /// Enters `stage`, `elapsed` into it.
    fn enter(&mut self, ctx: &mut Context, stage: Stage, elapsed: Duration) -> Step {
        let standing = ctx.config.flight.standing_duration();
        let (phase, duration, progress) = match stage {
            Stage::Boarding => (Phase::Standing, standing, 0.0),
            Stage::Parked => (Phase::Standing, standing, 1.0),
            Stage::Takeoff | Stage::Landing => {
                (Phase::Running, self.profile.duration(), self.profile.position(elapsed))
            }
        };
        self.stage = stage;
        self.phase = phase;
        let step = self.place(progress);
        if step != Step::Continue {
            return step;
        }
        reschedule(ctx, &mut self.handle, &self.id, duration, elapsed);
        trace!("Flight {} entered {:?}", self.id, stage);
        Step::Continue
    }
}

impl StateMachine for Flight {
    fn begin(&mut self, ctx: &mut Context) -> Step {
        let now = ctx.clock.time();
        let standing = ctx.config.flight.standing_duration();
        let (start, end) = self.entry.window(standing);
        if now < start || now >= end {
            return Step::Terminate(TerminateReason::OutOfRange);
        }
        let base = self.entry.base;
        match self.entry.kind {
            FlightKind::Departure if now < base => {
                self.enter(ctx, Stage::Boarding, now - start)
            }
            FlightKind::Departure => self.enter(ctx, Stage::Takeoff, now - base),
            FlightKind::Arrival if now < base => self.enter(ctx, Stage::Landing, now - start),
            FlightKind::Arrival => self.enter(ctx, Stage::Parked, now - base),
        }
    }

    fn advance(&mut self, _ctx: &mut Context, elapsed: Duration) -> Step {
        match self.phase {
            Phase::Running => {
                let progress = self.profile.position(elapsed);
                self.place(progress)
            }
            _ => Step::Continue,
        }
    }

    fn on_section_end(&mut self, ctx: &mut Context) -> Step {
        self.handle = None;
        let step = match self.stage {
            Stage::Boarding => self.enter(ctx, Stage::Takeoff, Duration::ZERO),
            Stage::Landing => self.enter(ctx, Stage::Parked, Duration::ZERO),
            Stage::Takeoff | Stage::Parked => return Step::Terminate(TerminateReason::Finished),
        };
        match step {
            Step::Continue => Step::SectionChanged,
            step => step,
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
