//! Per-vehicle state machines.
//!
//! A vehicle moves through `Start -> {Standing <-> Running} -> Terminated`. It never
//! touches other vehicles: every transition that reaches beyond the vehicle itself
//! (chain handoff, termination) is returned as a [`Step`] for the engine to apply.

mod flight;
mod train;

pub use flight::*;
pub use train::*;

use std::sync::Arc;

use tracing::warn;

use crate::{
    clock::Clock,
    config::Config,
    geometry::CarPose,
    index::RuntimeIndex,
    scheduler::{AnimationScheduler, Handle, TaskSpec},
    shared::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Start,
    Standing,
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateReason {
    /// The current time is outside the timetable.
    OutOfRange,
    Finished,
    /// Live data changed underneath the vehicle.
    Restart,
    /// The vehicle state no longer matches its route.
    Corrupted,
    /// The runway configuration changed.
    PatternChanged,
    /// No frame was produced for too long.
    Stale,
    /// Static data was reloaded.
    Reload,
}

/// What the engine has to do after a vehicle handled a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Continue,
    SectionChanged,
    /// The chain continues with this timetable.
    Handoff(Arc<str>),
    Terminate(TerminateReason),
}

/// Everything a vehicle may read, plus the scheduler it books its tasks on.
pub struct Context<'a> {
    pub clock: &'a Clock,
    pub index: &'a RuntimeIndex,
    pub scheduler: &'a mut AnimationScheduler<Arc<str>>,
    pub config: &'a Config,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub cars: Vec<CarPose>,
    /// Progress through the current section, in `[0, 1]`.
    pub progress: f64,
}

impl Pose {
    /// Replaces the cars unless one of them is not finite, in which case the
    /// last good placement is kept.
    pub(crate) fn update(&mut self, id: &str, cars: Vec<CarPose>, progress: f64) {
        if cars.iter().all(CarPose::is_finite) {
            self.cars = cars;
            self.progress = progress;
        } else {
            warn!("Vehicle {id} produced a non finite pose, keeping the last one");
        }
    }
}

pub trait StateMachine {
    /// Resolves the initial state from the current time.
    fn begin(&mut self, ctx: &mut Context) -> Step;
    /// Handles a frame of the current task.
    fn advance(&mut self, ctx: &mut Context, elapsed: Duration) -> Step;
    /// Handles completion of the current task.
    fn on_section_end(&mut self, ctx: &mut Context) -> Step;
    fn current_pose(&self) -> &Pose;
    fn phase(&self) -> Phase;
    fn handle(&self) -> Option<Handle>;
    /// Cancels the running task and marks the vehicle terminated.
    fn release(&mut self, scheduler: &mut AnimationScheduler<Arc<str>>);
}

#[derive(Debug)]
pub enum Vehicle {
    Train(Train),
    Flight(Flight),
}

impl Vehicle {
    pub fn id(&self) -> &Arc<str> {
        match self {
            Vehicle::Train(train) => train.id(),
            Vehicle::Flight(flight) => flight.id(),
        }
    }

    /// Railway a train runs on. Flights have none.
    pub fn railway(&self) -> Option<&str> {
        match self {
            Vehicle::Train(train) => Some(train.railway()),
            Vehicle::Flight(_) => None,
        }
    }

    pub fn as_train(&self) -> Option<&Train> {
        match self {
            Vehicle::Train(train) => Some(train),
            Vehicle::Flight(_) => None,
        }
    }

    pub fn as_flight(&self) -> Option<&Flight> {
        match self {
            Vehicle::Flight(flight) => Some(flight),
            Vehicle::Train(_) => None,
        }
    }

    fn machine(&mut self) -> &mut dyn StateMachine {
        match self {
            Vehicle::Train(train) => train,
            Vehicle::Flight(flight) => flight,
        }
    }

    fn machine_ref(&self) -> &dyn StateMachine {
        match self {
            Vehicle::Train(train) => train,
            Vehicle::Flight(flight) => flight,
        }
    }
}

impl StateMachine for Vehicle {
    fn begin(&mut self, ctx: &mut Context) -> Step {
        self.machine().begin(ctx)
    }

    fn advance(&mut self, ctx: &mut Context, elapsed: Duration) -> Step {
        self.machine().advance(ctx, elapsed)
    }

    fn on_section_end(&mut self, ctx: &mut Context) -> Step {
        self.machine().on_section_end(ctx)
    }

    fn current_pose(&self) -> &Pose {
        self.machine_ref().current_pose()
    }

    fn phase(&self) -> Phase {
        self.machine_ref().phase()
    }

    fn handle(&self) -> Option<Handle> {
        self.machine_ref().handle()
    }

    fn release(&mut self, scheduler: &mut AnimationScheduler<Arc<str>>) {
        self.machine().release(scheduler)
    }
}

/// Replaces the task behind `handle` with a new one keyed by `id`.
pub(crate) fn reschedule(
    ctx: &mut Context,
    handle: &mut Option<Handle>,
    id: &Arc<str>,
    duration: Duration,
    start: Duration,
) {
    if let Some(old) = handle.take() {
        ctx.scheduler.stop(old);
    }
    let spec = TaskSpec::new(id.clone(), duration).starting_at(start);
    *handle = Some(ctx.scheduler.start(ctx.clock, spec));
}
