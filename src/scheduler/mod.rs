//! Frame driven task runner.
//!
//! Tasks carry a key and a duration, never vehicle state. Each call to
//! [`AnimationScheduler::tick`] returns the frames that are due so the caller
//! can dispatch them after the scheduler borrow ends.

use std::collections::BTreeMap;

use crate::{clock::Clock, shared::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

/// Where a task reads its elapsed time from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeSource {
    /// Scaled clock time, so playback speed changes consumption.
    #[default]
    Clock,
    /// Unscaled wall time.
    Wall,
}

#[derive(Debug, Clone)]
pub struct TaskSpec<K> {
    pub key: K,
    pub duration: Duration,
    /// Elapsed time the task starts with, used to resume mid-way.
    pub start: Duration,
    pub source: TimeSource,
}

impl<K> TaskSpec<K> {
    pub fn new(key: K, duration: Duration) -> Self {
        Self {
            key,
            duration,
            start: Duration::ZERO,
            source: TimeSource::Clock,
        }
    }

    pub fn starting_at(mut self, start: Duration) -> Self {
        self.start = start;
        self
    }

    pub fn with_source(mut self, source: TimeSource) -> Self {
        self.source = source;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick<K> {
    Frame {
        handle: Handle,
        key: K,
        elapsed: Duration,
        duration: Duration,
    },
    Complete {
        handle: Handle,
        key: K,
    },
}

impl<K> Tick<K> {
    pub fn handle(&self) -> Handle {
        match self {
            Tick::Frame { handle, .. } | Tick::Complete { handle, .. } => *handle,
        }
    }

    pub fn key(&self) -> &K {
        match self {
            Tick::Frame { key, .. } | Tick::Complete { key, .. } => key,
        }
    }
}

#[derive(Debug)]
struct Task<K> {
    key: K,
    duration: Duration,
    source: TimeSource,
    origin: f64,
    frame_rate: u32,
    frames: u64,
}

#[derive(Debug)]
pub struct AnimationScheduler<K> {
    tasks: BTreeMap<Handle, Task<K>>,
    next_handle: u64,
}

impl<K> Default for AnimationScheduler<K> {
    fn default() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_handle: 0,
        }
    }
}

fn source_time(clock: &Clock, source: TimeSource) -> f64 {
    match source {
        TimeSource::Clock => clock.high_res_time(),
        TimeSource::Wall => clock.wall_time(),
    }
}

impl<K: Clone> AnimationScheduler<K> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn start(&mut self, clock: &Clock, spec: TaskSpec<K>) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        let origin = source_time(clock, spec.source) - spec.start.as_millis();
        self.tasks.insert(
            handle,
            Task {
                key: spec.key,
                duration: spec.duration,
                source: spec.source,
                origin,
                frame_rate: 1,
                frames: 0,
            },
        );
        handle
    }

    /// Cancels a task. No completion is reported for it.
    pub fn stop(&mut self, handle: Handle) -> bool {
        self.tasks.remove(&handle).is_some()
    }

    /// Only every `rate`-th tick reports a frame. Completion is never throttled.
    pub fn set_frame_rate(&mut self, handle: Handle, rate: u32) {
        if let Some(task) = self.tasks.get_mut(&handle) {
            task.frame_rate = rate.max(1);
        }
    }

    pub fn frame_rate(&self, handle: Handle) -> Option<u32> {
        self.tasks.get(&handle).map(|task| task.frame_rate)
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.tasks.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Advances every task and returns the due frames and completions in handle order.
    pub fn tick(&mut self, clock: &Clock) -> Vec<Tick<K>> {
        let clock_now = clock.high_res_time();
        let wall_now = clock.wall_time();
        let mut ticks = Vec::new();
        let mut finished = Vec::new();

        for (handle, task) in self.tasks.iter_mut() {
            let now = match task.source {
                TimeSource::Clock => clock_now,
                TimeSource::Wall => wall_now,
            };
            let elapsed = Duration::from_millis(now - task.origin);
            task.frames += 1;

            if elapsed >= task.duration {
                ticks.push(Tick::Frame {
                    handle: *handle,
                    key: task.key.clone(),
                    elapsed: task.duration,
                    duration: task.duration,
                });
                ticks.push(Tick::Complete {
                    handle: *handle,
                    key: task.key.clone(),
                });
                finished.push(*handle);
            } else if task.frames % task.frame_rate as u64 == 0 {
                ticks.push(Tick::Frame {
                    handle: *handle,
                    key: task.key.clone(),
                    elapsed,
                    duration: task.duration,
                });
            }
        }

        for handle in finished {
            self.tasks.remove(&handle);
        }
        ticks
    }
}

#[cfg(test)]
fn test_clock() -> (crate::clock::ManualWallClock, Clock) {
    use std::sync::Arc;
    let wall = crate::clock::ManualWallClock::at_epoch(0.0);
    let clock = Clock::new(Arc::new(wall.clone()), &crate::config::ClockConfig::default());
    (wall, clock)
}

#[test]
fn task_runs_until_duration() {
    let (wall, clock) = test_clock();
    let mut scheduler = AnimationScheduler::new();
    let handle = scheduler.start(&clock, TaskSpec::new("a", Duration::from_millis(100.0)));

    wall.advance(50.0);
    let ticks = scheduler.tick(&clock);
    assert_eq!(
        ticks,
        vec![Tick::Frame {
            handle,
            key: "a",
            elapsed: Duration::from_millis(50.0),
            duration: Duration::from_millis(100.0),
        }]
    );

    wall.advance(60.0);
    let ticks = scheduler.tick(&clock);
    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks[1], Tick::Complete { handle, key: "a" });
    assert!(!scheduler.is_active(handle));
    assert!(scheduler.tick(&clock).is_empty());
}

#[test]
fn stopped_task_never_completes() {
    let (wall, clock) = test_clock();
    let mut scheduler = AnimationScheduler::new();
    let handle = scheduler.start(&clock, TaskSpec::new("a", Duration::from_millis(10.0)));
    assert!(scheduler.stop(handle));
    wall.advance(20.0);
    assert!(scheduler.tick(&clock).is_empty());
}

#[test]
fn start_offset_resumes_mid_task() {
    let (wall, clock) = test_clock();
    let mut scheduler = AnimationScheduler::new();
    let spec = TaskSpec::new("a", Duration::from_millis(100.0)).starting_at(Duration::from_millis(80.0));
    scheduler.start(&clock, spec);
    wall.advance(10.0);
    match &scheduler.tick(&clock)[0] {
        Tick::Frame { elapsed, .. } => assert_eq!(*elapsed, Duration::from_millis(90.0)),
        other => panic!("unexpected tick {other:?}"),
    }
}

#[test]
fn throttled_task_still_completes() {
    let (wall, clock) = test_clock();
    let mut scheduler = AnimationScheduler::new();
    let handle = scheduler.start(&clock, TaskSpec::new("a", Duration::from_millis(100.0)));
    scheduler.set_frame_rate(handle, 3);

    let mut frames = 0;
    for _ in 0..6 {
        wall.advance(10.0);
        frames += scheduler.tick(&clock).len();
    }
    assert_eq!(frames, 2);

    wall.advance(100.0);
    let ticks = scheduler.tick(&clock);
    assert!(matches!(ticks.last(), Some(Tick::Complete { .. })));
}

#[test]
fn clock_source_follows_speed() {
    let (wall, mut clock) = test_clock();
    let mut scheduler = AnimationScheduler::new();
    scheduler.start(&clock, TaskSpec::new("clock", Duration::from_millis(1000.0)));
    scheduler.start(
        &clock,
        TaskSpec::new("wall", Duration::from_millis(1000.0)).with_source(TimeSource::Wall),
    );
    clock.set_speed(10.0);
    wall.advance(50.0);
    let ticks = scheduler.tick(&clock);
    let elapsed: Vec<f64> = ticks
        .iter()
        .map(|tick| match tick {
            Tick::Frame { elapsed, .. } => elapsed.as_millis(),
            Tick::Complete { .. } => f64::NAN,
        })
        .collect();
    assert_eq!(elapsed, vec![500.0, 50.0]);
}
