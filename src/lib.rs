pub mod clock;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod index;
pub mod motion;
pub mod realtime;
pub mod schedule;
pub mod scheduler;
pub mod shared;
pub mod vehicle;

pub mod prelude {
    pub use crate::clock::{Clock, ManualWallClock, SystemWallClock, WallClock};
    pub use crate::config::Config;
    pub use crate::engine::{Engine, Event};
    pub use crate::geometry::{CarPose, Route};
    pub use crate::index::RuntimeIndex;
    pub use crate::realtime::{FlightSnapshot, TrainSnapshot};
    pub use crate::schedule::{Schedule, ScheduleReader};
    pub use crate::shared::{Coordinate, Duration, Timestamp};
    pub use crate::vehicle::{Phase, StateMachine, TerminateReason, Vehicle};
}
