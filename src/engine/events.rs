use std::sync::Arc;

use crate::{geometry::CarPose, shared::Duration, vehicle::TerminateReason};

/// Discrete changes a renderer or host can subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Created {
        id: Arc<str>,
    },
    /// A train reached a new section, or a flight a new stage.
    SectionChanged {
        id: Arc<str>,
        section: usize,
    },
    Terminated {
        id: Arc<str>,
        reason: TerminateReason,
    },
    DelayChanged {
        id: Arc<str>,
        delay: Duration,
    },
    CompositionChanged {
        id: Arc<str>,
        cars: u32,
    },
    TrainTypeChanged {
        id: Arc<str>,
        train_type: Arc<str>,
    },
    RunwayPatternChanged {
        landing: Vec<String>,
        departure: Vec<String>,
    },
    /// Lead car of the tracked vehicle, once per frame.
    TrackedPose {
        id: Arc<str>,
        pose: CarPose,
    },
}

impl Event {
    pub fn id(&self) -> Option<&Arc<str>> {
        match self {
            Event::Created { id }
            | Event::SectionChanged { id, .. }
            | Event::Terminated { id, .. }
            | Event::DelayChanged { id, .. }
            | Event::CompositionChanged { id, .. }
            | Event::TrainTypeChanged { id, .. }
            | Event::TrackedPose { id, .. } => Some(id),
            Event::RunwayPatternChanged { .. } => None,
        }
    }
}
