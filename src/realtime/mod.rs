//! Merges live feed snapshots into the runtime index.
//!
//! A snapshot is applied to the index in full before the caller acts on the
//! returned [`Reconciliation`], so no vehicle restarts against half-updated data.

mod flights;
mod models;
mod trains;

pub use flights::*;
pub use models::*;
pub use trains::*;

use std::{collections::BTreeSet, sync::Arc};

use crate::engine::Event;

/// Outcome of applying one snapshot.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub events: Vec<Event>,
    /// Vehicles that must be terminated and started again from the index.
    pub restart: BTreeSet<Arc<str>>,
    /// Every flight must be restarted, the runway pattern changed.
    pub restart_flights: bool,
}
