use crossbeam_queue::SegQueue;
use tokio::sync::Mutex;
use tokyo_motion::prelude::*;

pub struct AppState {
    pub engine: Mutex<Engine>,
    /// Parsed feed snapshots waiting for the next frame.
    pub train_snapshots: SegQueue<TrainSnapshot>,
    pub flight_snapshots: SegQueue<FlightSnapshot>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Mutex::new(engine),
            train_snapshots: SegQueue::new(),
            flight_snapshots: SegQueue::new(),
        }
    }
}
