mod schedule;

pub use schedule::*;
