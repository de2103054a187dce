mod clock;
mod vehicle;

pub use clock::*;
pub use vehicle::*;
