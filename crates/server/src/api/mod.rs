mod clock;
mod vehicles;

pub use clock::*;
pub use vehicles::*;
