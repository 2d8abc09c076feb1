//! Shopping-list domain models and realtime merge logic.

mod keys;
mod merge;
mod model;

pub use keys::*;
pub use merge::*;
pub use model::*;
