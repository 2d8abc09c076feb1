//! Batch insights engine: weekday profile, retailer savings, trends.

mod engine;
mod engine_utils;
mod model;

pub use engine::*;
pub use engine_utils::*;
pub use model::*;
