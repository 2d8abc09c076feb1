//! Domain core for the korb household shopping app.
//!
//! Two concerns live here, both pure and free of I/O:
//! - [`shopping`]: row model, comparator utilities and the merge functions
//!   that fold change-feed events into the locally cached shopping lists.
//! - [`insights`]: the batch aggregation engine that turns purchase history
//!   into weekday spend profiles, retailer-switch savings and trends.

pub mod errors;
pub mod insights;
pub mod shopping;

pub use errors::{CoreError, Result};
