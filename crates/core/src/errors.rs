//! Error types for the core crate.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core domain operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested reporting period is outside the supported range.
    #[error("invalid period: year {year}, month {month}")]
    InvalidPeriod { year: i32, month: u32 },
}
